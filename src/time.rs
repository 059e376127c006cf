use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch. A clock set before 1970 reads as zero.
pub fn create_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since_the_epoch| since_the_epoch.as_millis() as u64)
        .unwrap_or(0)
}

/// Seconds since the unix epoch, the unit order expirations are written in.
pub fn create_timestamp_secs() -> u64 {
    create_timestamp() / 1000
}
