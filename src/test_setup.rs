#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    // only for tests, so captured output carries the session logs
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
