/*!
# AirSwap Rust Client

A peer-to-peer trading client for the AirSwap network. It authenticates to
the relay over a websocket, exchanges JSON-RPC requests with the indexer and
with other peers, and signs trade orders that the exchange contract can
verify on-chain.

# Usage

```no_run
use airswap_rust::intent::Role;
use airswap_rust::keypair::Keypair;
use airswap_rust::networking::{session, transport};

# async fn demo() -> airswap_rust::Result<()> {
let keypair = Keypair::from_secret_hex(
    "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
)?;
let channel = transport::connect("wss://sandbox.airswap-api.com/websocket").await?;
let client = session::connect(channel, keypair).await?;

let intents = client
    .find_intents(
        vec![String::from("0x27054b13b1b798b345b591a4d22e6562d47ea75a")],
        vec![String::from("0x0000000000000000000000000000000000000000")],
        Role::Maker,
    )
    .await?;
let orders = client.get_orders(&intents, "100000").await;
# Ok(())
# }
```

The modules follow the flow of a frame through the client:
[`networking::transport`] hands text frames to the [`networking::session`],
which authenticates with [`networking::auth`], decodes envelopes with
[`networking::envelope`], and routes them to the call table
([`networking::calls`]) or to registered methods ([`networking::dispatch`]).
Orders are signed by [`order`].
*/
pub mod crypto;
pub mod error;
pub mod intent;
pub mod keypair;
pub mod networking;
pub mod order;
pub mod runtime;
pub mod settings;
pub mod time;

#[cfg(test)]
pub mod test_setup;
#[cfg(test)]
pub mod test_utilities;

/// Error type for the binary and other top-level glue code.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Result alias paired with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
