/*!
# AirSwap Command Line Client

## Help

```bash
airswap_rust help
```

## Example Usage

```bash
AIRSWAP_PRIVATE_KEY=... airswap_rust --network=rinkeby
airswap_rust --config=config/maker --network=mainnet
```

## Dev

To run from source:

```bash
cargo run -- --help
cargo run -- --network=rinkeby
```
*/

use airswap_rust::runtime;

#[tokio::main]
pub async fn main() -> airswap_rust::Result<()> {
    tracing_subscriber::fmt::init();
    runtime::run().await
}
