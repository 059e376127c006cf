use crate::error::CallError;
use crate::intent::{Intent, Role};
use crate::keypair::Keypair;
use crate::networking::dispatch::{InboundRequest, MethodHandler};
use crate::networking::rpc::RpcError;
use crate::networking::session::{self, Client, GET_ORDER};
use crate::networking::transport;
use crate::order::{Order, SignedOrder};
use crate::settings::{self, ClientSettings, QuoteSettings, TakerSettings};
use crate::time::create_timestamp_secs;
use clap::{App, Arg};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::signal;
use tracing::{event, Level};

pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

///
/// The entry point to the client runtime
///
pub async fn run() -> crate::Result<()> {
    //
    // handle command-line arguments
    //
    let matches = App::new("AirSwap Client")
        .about("Trades on the AirSwap network")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .help("config file name"),
        )
        .arg(
            Arg::with_name("network")
                .short("n")
                .long("network")
                .takes_value(true)
                .help("network whose relay to connect to: mainnet or rinkeby"),
        )
        .arg(
            Arg::with_name("relay_url")
                .long("relay_url")
                .takes_value(true)
                .help("relay websocket url, overrides network"),
        )
        .arg(
            Arg::with_name("private_key")
                .short("k")
                .long("private_key")
                .takes_value(true)
                .help("hex secret key, prompted for if not configured"),
        )
        .get_matches();

    //
    // flags win over the config file and environment
    //
    let mut config = settings::load(matches.value_of("config"))?;
    if let Some(network) = matches.value_of("network") {
        settings::set_network(&mut config, network)?;
    }
    for key in &["relay_url", "private_key"] {
        if let Some(value) = matches.value_of(key) {
            config.set(key, value)?;
        }
    }
    let settings = ClientSettings::from_config(config)?;
    event!(Level::DEBUG, "{:?}", settings);

    let keypair = match &settings.private_key {
        Some(private_key) => Keypair::from_secret_hex(private_key)?,
        None => Keypair::from_secret_hex(&rpassword::prompt_password_stdout("Private key: ")?)?,
    };
    event!(Level::INFO, "trading as {}", keypair.address());

    //
    // connect and authenticate
    //
    let channel = transport::connect(settings.relay_url()).await?;
    let client = session::connect(channel, keypair).await?;

    client.register_method(GET_ORDER, QuoteHandler::new(settings.quote.clone()));

    let (orders, published) = tokio::join!(
        request_quotes(&client, &settings.taker),
        publish_intent(&client, &settings.quote),
    );
    match orders {
        Ok(orders) => log_orders(&orders),
        Err(err) => event!(Level::ERROR, "could not find intents: {}", err),
    }
    match published {
        Ok(status) => event!(Level::INFO, "setIntents: {}", status),
        Err(err) => event!(Level::ERROR, "could not set intents: {}", err),
    }

    //
    // keep answering getOrder until interrupted
    //
    tokio::select! {
        res = signal::ctrl_c() => {
            if let Err(err) = res {
                event!(Level::ERROR, "could not listen for ctrl-c: {}", err);
            }
            event!(Level::INFO, "shutting down");
            client.close();
        }
        _ = client.closed() => {
            event!(Level::WARN, "relay closed the connection");
        }
    }
    client.closed().await;
    Ok(())
}

/// Finds makers for the configured pair and asks each of them for an order.
pub async fn request_quotes(
    client: &Client,
    taker: &TakerSettings,
) -> Result<Vec<Result<SignedOrder, CallError>>, CallError> {
    let intents = client
        .find_intents(
            taker.maker_tokens.clone(),
            taker.taker_tokens.clone(),
            Role::Maker,
        )
        .await?;
    event!(Level::INFO, "found {} intents", intents.len());
    Ok(client.get_orders(&intents, &taker.maker_amount).await)
}

pub async fn publish_intent(client: &Client, quote: &QuoteSettings) -> Result<Value, CallError> {
    client
        .set_intents(vec![Intent::new(
            &quote.maker_token,
            &quote.taker_token,
            Role::Maker,
        )])
        .await
}

fn log_orders(orders: &[Result<SignedOrder, CallError>]) {
    for order in orders {
        match order {
            Ok(signed) => event!(
                Level::INFO,
                "order from {}: {} {} for {} {}",
                signed.order.maker_address,
                signed.order.maker_amount,
                signed.order.maker_token,
                signed.order.taker_amount,
                signed.order.taker_token
            ),
            Err(err) => event!(Level::WARN, "no order: {}", err),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GetOrderParams {
    maker_token: String,
    taker_token: String,
    taker_address: String,
}

///
/// Answers `getOrder` with a fixed quote signed by the local key.
///
/// Each order gets a random nonce and expires `expiration_secs` from now.
///
pub struct QuoteHandler {
    quote: QuoteSettings,
}

impl QuoteHandler {
    pub fn new(quote: QuoteSettings) -> Self {
        QuoteHandler { quote }
    }

    fn quote(&self, request: &InboundRequest, client: &Client) -> Result<Value, RpcError> {
        let params: GetOrderParams =
            serde_json::from_value(request.params.clone()).map_err(|err| {
                RpcError::new(format!("invalid getOrder params: {}", err), INVALID_PARAMS)
            })?;
        let order = Order {
            maker_address: client.address().to_string(),
            maker_amount: self.quote.maker_amount.clone(),
            maker_token: params.maker_token,
            taker_address: params.taker_address,
            taker_amount: self.quote.taker_amount.clone(),
            taker_token: params.taker_token,
            nonce: rand::thread_rng().gen::<u64>().to_string(),
            expiration: create_timestamp_secs() + self.quote.expiration_secs,
        };
        let signed = client
            .sign_order(order)
            .map_err(|err| RpcError::new(err.to_string(), INVALID_PARAMS))?;
        serde_json::to_value(&signed).map_err(|err| RpcError::new(err.to_string(), INTERNAL_ERROR))
    }
}

impl MethodHandler for QuoteHandler {
    fn handle(&self, request: InboundRequest, client: &Client) {
        let outcome = self.quote(&request, client);
        if let Err(err) = &outcome {
            event!(Level::WARN, "refusing getOrder from {}: {}", request.sender, err.message);
        }
        if let Err(err) = client.respond(&request, outcome) {
            event!(Level::ERROR, "could not answer {}: {}", request.sender, err);
        }
    }
}
