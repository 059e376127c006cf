use crate::crypto::{self, Signature};
use crate::keypair::Keypair;
use crate::networking::envelope::Envelope;
use crate::networking::rpc::RpcMessage;
use crate::networking::session::{self, Client};
use crate::networking::transport::{RelayChannel, TransportEvent};
use crate::order::Order;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const MOCK_SECRET_KEY: &str =
    "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const MOCK_ADDRESS: &str = "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23";

/// A second identity for the other side of a trade.
pub const PEER_SECRET_KEY: &str =
    "8da4ef21b864d2cc526dbdb2a120bd2874c36c9d0a1fb7f8c63d7f7a8b41de8f";

pub const MOCK_MAKER_TOKEN: &str = "0x27054b13b1b798b345b591a4d22e6562d47ea75a";
pub const MOCK_TAKER_TOKEN: &str = "0x0000000000000000000000000000000000000000";

pub fn mock_keypair() -> Keypair {
    Keypair::from_secret_hex(MOCK_SECRET_KEY).unwrap()
}

pub fn mock_order(maker_address: &str) -> Order {
    Order {
        maker_address: maker_address.to_string(),
        maker_amount: String::from("100"),
        maker_token: String::from(MOCK_MAKER_TOKEN),
        taker_address: String::from("0x00000000000000000000000000000000000000bb"),
        taker_amount: String::from("100000"),
        taker_token: String::from(MOCK_TAKER_TOKEN),
        nonce: String::from("42"),
        expiration: 1700000000,
    }
}

/// A session for the mock identity that the relay has already accepted.
pub async fn mock_session() -> (Client, MockRelay) {
    let (channel, mut relay) = mock_relay();
    let (client, authentication) = session::start(channel, mock_keypair());
    relay.authenticate().await;
    authentication.await.unwrap();
    (client, relay)
}

pub fn detached_client() -> Client {
    Client::detached(Arc::new(mock_keypair()))
}

///
/// The relay's end of a [`RelayChannel`].
///
/// Tests play the relay by pushing frames at the session and reading what
/// it writes back.
///
pub struct MockRelay {
    written: mpsc::UnboundedReceiver<String>,
    delivered: mpsc::UnboundedSender<TransportEvent>,
    next_envelope_id: u64,
}

pub fn mock_relay() -> (RelayChannel, MockRelay) {
    let (outbound, written) = mpsc::unbounded_channel();
    let (delivered, inbound) = mpsc::unbounded_channel();
    (
        RelayChannel::new(outbound, inbound),
        MockRelay {
            written,
            delivered,
            next_envelope_id: 1,
        },
    )
}

impl MockRelay {
    pub fn push(&self, frame: &str) {
        self.push_event(TransportEvent::Frame(frame.to_string()));
    }

    pub fn push_event(&self, event: TransportEvent) {
        let _ = self.delivered.send(event);
    }

    /// Reports the socket as closed and hangs up.
    pub fn close(self) {
        self.push_event(TransportEvent::Closed);
    }

    /// The next frame the session wrote, `None` once it has hung up.
    pub async fn next_outbound(&mut self) -> Option<String> {
        self.written.recv().await
    }

    pub async fn next_frame(&mut self) -> String {
        self.next_outbound()
            .await
            .expect("session hung up before writing a frame")
    }

    /// Runs the challenge handshake, checks the response and accepts it.
    /// Returns the address that signed the challenge.
    pub async fn authenticate(&mut self) -> String {
        let challenge = "challenge-5fa1c0de";
        self.push(challenge);
        let response = self.next_frame().await;
        let bytes = hex::decode(crypto::strip_hex_prefix(&response)).unwrap();
        let signature = Signature::from_bytes(&bytes).unwrap();
        let signer = crypto::recover_address(challenge.as_bytes(), &signature).unwrap();
        self.push("ok");
        signer
    }

    /// The next frame the session wrote, as envelope and inner message.
    pub async fn next_envelope(&mut self) -> (Envelope, RpcMessage) {
        let frame = self.next_frame().await;
        let envelope: Envelope = serde_json::from_str(&frame).unwrap();
        let message: RpcMessage = serde_json::from_str(&envelope.message).unwrap();
        (envelope, message)
    }

    /// Delivers a response from `sender` to the mock identity.
    pub fn reply(&mut self, sender: &str, message: Value) {
        self.deliver(sender, message);
    }

    /// Delivers a request from `sender` to the mock identity.
    pub fn request(&mut self, sender: &str, message: Value) {
        self.deliver(sender, message);
    }

    fn deliver(&mut self, sender: &str, message: Value) {
        let envelope = Envelope {
            sender: sender.to_string(),
            receiver: MOCK_ADDRESS.to_string(),
            message: message.to_string(),
            id: self.next_envelope_id,
        };
        self.next_envelope_id += 1;
        self.push(&serde_json::to_string(&envelope).unwrap());
    }
}
