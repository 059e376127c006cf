use crate::error::SessionError;
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{event, Level};

/// What the socket reports to the session.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    Frame(String),
    Error(String),
    Closed,
}

///
/// The session's side of a duplex text-frame connection.
///
/// Frames pushed into `outbound` are written to the socket in order;
/// everything the socket produces arrives on `inbound`. Dropping
/// `outbound` closes the connection.
///
#[derive(Debug)]
pub struct RelayChannel {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

impl RelayChannel {
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        RelayChannel { outbound, inbound }
    }
}

/// Opens a websocket to the relay and spawns its reader and writer tasks.
pub async fn connect(relay_url: &str) -> Result<RelayChannel, SessionError> {
    let url =
        url::Url::parse(relay_url).map_err(|e| SessionError::Transport(e.to_string()))?;
    event!(Level::INFO, "connecting to relay {}", url);
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| SessionError::Transport(e.to_string()))?;
    let (write_sink, mut read_stream) = ws_stream.split();

    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();
    let (inbound_sender, inbound_receiver) = mpsc::unbounded_channel();

    let outbound_frames = UnboundedReceiverStream::new(outbound_receiver)
        .map(|frame| Ok::<Message, tungstenite::Error>(Message::text(frame)));
    tokio::spawn(outbound_frames.forward(write_sink).map(|result| {
        if let Err(e) = result {
            event!(Level::ERROR, "error sending websocket frame: {}", e);
        }
    }));

    tokio::spawn(async move {
        while let Some(result) = read_stream.next().await {
            let event = match result {
                Ok(Message::Text(text)) => TransportEvent::Frame(text),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => TransportEvent::Frame(text),
                    Err(_) => {
                        event!(Level::WARN, "dropping non-utf8 binary frame");
                        continue;
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(error) => {
                    let _ = inbound_sender.send(TransportEvent::Error(error.to_string()));
                    break;
                }
            };
            if inbound_sender.send(event).is_err() {
                break;
            }
        }
        event!(Level::INFO, "relay socket closed");
        let _ = inbound_sender.send(TransportEvent::Closed);
    });

    Ok(RelayChannel::new(outbound_sender, inbound_receiver))
}
