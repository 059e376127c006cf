use crate::networking::session::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{event, Level};

/// A method invocation received from a peer.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundRequest {
    /// Address the envelope came from; responses go back here.
    pub sender: String,
    pub method: String,
    pub params: Value,
    /// Inner id to answer with. `None` for notifications.
    pub id: Option<u64>,
}

///
/// Answers one method for peers.
///
/// Handlers run on the session task, one at a time, in frame order. They
/// send their own response through the [`Client`] they are given, usually
/// with [`Client::respond`]; nothing is sent on their behalf.
///
pub trait MethodHandler: Send + 'static {
    fn handle(&self, request: InboundRequest, client: &Client);
}

impl<F> MethodHandler for F
where
    F: Fn(InboundRequest, &Client) + Send + 'static,
{
    fn handle(&self, request: InboundRequest, client: &Client) {
        self(request, client)
    }
}

/// Method name to handler. Invoking a method nobody registered is a no-op.
#[derive(Default)]
pub struct MethodTable {
    handlers: HashMap<String, Box<dyn MethodHandler>>,
}

impl MethodTable {
    pub fn new() -> Self {
        MethodTable {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for `method`, replacing any previous one.
    pub fn register(&mut self, method: &str, handler: Box<dyn MethodHandler>) -> bool {
        self.handlers.insert(method.to_string(), handler).is_some()
    }

    pub fn unregister(&mut self, method: &str) -> bool {
        self.handlers.remove(method).is_some()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Runs the handler for the request's method. `false` if there is none.
    pub fn dispatch(&self, request: InboundRequest, client: &Client) -> bool {
        match self.handlers.get(&request.method) {
            Some(handler) => {
                event!(
                    Level::INFO,
                    "invoking method {} for {}",
                    request.method,
                    request.sender
                );
                handler.handle(request, client);
                true
            }
            None => {
                event!(Level::DEBUG, "no handler for method {}", request.method);
                false
            }
        }
    }
}
