//! One authenticated connection to the relay.
//!
//! A session is a single task that owns the connection's state: the
//! authentication machine, the call table and the method table. Nothing
//! else touches them. [`Client`] handles reach the task by message passing,
//! so frames, commands and timer expirations are handled one at a time.

use crate::crypto::Signer;
use crate::error::{CallError, SessionError, SigningError};
use crate::intent::{Intent, Role};
use crate::networking::auth::{AuthState, AuthStep, Authenticator};
use crate::networking::calls::{CallResult, CallTable, PendingCall};
use crate::networking::dispatch::{InboundRequest, MethodHandler, MethodTable};
use crate::networking::envelope::Codec;
use crate::networking::rpc::{RpcError, RpcKind, RpcMessage};
use crate::networking::transport::{RelayChannel, TransportEvent};
use crate::order::{self, Order, SignedOrder};
use futures::future::join_all;
use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{event, Level};

/// The indexer's well-known address.
pub const INDEXER_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub const FIND_INTENTS: &str = "findIntents";
pub const SET_INTENTS: &str = "setIntents";
pub const GET_ORDER: &str = "getOrder";

enum Command {
    Call {
        receiver: String,
        method: String,
        params: Value,
        reply: oneshot::Sender<CallResult>,
    },
    Send {
        receiver: String,
        message: RpcMessage,
    },
    Register {
        method: String,
        handler: Box<dyn MethodHandler>,
    },
    Unregister {
        method: String,
    },
    Close,
}

/// Cloneable handle to a running session.
#[derive(Clone)]
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    signer: Arc<dyn Signer>,
    state: watch::Receiver<AuthState>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.address())
            .field("state", &self.auth_state())
            .finish()
    }
}

impl Client {
    /// A handle whose session is already gone.
    #[cfg(test)]
    pub(crate) fn detached(signer: Arc<dyn Signer>) -> Self {
        let (commands, _) = mpsc::unbounded_channel();
        let (_, state) = watch::channel(AuthState::Disconnected);
        Client {
            commands,
            signer,
            state,
        }
    }

    /// Local address, as used for `sender` on every envelope.
    pub fn address(&self) -> &str {
        self.signer.address()
    }

    pub fn auth_state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Sends `method` to `receiver` and returns the deferred result. The
    /// request is on its way when this returns.
    pub fn call(&self, receiver: &str, method: &str, params: Value) -> PendingCall {
        let (reply, receiver_side) = oneshot::channel();
        let command = Command::Call {
            receiver: receiver.to_string(),
            method: method.to_string(),
            params,
            reply,
        };
        match self.commands.send(command) {
            Ok(()) => PendingCall::new(receiver_side),
            Err(_) => PendingCall::ready(Err(CallError::ConnectionClosed)),
        }
    }

    /// Sends an inner message without waiting for anything back.
    pub fn send(&self, receiver: &str, message: RpcMessage) -> Result<(), CallError> {
        self.commands
            .send(Command::Send {
                receiver: receiver.to_string(),
                message,
            })
            .map_err(|_| CallError::ConnectionClosed)
    }

    /// Answers `request` at its sender. Notifications get no answer.
    pub fn respond(
        &self,
        request: &InboundRequest,
        outcome: Result<Value, RpcError>,
    ) -> Result<(), CallError> {
        let id = match request.id {
            Some(id) => id,
            None => return Ok(()),
        };
        let message = match outcome {
            Ok(result) => RpcMessage::result(id, result),
            Err(error) => RpcMessage::error(id, error),
        };
        self.send(&request.sender, message)
    }

    pub fn register_method<H: MethodHandler>(&self, method: &str, handler: H) {
        let _ = self.commands.send(Command::Register {
            method: method.to_string(),
            handler: Box::new(handler),
        });
    }

    pub fn unregister_method(&self, method: &str) {
        let _ = self.commands.send(Command::Unregister {
            method: method.to_string(),
        });
    }

    /// Ends the session. Pending calls fail with `ConnectionClosed`.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Resolves once the session has shut down.
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        loop {
            if *state.borrow() == AuthState::Disconnected {
                return;
            }
            if state.changed().await.is_err() {
                return;
            }
        }
    }

    /// Signs an order with this session's identity.
    pub fn sign_order(&self, order: Order) -> Result<SignedOrder, SigningError> {
        order::sign_order(order, self.signer.as_ref())
    }

    /// Asks the indexer for intents matching the token lists.
    pub fn find_intents(
        &self,
        maker_tokens: Vec<String>,
        taker_tokens: Vec<String>,
        role: Role,
    ) -> impl Future<Output = Result<Vec<Intent>, CallError>> {
        let pending = self.call(
            INDEXER_ADDRESS,
            FIND_INTENTS,
            json!({
                "makerTokens": maker_tokens,
                "takerTokens": taker_tokens,
                "role": role,
            }),
        );
        async move {
            let result = pending.await?;
            serde_json::from_value(result).map_err(|e| CallError::MalformedResult(e.to_string()))
        }
    }

    /// Publishes our intents to the indexer. Resolves with its status reply.
    pub fn set_intents(&self, intents: Vec<Intent>) -> PendingCall {
        self.call(
            INDEXER_ADDRESS,
            SET_INTENTS,
            json!({
                "address": self.address(),
                "intents": intents,
            }),
        )
    }

    ///
    /// Asks the maker behind each intent for an order.
    ///
    /// All requests go out before any is awaited. The result has one entry
    /// per intent, in order; a maker that errors or never answers fills its
    /// slot with the error instead of failing the batch.
    ///
    pub fn get_orders(
        &self,
        intents: &[Intent],
        maker_amount: &str,
    ) -> impl Future<Output = Vec<Result<SignedOrder, CallError>>> {
        let pending: Vec<PendingCall> = intents
            .iter()
            .map(|intent| match &intent.address {
                Some(address) => self.call(
                    address,
                    GET_ORDER,
                    json!({
                        "makerToken": intent.maker_token,
                        "takerToken": intent.taker_token,
                        "takerAddress": self.address(),
                        "makerAmount": maker_amount,
                    }),
                ),
                None => PendingCall::ready(Err(CallError::MissingAddress)),
            })
            .collect();
        async move {
            join_all(pending)
                .await
                .into_iter()
                .map(|outcome| {
                    outcome.and_then(|result| {
                        serde_json::from_value(result)
                            .map_err(|e| CallError::MalformedResult(e.to_string()))
                    })
                })
                .collect()
        }
    }
}

/// Resolves once the relay accepts or refuses our challenge response.
#[derive(Debug)]
pub struct Authentication {
    receiver: oneshot::Receiver<Result<(), SessionError>>,
}

impl Future for Authentication {
    type Output = Result<(), SessionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SessionError::ConnectionClosed)))
    }
}

/// Starts a session on a freshly opened relay connection.
pub fn start<S: Signer>(channel: RelayChannel, signer: S) -> (Client, Authentication) {
    start_with_signer(channel, Arc::new(signer))
}

pub fn start_with_signer(
    channel: RelayChannel,
    signer: Arc<dyn Signer>,
) -> (Client, Authentication) {
    let (command_sender, command_receiver) = mpsc::unbounded_channel();
    let (expired_sender, expired_receiver) = mpsc::unbounded_channel();
    let (state_sender, state_receiver) = watch::channel(AuthState::AwaitingChallenge);
    let (authenticated_sender, authenticated_receiver) = oneshot::channel();

    let RelayChannel { outbound, inbound } = channel;
    let session = Session {
        codec: Codec::new(signer.address()),
        signer: signer.clone(),
        authenticator: Authenticator::new(),
        calls: CallTable::new(expired_sender),
        methods: MethodTable::new(),
        outbound,
        state: state_sender,
        authenticated: Some(authenticated_sender),
        commands: command_sender.downgrade(),
    };
    let client = Client {
        commands: command_sender,
        signer,
        state: state_receiver,
    };
    tokio::spawn(session.run(inbound, command_receiver, expired_receiver));

    (
        client,
        Authentication {
            receiver: authenticated_receiver,
        },
    )
}

/// Starts a session and waits until the relay has authenticated us.
pub async fn connect<S: Signer>(channel: RelayChannel, signer: S) -> Result<Client, SessionError> {
    let (client, authentication) = start(channel, signer);
    match authentication.await {
        Ok(()) => Ok(client),
        Err(error) => {
            client.close();
            Err(error)
        }
    }
}

struct Session {
    signer: Arc<dyn Signer>,
    codec: Codec,
    authenticator: Authenticator,
    calls: CallTable,
    methods: MethodTable,
    outbound: mpsc::UnboundedSender<String>,
    state: watch::Sender<AuthState>,
    authenticated: Option<oneshot::Sender<Result<(), SessionError>>>,
    // the session ends once every Client is dropped
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl Session {
    async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut expired: mpsc::UnboundedReceiver<u64>,
    ) {
        loop {
            // commands queued before a frame arrived are applied first
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.on_command(command) {
                            break;
                        }
                    }
                    None => {
                        event!(Level::DEBUG, "every client handle dropped");
                        break;
                    }
                },
                Some(id) = expired.recv() => {
                    self.calls.expire(id);
                }
                transport_event = inbound.recv() => match transport_event {
                    Some(TransportEvent::Frame(frame)) => {
                        if !self.on_frame(&frame) {
                            break;
                        }
                    }
                    Some(TransportEvent::Error(error)) => {
                        event!(Level::ERROR, "relay socket error: {}", error);
                    }
                    Some(TransportEvent::Closed) | None => break,
                },
            }
        }
        self.shutdown();
    }

    /// `false` ends the session.
    fn on_frame(&mut self, frame: &str) -> bool {
        match self.authenticator.state() {
            AuthState::AwaitingChallenge => self.on_auth_frame(frame),
            AuthState::Authenticated => {
                self.on_rpc_frame(frame);
                true
            }
            state => {
                event!(Level::DEBUG, "dropping frame received while {}", state);
                true
            }
        }
    }

    fn on_auth_frame(&mut self, frame: &str) -> bool {
        match self.authenticator.handle_frame(frame, self.signer.as_ref()) {
            Ok(AuthStep::Respond(signature)) => {
                if self.outbound.send(signature).is_err() {
                    return false;
                }
                true
            }
            Ok(AuthStep::Authenticated) => {
                event!(Level::INFO, "authenticated as {}", self.codec.local_address());
                let _ = self.state.send(AuthState::Authenticated);
                self.finish_authentication(Ok(()));
                true
            }
            Ok(AuthStep::Rejected) => {
                event!(
                    Level::ERROR,
                    "address {} is not authorized",
                    self.codec.local_address()
                );
                let _ = self.state.send(AuthState::Rejected);
                self.finish_authentication(Err(SessionError::AuthRejected));
                false
            }
            Ok(AuthStep::Ignored) => true,
            Err(error) => {
                event!(Level::ERROR, "could not sign relay challenge: {}", error);
                self.finish_authentication(Err(SessionError::Signing(error)));
                false
            }
        }
    }

    fn on_rpc_frame(&mut self, frame: &str) {
        let decoded = match Codec::decode(frame) {
            Ok(decoded) => decoded,
            Err(error) => {
                event!(Level::WARN, "dropping unparseable frame: {}", error);
                return;
            }
        };
        match decoded.message.kind() {
            Some(RpcKind::Request { method, params, id }) => {
                let request = InboundRequest {
                    sender: decoded.sender,
                    method,
                    params,
                    id,
                };
                match self.client() {
                    Some(client) => {
                        self.methods.dispatch(request, &client);
                    }
                    None => {
                        event!(Level::DEBUG, "no client left to answer {}", request.method);
                    }
                }
            }
            Some(RpcKind::Response { id, outcome }) => {
                match outcome {
                    Ok(result) => self.calls.resolve(id, result),
                    Err(error) => self.calls.reject(id, error),
                };
            }
            None => {
                event!(
                    Level::DEBUG,
                    "dropping message from {} with neither method nor id",
                    decoded.sender
                );
            }
        }
    }

    /// `false` ends the session.
    fn on_command(&mut self, command: Command) -> bool {
        match command {
            Command::Call {
                receiver,
                method,
                params,
                reply,
            } => self.issue(&receiver, &method, params, reply),
            Command::Send { receiver, message } => {
                if !self.authenticator.is_authenticated() {
                    event!(Level::WARN, "not authenticated, dropping message to {}", receiver);
                    return true;
                }
                match self.codec.encode(&receiver, &message) {
                    Ok(frame) => {
                        if self.outbound.send(frame).is_err() {
                            return false;
                        }
                    }
                    Err(error) => {
                        event!(Level::ERROR, "could not encode message to {}: {}", receiver, error);
                    }
                }
            }
            Command::Register { method, handler } => {
                self.methods.register(&method, handler);
            }
            Command::Unregister { method } => {
                self.methods.unregister(&method);
            }
            Command::Close => return false,
        }
        true
    }

    fn issue(
        &mut self,
        receiver: &str,
        method: &str,
        params: Value,
        reply: oneshot::Sender<CallResult>,
    ) {
        if !self.authenticator.is_authenticated() {
            let _ = reply.send(Err(CallError::NotAuthenticated));
            return;
        }
        let id = self.calls.next_free_id(self.codec.ids());
        let message = RpcMessage::request(method, params, id);
        let frame = match self.codec.encode(receiver, &message) {
            Ok(frame) => frame,
            Err(error) => {
                let _ = reply.send(Err(CallError::Encode(error.to_string())));
                return;
            }
        };
        if let Err(reply) = self.calls.register(id, reply) {
            let _ = reply.send(Err(CallError::Encode(format!("call id {} is live", id))));
            return;
        }
        if self.outbound.send(frame).is_err() {
            self.calls.fail(id, CallError::ConnectionClosed);
        }
    }

    /// A fresh handle for method handlers, while any other handle lives.
    fn client(&self) -> Option<Client> {
        let commands = self.commands.upgrade()?;
        Some(Client {
            commands,
            signer: self.signer.clone(),
            state: self.state.subscribe(),
        })
    }

    fn finish_authentication(&mut self, outcome: Result<(), SessionError>) {
        if let Some(authenticated) = self.authenticated.take() {
            let _ = authenticated.send(outcome);
        }
    }

    fn shutdown(&mut self) {
        let failed = self.calls.fail_all(CallError::ConnectionClosed);
        // a rejected identity stays rejected
        if self.authenticator.state() != AuthState::Rejected {
            self.authenticator.reset();
            let _ = self.state.send(AuthState::Disconnected);
        }
        self.finish_authentication(Err(SessionError::ConnectionClosed));
        event!(
            Level::INFO,
            "session for {} closed, {} pending calls failed",
            self.codec.local_address(),
            failed
        );
    }
}
