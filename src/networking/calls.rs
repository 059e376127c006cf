//! Outstanding calls awaiting a response.
//!
//! Every outbound request registers a [`Call`] under its inner id. The call
//! completes exactly once: with the matching response, with a timeout
//! error when its timer fires first, or with `ConnectionClosed` when the
//! session ends. Responses for ids that are not live (late, duplicated, or
//! never issued) are dropped.

use crate::error::CallError;
use crate::networking::envelope::IdSource;
use crate::networking::rpc::RpcError;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{event, Level};

/// How long any call waits for its response.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(12);

pub type CallResult = Result<Value, CallError>;

/// A registered call. Owned by the [`CallTable`].
#[derive(Debug)]
pub struct Call {
    deadline: Instant,
    reply: oneshot::Sender<CallResult>,
    timer: JoinHandle<()>,
}

#[derive(Debug)]
pub struct CallTable {
    calls: HashMap<u64, Call>,
    expired: mpsc::UnboundedSender<u64>,
}

impl CallTable {
    /// Timers report the ids of calls whose deadline passed on `expired`.
    /// The owner feeds them back through [`CallTable::expire`].
    pub fn new(expired: mpsc::UnboundedSender<u64>) -> Self {
        CallTable {
            calls: HashMap::new(),
            expired,
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.calls.contains_key(&id)
    }

    /// Draws ids from `ids` until one is not held by a live call.
    pub fn next_free_id(&self, ids: &mut IdSource) -> u64 {
        loop {
            let id = ids.next_id();
            if !self.contains(id) {
                return id;
            }
        }
    }

    /// Registers a call and starts its timer. A live id is refused and the
    /// reply handed back.
    pub fn register(
        &mut self,
        id: u64,
        reply: oneshot::Sender<CallResult>,
    ) -> Result<(), oneshot::Sender<CallResult>> {
        if self.contains(id) {
            return Err(reply);
        }
        let deadline = Instant::now() + CALL_TIMEOUT;
        let expired = self.expired.clone();
        let timer = tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = expired.send(id);
        });
        self.calls.insert(
            id,
            Call {
                deadline,
                reply,
                timer,
            },
        );
        Ok(())
    }

    /// Completes the call with its result. `false` if no call was live.
    pub fn resolve(&mut self, id: u64, result: Value) -> bool {
        self.complete(id, Ok(result))
    }

    /// Completes the call with the error the counterparty returned.
    pub fn reject(&mut self, id: u64, error: RpcError) -> bool {
        self.complete(id, Err(CallError::Remote(error)))
    }

    /// Times the call out if its deadline has passed.
    pub fn expire(&mut self, id: u64) -> bool {
        match self.calls.get(&id) {
            Some(call) if call.deadline <= Instant::now() => {
                event!(Level::WARN, "call {} timed out", id);
                self.complete(id, Err(CallError::timeout(id)))
            }
            _ => false,
        }
    }

    /// Fails a single call, e.g. when its request could not be sent.
    pub fn fail(&mut self, id: u64, error: CallError) -> bool {
        self.complete(id, Err(error))
    }

    /// Fails every live call and cancels their timers.
    pub fn fail_all(&mut self, error: CallError) -> usize {
        let ids: Vec<u64> = self.calls.keys().copied().collect();
        for id in &ids {
            self.complete(*id, Err(error.clone()));
        }
        ids.len()
    }

    fn complete(&mut self, id: u64, outcome: CallResult) -> bool {
        match self.calls.remove(&id) {
            Some(call) => {
                call.timer.abort();
                // the caller may have stopped waiting
                let _ = call.reply.send(outcome);
                true
            }
            None => {
                event!(Level::DEBUG, "no live call {}, dropping its completion", id);
                false
            }
        }
    }
}

impl Drop for CallTable {
    fn drop(&mut self) {
        for call in self.calls.values() {
            call.timer.abort();
        }
    }
}

/// The deferred result of an issued call.
#[derive(Debug)]
pub struct PendingCall {
    receiver: oneshot::Receiver<CallResult>,
}

impl PendingCall {
    pub fn new(receiver: oneshot::Receiver<CallResult>) -> Self {
        PendingCall { receiver }
    }

    /// A call that is already complete.
    pub fn ready(outcome: CallResult) -> Self {
        let (reply, receiver) = oneshot::channel();
        let _ = reply.send(outcome);
        PendingCall { receiver }
    }
}

impl Future for PendingCall {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CallError::ConnectionClosed)))
    }
}
