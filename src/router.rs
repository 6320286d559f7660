//! Call multiplexer routing.
//!
//! Exactly one routing entry exists per in-flight call id. Deliveries
//! carrying `args.watch` keep the entry open for repeated (streaming)
//! frames; any frame without it, and any error frame, is terminal and
//! tears the entry down.

use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::LimpError;
use crate::types::Response;

pub type CallResult = Result<Response, LimpError>;

/// Fan-out from the shared inbound-frame stream to per-call waiters.
#[derive(Default)]
pub struct Router {
    entries: DashMap<String, mpsc::UnboundedSender<CallResult>>,
}

/// Receiving half of one call's result channel.
pub struct CallHandle {
    call_id: String,
    rx: mpsc::UnboundedReceiver<CallResult>,
}

impl CallHandle {
    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Wait for the next response routed to this call. Watch calls may
    /// receive many; everything else receives exactly one.
    pub async fn recv(&mut self) -> CallResult {
        match self.rx.recv().await {
            Some(result) => result,
            None => Err(LimpError::ChannelClosed),
        }
    }

    /// Wait for the first response and consume the handle.
    pub async fn into_response(mut self) -> CallResult {
        self.recv().await
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a short call id unused by any in-flight call.
    pub fn next_call_id(&self) -> String {
        loop {
            let id: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(7)
                .map(char::from)
                .collect::<String>()
                .to_lowercase();
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    /// Register a waiter for `call_id` on the inbound stream.
    pub fn register(&self, call_id: &str) -> CallHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        self.entries.insert(call_id.to_string(), tx);
        CallHandle {
            call_id: call_id.to_string(),
            rx,
        }
    }

    /// Route a response to the waiter whose call id matches exactly.
    ///
    /// `status == 200` delivers success, anything else a server error. A
    /// successful response carrying `args.watch` is a streaming delivery
    /// and keeps the entry open; everything else is terminal and tears
    /// the entry down.
    pub fn deliver(&self, res: &Response) {
        let Some(call_id) = res.args.call_id.as_deref() else {
            return;
        };
        let result = if res.is_success() {
            Ok(res.clone())
        } else {
            Err(LimpError::from_response(res))
        };
        if res.args.watch.is_some() && res.is_success() {
            if let Some(tx) = self.entries.get(call_id) {
                let _ = tx.send(result);
            }
        } else if let Some((_, tx)) = self.entries.remove(call_id) {
            let _ = tx.send(result);
            debug!(call_id = %call_id, "Routing entry closed");
        }
    }

    /// Deliver a transport-level error to one call and tear its entry down.
    pub fn fail(&self, call_id: &str, err: LimpError) {
        if let Some((_, tx)) = self.entries.remove(call_id) {
            let _ = tx.send(Err(err));
        }
    }

    /// Drop a waiter without delivering anything. Used when a call fails
    /// before its frame reaches the connection task.
    pub fn remove(&self, call_id: &str) {
        self.entries.remove(call_id);
    }

    /// Drain every entry, watch entries included. Used when the
    /// connection dies.
    pub fn fail_all(&self, reason: &str) {
        let ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, tx)) = self.entries.remove(&id) {
                let _ = tx.send(Err(LimpError::Transport(reason.to_string())));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
