//! Connection keep-alive.
//!
//! Issues a `heart/beat` call on a fixed interval while the connection is
//! ready and the client is active. Failures are counted, never fatal; a
//! dead socket surfaces through the receiver loop, not here.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::client::{CallArgs, ClientInner};

const HEARTBEAT_ENDPOINT: &str = "heart/beat";

/// Run the keeper until the client is dropped.
///
/// Parks while the connection is not inited or the client is suspended,
/// and re-arms the interval on each resume so the first beat lands a full
/// period after readiness.
pub(crate) async fn run(
    inner: Arc<ClientInner>,
    mut inited_rx: watch::Receiver<bool>,
    mut active_rx: watch::Receiver<bool>,
) {
    loop {
        // Park until both conditions hold.
        while !(*inited_rx.borrow() && *active_rx.borrow()) {
            tokio::select! {
                changed = inited_rx.changed() => if changed.is_err() { return },
                changed = active_rx.changed() => if changed.is_err() { return },
            }
        }
        debug!(interval = ?inner.config.heartbeat_interval, "Heartbeat armed");

        let mut ticker = tokio::time::interval(inner.config.heartbeat_interval);
        ticker.tick().await; // first tick resolves immediately

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    beat(&inner);
                }
                changed = inited_rx.changed() => {
                    if changed.is_err() { return }
                    if !*inited_rx.borrow() { break }
                }
                changed = active_rx.changed() => {
                    if changed.is_err() { return }
                    if !*active_rx.borrow() { break }
                }
            }
        }
        debug!("Heartbeat parked");
    }
}

fn beat(inner: &Arc<ClientInner>) {
    match ClientInner::start_call(inner, HEARTBEAT_ENDPOINT, CallArgs::new(), false) {
        Ok(handle) => {
            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                if let Err(e) = handle.into_response().await {
                    inner.heartbeat_misses.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "Heartbeat failed");
                }
            });
        }
        Err(e) => {
            inner.heartbeat_misses.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Could not issue heartbeat");
        }
    }
}
