//! The LIMP client engine.
//!
//! One persistent WebSocket connection, many concurrent logical calls.
//! [`LimpClient`] owns the connection lifecycle and the receiver loop
//! running in a spawned task (aborted on drop). Inbound frames fan out by
//! call id through the [`Router`]; calls issued before their gating
//! condition holds wait in the [`PendingQueue`].
//!
//! # Lifecycle
//!
//! ```text
//! connect() ── socket up ──▶ NotInited
//!     server CORE_CONN_READY ──▶ reset, bootstrap conn/verify
//!     server CORE_CONN_OK ──▶ Inited (no-auth queue flushes, heartbeat on)
//!     server CORE_CONN_CLOSED ──▶ reset back to NotInited
//!     clean stream end ──▶ Finished, or reconnect while the retry
//!                          budget lasts and force_retry is set
//! ```
//!
//! A session reported in any frame's `args.session` is applied centrally:
//! a real session persists credentials and unlocks the auth queue; the
//! anonymous sentinel revokes both.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, warn};

use crate::auth;
use crate::config::Config;
use crate::error::LimpError;
use crate::files::FileHandle;
use crate::heartbeat;
use crate::query::{Query, QueryOp};
use crate::queue::{Bucket, PendingQueue, QueuedCall};
use crate::router::{CallHandle, Router};
use crate::signing;
use crate::store::{CredentialStore, MemoryStore, KEY_SID, KEY_TOKEN};
use crate::transport::Transport;
use crate::types::{
    Envelope, OutboundFrame, Response, Session, ANON_SID, CODE_CONN_CLOSED, CODE_CONN_OK,
    CODE_CONN_READY,
};
use crate::upload;

/// Bootstrap endpoint exempt from all gating.
const VERIFY_ENDPOINT: &str = "conn/verify";

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotInited,
    Inited,
    Finished,
}

/// Target of a `watch/delete` call.
#[derive(Debug, Clone)]
pub enum WatchTarget {
    Id(String),
    All,
}

impl WatchTarget {
    fn as_str(&self) -> &str {
        match self {
            WatchTarget::Id(id) => id,
            WatchTarget::All => "__all",
        }
    }
}

/// One doc attribute value: plain JSON, or attachments for the splitter.
pub enum DocValue {
    Json(Value),
    Files(Vec<Arc<dyn FileHandle>>),
}

impl From<Value> for DocValue {
    fn from(v: Value) -> Self {
        DocValue::Json(v)
    }
}

/// Arguments for one call.
#[derive(Default)]
pub struct CallArgs {
    query: Query,
    doc: BTreeMap<String, DocValue>,
    sid: Option<String>,
    token: Option<String>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Set one doc attribute to a plain JSON value.
    pub fn doc(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.doc.insert(attr.into(), DocValue::Json(value.into()));
        self
    }

    /// Bind one doc attribute to attachments; the splitter replaces it
    /// with the file names and uploads the content in chunks.
    pub fn files(mut self, attr: impl Into<String>, files: Vec<Arc<dyn FileHandle>>) -> Self {
        self.doc.insert(attr.into(), DocValue::Files(files));
        self
    }

    /// Override the transport identity for this call only.
    pub fn credentials(mut self, sid: impl Into<String>, token: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self.token = Some(token.into());
        self
    }
}

struct ConnState {
    phase: Phase,
    authed: bool,
    session: Option<Session>,
}

impl Default for ConnState {
    fn default() -> Self {
        Self {
            phase: Phase::NotInited,
            authed: false,
            session: None,
        }
    }
}

pub(crate) struct ClientInner {
    pub(crate) config: Config,
    pub(crate) store: Arc<dyn CredentialStore>,
    pub(crate) router: Router,
    queue: PendingQueue,
    state: Mutex<ConnState>,
    out_tx: mpsc::UnboundedSender<OutboundFrame>,
    inited_tx: watch::Sender<bool>,
    session_tx: watch::Sender<Option<Session>>,
    active_tx: watch::Sender<bool>,
    pub(crate) heartbeat_misses: AtomicU64,
}

/// The client engine. Dropping it aborts the connection and heartbeat
/// tasks.
pub struct LimpClient {
    inner: Arc<ClientInner>,
    conn_task: tokio::task::JoinHandle<()>,
    heartbeat_task: tokio::task::JoinHandle<()>,
}

impl Drop for LimpClient {
    fn drop(&mut self) {
        self.conn_task.abort();
        self.heartbeat_task.abort();
        debug!("Client dropped, tasks aborted");
    }
}

impl LimpClient {
    /// Connect with a volatile in-memory credential store.
    pub async fn connect(config: Config) -> Result<Self, LimpError> {
        Self::connect_with_store(config, Arc::new(MemoryStore::new())).await
    }

    /// Connect with an embedder-supplied credential store.
    ///
    /// Returns once the socket is up; readiness (`CORE_CONN_OK`) arrives
    /// asynchronously and releases the no-auth queue. Calls made before
    /// that are buffered, not rejected.
    pub async fn connect_with_store(
        config: Config,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, LimpError> {
        config.validate()?;
        info!(endpoint = %config.endpoint_url, "Connecting");
        let transport = Transport::connect(&config.endpoint_url).await?;

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (inited_tx, inited_rx) = watch::channel(false);
        let (session_tx, _) = watch::channel::<Option<Session>>(None);
        let (active_tx, active_rx) = watch::channel(true);

        let inner = Arc::new(ClientInner {
            config,
            store,
            router: Router::new(),
            queue: PendingQueue::new(),
            state: Mutex::new(ConnState::default()),
            out_tx,
            inited_tx,
            session_tx,
            active_tx,
            heartbeat_misses: AtomicU64::new(0),
        });

        let conn_task = tokio::spawn(connection_loop(Arc::clone(&inner), transport, out_rx));
        let heartbeat_task = tokio::spawn(heartbeat::run(Arc::clone(&inner), inited_rx, active_rx));

        Ok(Self {
            inner,
            conn_task,
            heartbeat_task,
        })
    }

    /// Issue a call and return its result channel without waiting.
    ///
    /// Attachment reads happen here, synchronously; the send itself may
    /// be deferred behind chunk uploads or the pending queue.
    pub fn start_call(
        &self,
        endpoint: &str,
        args: CallArgs,
        require_auth: bool,
    ) -> Result<CallHandle, LimpError> {
        ClientInner::start_call(&self.inner, endpoint, args, require_auth)
    }

    /// Issue a call and wait for its first (terminal) response.
    pub async fn call(&self, endpoint: &str, args: CallArgs) -> Result<Response, LimpError> {
        self.start_call(endpoint, args, false)?.into_response().await
    }

    /// Like [`call`](Self::call), but gated on an authenticated session.
    pub async fn call_authed(
        &self,
        endpoint: &str,
        args: CallArgs,
    ) -> Result<Response, LimpError> {
        self.start_call(endpoint, args, true)?.into_response().await
    }

    /// Sign in with one of the configured auth attributes.
    ///
    /// Validation failures surface before any frame is sent. The session
    /// itself is applied centrally when the server reports it.
    pub async fn authenticate(
        &self,
        auth_var: &str,
        auth_val: &str,
        password: &str,
    ) -> Result<Response, LimpError> {
        {
            let state = self.inner.state();
            if state.authed || state.session.is_some() {
                return Err(LimpError::AlreadyAuthed);
            }
        }
        if !self.inner.config.auth_attrs.iter().any(|a| a == auth_var) {
            return Err(LimpError::UnknownAuthAttr(auth_var.to_string()));
        }
        let hash = auth::generate_auth_hash(&self.inner.config, auth_var, auth_val, password)?;
        let args = CallArgs::new().doc("hash", hash).doc(auth_var, auth_val);
        self.call("session/auth", args).await
    }

    /// Re-establish a session from cached credentials.
    ///
    /// Travels under the anonymous transport identity. On failure the
    /// cached credentials are evicted and local auth state cleared.
    pub async fn reauthenticate(&self, sid: &str, token: &str) -> Result<Response, LimpError> {
        let signed = signing::sign(&serde_json::json!({ "token": token }), token)?;
        let hash = signing::payload_segment(&signed).to_string();
        let sid = if sid.is_empty() { ANON_SID } else { sid };
        let query = Query::new()
            .matches("_id", QueryOp::eq(sid))
            .matches("hash", QueryOp::eq(hash));
        let args = CallArgs::new()
            .query(query)
            .credentials(ANON_SID, self.inner.config.anon_token.clone());
        match self.call("session/reauth", args).await {
            Ok(res) => Ok(res),
            Err(e) => {
                warn!(error = %e, "Reauth failed, evicting cached credentials");
                self.inner.store.remove(KEY_TOKEN);
                self.inner.store.remove(KEY_SID);
                self.inner.clear_auth_state();
                Err(e)
            }
        }
    }

    /// Re-authenticate from the credential store, failing fast when
    /// nothing is cached.
    pub async fn check_auth(&self) -> Result<Response, LimpError> {
        let sid = self.inner.store.get(KEY_SID);
        let token = self.inner.store.get(KEY_TOKEN);
        let (Some(sid), Some(token)) = (sid, token) else {
            return Err(LimpError::NoCredentialsCached);
        };
        self.reauthenticate(&sid, &token).await
    }

    /// Terminate the current session server-side and clear local state.
    pub async fn sign_out(&self) -> Result<Response, LimpError> {
        if !self.inner.state().authed {
            return Err(LimpError::NotAuthed);
        }
        let sid = self
            .inner
            .store
            .get(KEY_SID)
            .ok_or(LimpError::NoCredentialsCached)?;
        let query = Query::new().matches("_id", QueryOp::eq(sid));
        let res = self.call("session/signout", CallArgs::new().query(query)).await?;
        self.inner.store.remove(KEY_TOKEN);
        self.inner.store.remove(KEY_SID);
        self.inner.clear_auth_state();
        Ok(res)
    }

    /// Ask the server to close one or all open watches. The routing
    /// entries close when the server sends the terminal frames, not as a
    /// side effect of this call.
    pub async fn delete_watch(&self, target: WatchTarget) -> Result<Response, LimpError> {
        let query = Query::new().matches("watch", QueryOp::eq(target.as_str()));
        self.call("watch/delete", CallArgs::new().query(query)).await
    }

    /// Ask the server to terminate the connection cleanly.
    pub async fn close(&self) -> Result<Response, LimpError> {
        self.call("conn/close", CallArgs::new()).await
    }

    /// Clear session and auth state. With `force`, the
    /// `Inited -> NotInited` notification fires even if nothing was set.
    pub fn reset(&self, force: bool) {
        self.inner.reset(force);
    }

    /// Pause the heartbeat (e.g. app going to background).
    pub fn suspend(&self) {
        let _ = self.inner.active_tx.send(false);
    }

    /// Resume the heartbeat on the next ready interval.
    pub fn resume(&self) {
        let _ = self.inner.active_tx.send(true);
    }

    pub fn phase(&self) -> Phase {
        self.inner.state().phase
    }

    pub fn is_inited(&self) -> bool {
        self.phase() == Phase::Inited
    }

    pub fn is_authed(&self) -> bool {
        self.inner.state().authed
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.state().session.clone()
    }

    /// Heartbeat calls that failed since connect.
    pub fn heartbeat_misses(&self) -> u64 {
        self.inner.heartbeat_misses.load(Ordering::Relaxed)
    }

    /// Observe readiness transitions.
    pub fn subscribe_inited(&self) -> watch::Receiver<bool> {
        self.inner.inited_tx.subscribe()
    }

    /// Observe session changes; `None` means signed out or revoked.
    pub fn subscribe_session(&self) -> watch::Receiver<Option<Session>> {
        self.inner.session_tx.subscribe()
    }
}

impl ClientInner {
    fn state(&self) -> MutexGuard<'_, ConnState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transport identity at envelope-build time.
    fn credentials(&self) -> (String, String) {
        let authed = self.state().authed;
        if authed {
            (
                self.store
                    .get(KEY_SID)
                    .unwrap_or_else(|| ANON_SID.to_string()),
                self.store
                    .get(KEY_TOKEN)
                    .unwrap_or_else(|| self.config.anon_token.clone()),
            )
        } else {
            (ANON_SID.to_string(), self.config.anon_token.clone())
        }
    }

    pub(crate) fn start_call(
        this: &Arc<Self>,
        endpoint: &str,
        args: CallArgs,
        require_auth: bool,
    ) -> Result<CallHandle, LimpError> {
        let CallArgs {
            query,
            doc: raw_doc,
            sid,
            token,
        } = args;

        let call_id = this.router.next_call_id();
        let explicit_creds = sid.is_some() || token.is_some();
        let (default_sid, default_token) = this.credentials();
        let sid = sid.unwrap_or(default_sid);
        let token = token.unwrap_or(default_token);

        // Attachments become placeholder name lists; their content goes
        // out as independent chunk calls the parent send waits on.
        let mut doc = Map::new();
        let mut dependents: Vec<CallHandle> = Vec::new();
        for (attr, value) in raw_doc {
            match value {
                DocValue::Json(v) => {
                    doc.insert(attr, v);
                }
                DocValue::Files(files) => {
                    debug!(attr = %attr, count = files.len(), "Splitting attachments");
                    let mut names = Vec::with_capacity(files.len());
                    for (index, file) in files.iter().enumerate() {
                        names.push(Value::String(file.name().to_string()));
                        for chunk_doc in upload::split_attachment(
                            &attr,
                            index,
                            file.as_ref(),
                            this.config.file_chunk_size,
                        )? {
                            let chunk_args = CallArgs {
                                query: Query::new(),
                                doc: chunk_doc
                                    .into_iter()
                                    .map(|(k, v)| (k, DocValue::Json(v)))
                                    .collect(),
                                sid: None,
                                token: None,
                            };
                            dependents.push(Self::start_call(
                                this,
                                upload::UPLOAD_ENDPOINT,
                                chunk_args,
                                false,
                            )?);
                        }
                    }
                    doc.insert(attr, Value::Array(names));
                }
            }
        }

        let envelope = Envelope {
            call_id: call_id.clone(),
            endpoint: endpoint.to_string(),
            sid,
            token,
            query,
            doc,
        };
        let handle = this.router.register(&call_id);

        let (sendable, bucket) = {
            let state = this.state();
            let inited = state.phase == Phase::Inited;
            let open = endpoint == VERIFY_ENDPOINT || (inited && (!require_auth || state.authed));
            let bucket = if require_auth {
                Bucket::Auth
            } else {
                Bucket::NoAuth
            };
            (open, bucket)
        };

        if !sendable {
            this.queue.push(
                bucket,
                QueuedCall {
                    envelope,
                    dependents,
                    explicit_creds,
                },
            );
            warn!(
                endpoint = %endpoint,
                call_id = %call_id,
                bucket = ?bucket,
                queued = this.queue.len(bucket),
                "Not ready, queuing call"
            );
        } else if dependents.is_empty() {
            if let Err(e) = this.sign_and_send(&envelope, &envelope.token) {
                this.router.remove(&call_id);
                return Err(e);
            }
        } else {
            // Hold the parent until every chunk call settles, then stamp
            // the credentials active at that point.
            let inner = Arc::clone(this);
            let mut dependents = dependents;
            let mut envelope = envelope;
            tokio::spawn(async move {
                if inner.await_dependents(&mut dependents).await {
                    if !explicit_creds {
                        let (sid, token) = inner.credentials();
                        envelope.sid = sid;
                        envelope.token = token;
                    }
                    if let Err(e) = inner.sign_and_send(&envelope, &envelope.token) {
                        error!(error = %e, call_id = %envelope.call_id, "Deferred send failed");
                        inner.router.fail(&envelope.call_id, e);
                    }
                }
            });
        }

        Ok(handle)
    }

    /// Wait for all dependent chunk calls. Completion order does not
    /// matter, only the aggregate outcome.
    async fn await_dependents(&self, dependents: &mut Vec<CallHandle>) -> bool {
        for dep in dependents.iter_mut() {
            if let Err(e) = dep.recv().await {
                warn!(error = %e, "Chunk upload failed, parent call will not be sent");
                return false;
            }
        }
        true
    }

    fn sign_and_send(&self, envelope: &Envelope, secret: &str) -> Result<(), LimpError> {
        let token = signing::sign_envelope(envelope, secret)?;
        debug!(
            call_id = %envelope.call_id,
            endpoint = %envelope.endpoint,
            "Sending signed envelope"
        );
        self.out_tx
            .send(OutboundFrame {
                token,
                call_id: Some(envelope.call_id.clone()),
            })
            .map_err(|_| LimpError::Transport("connection task gone".into()))
    }

    /// Drain one bucket in submission order. Each entry is restamped with
    /// the credentials active at flush time, so the envelope identity and
    /// the signing secret always agree; caller-supplied credentials are
    /// left untouched.
    async fn flush(self: Arc<Self>, bucket: Bucket) {
        let entries = self.queue.drain(bucket);
        if entries.is_empty() {
            return;
        }
        info!(count = entries.len(), bucket = ?bucket, "Flushing queued calls");
        let (sid, token) = self.credentials();
        for mut entry in entries {
            if !self.await_dependents(&mut entry.dependents).await {
                continue;
            }
            if !entry.explicit_creds {
                entry.envelope.sid = sid.clone();
                entry.envelope.token = token.clone();
            }
            if let Err(e) = self.sign_and_send(&entry.envelope, &entry.envelope.token) {
                error!(
                    error = %e,
                    call_id = %entry.envelope.call_id,
                    "Failed to send queued call"
                );
                self.router.fail(&entry.envelope.call_id, e);
            }
        }
    }

    pub(crate) fn reset(&self, force: bool) {
        let mut state = self.state();
        let had_session = state.authed || state.session.is_some();
        state.authed = false;
        state.session = None;
        let was_inited = state.phase == Phase::Inited;
        let notify_inited = force || was_inited;
        if notify_inited {
            state.phase = Phase::NotInited;
        }
        drop(state);
        if had_session {
            let _ = self.session_tx.send(None);
        }
        if notify_inited {
            let _ = self.inited_tx.send(false);
        }
        debug!(forced = force, "Local session state reset");
    }

    fn clear_auth_state(&self) {
        let mut state = self.state();
        let had = state.authed || state.session.is_some();
        state.authed = false;
        state.session = None;
        drop(state);
        if had {
            let _ = self.session_tx.send(None);
        }
    }

    fn finish(&self) {
        self.state().phase = Phase::Finished;
        info!("Connection finished");
    }

    /// Apply a session reported in any inbound frame. The anonymous
    /// sentinel is an implicit revocation regardless of originating call.
    fn apply_session(this: &Arc<Self>, session: Session) {
        if session.is_anonymous() {
            debug!("Anonymous session received, revoking credentials");
            this.store.remove(KEY_TOKEN);
            this.store.remove(KEY_SID);
            this.clear_auth_state();
        } else {
            this.store.put(KEY_SID, &session.id);
            this.store.put(KEY_TOKEN, &session.token);
            {
                let mut state = this.state();
                state.authed = true;
                state.session = Some(session.clone());
            }
            info!(sid = %session.id, "Session established");
            let _ = this.session_tx.send(Some(session));
            tokio::spawn(Arc::clone(this).flush(Bucket::Auth));
        }
    }

    /// Decode and dispatch one inbound frame: control codes first, then
    /// the central session observer, then call routing.
    fn handle_frame(this: &Arc<Self>, raw: &str) {
        let res: Response = match serde_json::from_str(raw) {
            Ok(res) => res,
            Err(e) => {
                error!(error = %e, "Failed to decode inbound frame");
                return;
            }
        };
        debug!(
            status = res.status,
            code = ?res.args.code,
            call_id = ?res.args.call_id,
            "Frame received"
        );

        match res.args.code.as_deref() {
            Some(CODE_CONN_READY) => {
                info!("Server ready, verifying connection");
                this.reset(false);
                match Self::start_call(this, VERIFY_ENDPOINT, CallArgs::new(), false) {
                    Ok(handle) => {
                        tokio::spawn(async move {
                            match handle.into_response().await {
                                Ok(_) => debug!("Connection verified"),
                                Err(e) => warn!(error = %e, "conn/verify failed"),
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "Could not start conn/verify"),
                }
            }
            Some(CODE_CONN_OK) => {
                this.state().phase = Phase::Inited;
                let _ = this.inited_tx.send(true);
                info!("Connection ready");
                tokio::spawn(Arc::clone(this).flush(Bucket::NoAuth));
            }
            Some(CODE_CONN_CLOSED) => {
                info!("Server signalled connection close");
                this.reset(false);
            }
            _ => {}
        }

        if let Some(session) = res.args.session.clone() {
            Self::apply_session(this, session);
        }
        if res.args.call_id.is_some() {
            this.router.deliver(&res);
        }
    }
}

enum LoopEnd {
    /// Clean stream termination; eligible for retry.
    Clean,
    /// Transport-level failure.
    Failed,
    /// All client handles gone; nothing left to serve.
    Stopped,
}

/// Owns the socket for its whole life: writes outbound frames, dispatches
/// inbound ones, and applies the reconnection policy when the stream ends.
async fn connection_loop(
    inner: Arc<ClientInner>,
    transport: Transport,
    mut out_rx: mpsc::UnboundedReceiver<OutboundFrame>,
) {
    let mut retries_left = inner.config.max_retries;
    let mut current = Some(transport);

    loop {
        let transport = match current.take() {
            Some(t) => t,
            None => match Transport::connect(&inner.config.endpoint_url).await {
                Ok(t) => t,
                Err(e) => {
                    error!(error = %e, "Reconnect failed");
                    inner.router.fail_all("reconnect failed");
                    inner.finish();
                    return;
                }
            },
        };
        let (mut sink, mut stream) = transport.split();
        debug!("Receiver loop started");

        let end = loop {
            tokio::select! {
                maybe_frame = out_rx.recv() => match maybe_frame {
                    Some(frame) => {
                        let text = match serde_json::to_string(&frame) {
                            Ok(text) => text,
                            Err(e) => {
                                error!(error = %e, "Failed to encode outbound frame");
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            error!(error = %e, "Send failed");
                            break LoopEnd::Failed;
                        }
                    }
                    None => break LoopEnd::Stopped,
                },
                maybe_msg = stream.next() => match maybe_msg {
                    Some(Ok(Message::Text(text))) => ClientInner::handle_frame(&inner, &text),
                    Some(Ok(Message::Close(frame))) => {
                        info!(frame = ?frame, "Server closed connection");
                        break LoopEnd::Clean;
                    }
                    Some(Ok(_)) => {} // ping/pong/binary: nothing to do
                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        break LoopEnd::Failed;
                    }
                    None => break LoopEnd::Clean,
                },
            }
        };

        debug!("Receiver loop ended");
        inner.router.fail_all("connection lost");

        match end {
            LoopEnd::Stopped => return,
            LoopEnd::Failed => {
                inner.reset(true);
                inner.finish();
                return;
            }
            LoopEnd::Clean => {
                inner.reset(false);
                if inner.config.force_retry && retries_left > 0 {
                    retries_left -= 1;
                    info!(retries_left, "Clean termination, retrying connection");
                    continue;
                }
                inner.finish();
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An inited inner whose connection task is already gone, so every
    /// send fails.
    fn inner_with_closed_writer() -> Arc<ClientInner> {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        drop(out_rx);
        let (inited_tx, _) = watch::channel(true);
        let (session_tx, _) = watch::channel::<Option<Session>>(None);
        let (active_tx, _) = watch::channel(true);
        Arc::new(ClientInner {
            config: Config::new("ws://localhost:9/ws", "__ANON", vec!["email".into()]),
            store: Arc::new(MemoryStore::new()),
            router: Router::new(),
            queue: PendingQueue::new(),
            state: Mutex::new(ConnState {
                phase: Phase::Inited,
                authed: false,
                session: None,
            }),
            out_tx,
            inited_tx,
            session_tx,
            active_tx,
            heartbeat_misses: AtomicU64::new(0),
        })
    }

    #[test]
    fn test_send_failure_does_not_leak_routing_entry() {
        let inner = inner_with_closed_writer();
        let result = ClientInner::start_call(&inner, "blog/read", CallArgs::new(), false);
        assert!(matches!(result, Err(LimpError::Transport(_))));
        assert!(inner.router.is_empty());
    }
}
