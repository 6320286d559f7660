//! Scripted WebSocket server for client integration tests.
//!
//! Accepts one connection at a time (reconnects land on the next accept),
//! decodes each inbound frame's JWS payload segment without verifying the
//! signature, and forwards it to the test. Replies are scripted through
//! [`MockServer::send`], except the `conn/verify` handshake which can be
//! answered automatically.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// One decoded frame from the client.
#[derive(Debug)]
pub struct ClientFrame {
    pub call_id: Option<String>,
    pub token: String,
    pub claims: Value,
}

impl ClientFrame {
    pub fn endpoint(&self) -> &str {
        self.claims["endpoint"].as_str().unwrap_or("")
    }

    pub fn doc(&self) -> &Value {
        &self.claims["doc"]
    }

    pub fn query(&self) -> &Value {
        &self.claims["query"]
    }
}

#[derive(Clone, Copy)]
pub struct MockServerOptions {
    /// Send `CORE_CONN_READY` as soon as a connection is accepted.
    pub auto_ready: bool,
    /// Answer `conn/verify` with `CORE_CONN_OK` automatically.
    pub auto_verify: bool,
}

impl Default for MockServerOptions {
    fn default() -> Self {
        Self {
            auto_ready: true,
            auto_verify: true,
        }
    }
}

enum ServerCmd {
    Frame(Value),
    Close,
}

pub struct MockServer {
    pub url: String,
    frames: mpsc::UnboundedReceiver<ClientFrame>,
    cmd_tx: mpsc::UnboundedSender<ServerCmd>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl MockServer {
    pub async fn start() -> Self {
        Self::start_with(MockServerOptions::default()).await
    }

    pub async fn start_with(opts: MockServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (frames_tx, frames) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(listener, opts, frames_tx, cmd_rx));
        Self {
            url: format!("ws://{addr}"),
            frames,
            cmd_tx,
            task,
        }
    }

    /// Script one frame to the connected client.
    pub fn send(&self, frame: Value) {
        self.cmd_tx.send(ServerCmd::Frame(frame)).unwrap();
    }

    /// Close the current connection cleanly; the accept loop stays up for
    /// a reconnect.
    pub fn close_connection(&self) {
        self.cmd_tx.send(ServerCmd::Close).unwrap();
    }

    /// Next frame from the client, whatever it is.
    pub async fn recv_frame(&mut self) -> ClientFrame {
        tokio::time::timeout(RECV_TIMEOUT, self.frames.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("server task gone")
    }

    /// Next frame that is neither the handshake nor a heartbeat.
    pub async fn recv_call(&mut self) -> ClientFrame {
        loop {
            let frame = self.recv_frame().await;
            match frame.endpoint() {
                "conn/verify" | "heart/beat" => continue,
                _ => return frame,
            }
        }
    }

    /// Assert the client stays silent (handshake/heartbeat excluded).
    pub async fn expect_no_call(&mut self, window: Duration) {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            match tokio::time::timeout_at(deadline, self.frames.recv()).await {
                Err(_) => return,
                Ok(Some(frame)) => match frame.endpoint() {
                    "conn/verify" | "heart/beat" => continue,
                    other => panic!("unexpected call to {other}"),
                },
                Ok(None) => panic!("server task gone"),
            }
        }
    }

    /// Throw away everything currently buffered.
    pub fn drain(&mut self) {
        while self.frames.try_recv().is_ok() {}
    }
}

pub fn ready_frame() -> Value {
    json!({ "status": 200, "msg": "connection ready", "args": { "code": "CORE_CONN_READY" } })
}

pub fn ok_frame(call_id: &str) -> Value {
    json!({
        "status": 200,
        "msg": "connection established",
        "args": { "code": "CORE_CONN_OK", "call_id": call_id }
    })
}

pub fn success_frame(call_id: &str) -> Value {
    json!({ "status": 200, "msg": "done", "args": { "call_id": call_id } })
}

pub fn session_frame(call_id: Option<&str>, sid: &str, token: &str) -> Value {
    let mut args = json!({ "session": { "_id": sid, "token": token } });
    if let Some(id) = call_id {
        args["call_id"] = json!(id);
    }
    json!({ "status": 200, "msg": "authed", "args": args })
}

/// Unverified decode of a compact JWS payload segment.
pub fn decode_claims(token: &str) -> Value {
    let segment = token.split('.').nth(1).unwrap_or("");
    let bytes = URL_SAFE_NO_PAD.decode(segment).expect("bad payload segment");
    serde_json::from_slice(&bytes).expect("payload segment is not JSON")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn run(
    listener: TcpListener,
    opts: MockServerOptions,
    frames_tx: mpsc::UnboundedSender<ClientFrame>,
    mut cmd_rx: mpsc::UnboundedReceiver<ServerCmd>,
) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut ws) = accept_async(stream).await else {
            continue;
        };
        if opts.auto_ready {
            if ws
                .send(Message::Text(ready_frame().to_string()))
                .await
                .is_err()
            {
                continue;
            }
        }
        if !serve(&mut ws, &opts, &frames_tx, &mut cmd_rx).await {
            return;
        }
    }
}

/// Serve one connection. Returns false when the test side is gone.
async fn serve(
    ws: &mut WebSocketStream<TcpStream>,
    opts: &MockServerOptions,
    frames_tx: &mpsc::UnboundedSender<ClientFrame>,
    cmd_rx: &mut mpsc::UnboundedReceiver<ServerCmd>,
) -> bool {
    loop {
        tokio::select! {
            maybe_msg = ws.next() => match maybe_msg {
                Some(Ok(Message::Text(text))) => {
                    let raw: Value = serde_json::from_str(&text).expect("client sent invalid JSON");
                    let token = raw["token"].as_str().unwrap_or("").to_string();
                    let frame = ClientFrame {
                        call_id: raw["call_id"].as_str().map(str::to_string),
                        claims: decode_claims(&token),
                        token,
                    };
                    if opts.auto_verify && frame.endpoint() == "conn/verify" {
                        let call_id = frame.call_id.clone().unwrap_or_default();
                        if ws
                            .send(Message::Text(ok_frame(&call_id).to_string()))
                            .await
                            .is_err()
                        {
                            return true;
                        }
                    }
                    if frames_tx.send(frame).is_err() {
                        return false;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return true,
                Some(Ok(_)) => {}
                Some(Err(_)) => return true,
            },
            maybe_cmd = cmd_rx.recv() => match maybe_cmd {
                Some(ServerCmd::Frame(frame)) => {
                    if ws.send(Message::Text(frame.to_string())).await.is_err() {
                        return true;
                    }
                }
                Some(ServerCmd::Close) => {
                    let _ = ws.send(Message::Close(None)).await;
                    return true;
                }
                None => return false,
            },
        }
    }
}
