//! WebSocket transport layer.
//!
//! Connects to the endpoint and exchanges JSON text frames. No knowledge
//! of envelopes, sessions or call routing.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::LimpError;

/// Send half of the WebSocket.
pub type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, Message>;

/// Receive half of the WebSocket.
pub type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// A connected WebSocket with no protocol knowledge. Can only be
/// constructed via [`Transport::connect`].
pub struct Transport {
    sink: WsSink,
    stream: WsStream,
}

impl Transport {
    /// Connect to a `ws://` or `wss://` endpoint.
    pub async fn connect(url: &str) -> Result<Self, LimpError> {
        debug!(url = %url, "Connecting to WebSocket");
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| LimpError::Transport(format!("WebSocket connect failed: {e}")))?;
        let (sink, stream) = ws.split();
        debug!(url = %url, "WebSocket connected");
        Ok(Self { sink, stream })
    }

    /// Split into separate halves for concurrent send/receive.
    pub fn split(self) -> (WsSink, WsStream) {
        (self.sink, self.stream)
    }
}
