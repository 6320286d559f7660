//! Wire types for the LIMP protocol.
//!
//! Outbound traffic is a signed envelope wrapped in an [`OutboundFrame`];
//! inbound traffic is always a [`Response`]. Control frames reuse the
//! response shape with a recognized `args.code`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::query::Query;

/// Session id meaning "no authenticated session".
pub const ANON_SID: &str = "f00000000000000000000012";

/// Server signals it is ready for the bootstrap `conn/verify` call.
pub const CODE_CONN_READY: &str = "CORE_CONN_READY";
/// Server accepted the bootstrap call; the connection is usable.
pub const CODE_CONN_OK: &str = "CORE_CONN_OK";
/// Server is tearing the connection down.
pub const CODE_CONN_CLOSED: &str = "CORE_CONN_CLOSED";

/// One call's payload: endpoint, credentials and arguments.
///
/// Signed together with issue/expiry stamps as the claims of an outbound
/// frame's JWS token.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub call_id: String,
    pub endpoint: String,
    pub sid: String,
    pub token: String,
    pub query: Query,
    pub doc: Map<String, Value>,
}

/// Envelope plus issue/expiry stamps, exactly as signed on the wire.
#[derive(Debug, Serialize)]
pub struct EnvelopeClaims {
    #[serde(flatten)]
    pub envelope: Envelope,
    pub iat: u64,
    pub exp: u64,
}

/// Outbound wire frame: the signed envelope plus the bare call id so the
/// server can correlate without unwrapping the token first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

/// Inbound wire frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub args: ResponseArgs,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Present on streaming deliveries; keeps the routing entry open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<Vec<Doc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    /// Failure or control code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A server document: `_id` plus arbitrary attributes.
pub type Doc = Map<String, Value>;

/// An authenticated session as reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub host_add: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub expiry: String,
}

impl Session {
    /// The sentinel session the server hands out when nobody is signed in.
    pub fn is_anonymous(&self) -> bool {
        self.id == ANON_SID
    }
}

/// The user a session belongs to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", default)]
    pub id: String,
    /// Localized display name, keyed by locale.
    #[serde(default)]
    pub name: HashMap<String, String>,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub login_time: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub privileges: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub attrs: Map<String, Value>,
}
