//! Error types for limp-client

use thiserror::Error;

use crate::types::Response;

#[derive(Error, Debug)]
pub enum LimpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error {status}: {msg} (code: {code:?})")]
    Server {
        status: u16,
        code: Option<String>,
        msg: String,
    },

    #[error("No credentials cached")]
    NoCredentialsCached,

    #[error("Password should be 8 chars at least, with one lower-case char, one upper-case char and one digit")]
    PasswordPolicy,

    #[error("Unknown authVar '{0}'")]
    UnknownAuthAttr(String),

    #[error("User already authed")]
    AlreadyAuthed,

    #[error("User not authed")]
    NotAuthed,

    #[error("Call channel closed before a response arrived")]
    ChannelClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

impl LimpError {
    /// Build a server error from a non-200 response frame.
    pub(crate) fn from_response(res: &Response) -> Self {
        LimpError::Server {
            status: res.status,
            code: res.args.code.clone(),
            msg: res.msg.clone(),
        }
    }
}
