//! Client engine for LIMP, a WebSocket API protocol multiplexing many
//! concurrent logical calls over one persistent connection.
//!
//! Every outbound call is a JWT-signed envelope carrying a `call_id`;
//! responses echo the id and are routed back to the originating caller.
//! The engine manages the connection state machine, gating and queueing
//! of premature calls, chunked file uploads, session authentication and
//! a keep-alive heartbeat.
//!
//! # Modules
//!
//! | Module      | Responsibility                                     |
//! |-------------|----------------------------------------------------|
//! | [`client`]  | Connection lifecycle, call multiplexer, public API |
//! | [`config`]  | Endpoint, credentials and tuning knobs             |
//! | [`query`]   | Typed query steps and their wire encoding          |
//! | [`auth`]    | Auth hash generation and password policy           |
//! | [`signing`] | JWT envelope signing                               |
//! | [`store`]   | Pluggable credential persistence                   |
//! | [`files`]   | Attachment sources for chunked uploads             |
//! | [`router`]  | Per-call response channels                         |
//! | [`types`]   | Wire types: envelopes, responses, sessions         |
//! | [`error`]   | Error taxonomy                                     |
//!
//! # Example
//!
//! ```no_run
//! use limp_client::{CallArgs, Config, LimpClient, Query, QueryOp};
//!
//! # async fn run() -> Result<(), limp_client::LimpError> {
//! let config = Config::new(
//!     "wss://api.example.com/ws",
//!     "__ANON_TOKEN_f00000000000000000000012",
//!     vec!["email".into()],
//! );
//! let client = LimpClient::connect(config).await?;
//!
//! let res = client
//!     .call(
//!         "blog/read",
//!         CallArgs::new().query(Query::new().matches("status", QueryOp::eq("published"))),
//!     )
//!     .await?;
//! println!("{} docs", res.args.docs.map_or(0, |d| d.len()));
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod files;
pub mod query;
pub mod router;
pub mod signing;
pub mod store;
pub mod types;

mod heartbeat;
mod queue;
mod transport;
mod upload;

pub use client::{CallArgs, DocValue, LimpClient, Phase, WatchTarget};
pub use config::{AuthHashLevel, Config};
pub use error::LimpError;
pub use files::{FileHandle, FsFile, MemoryFile};
pub use query::{Query, QueryOp, QueryStep, SortDir};
pub use router::CallHandle;
pub use store::{CredentialStore, MemoryStore};
pub use types::{Doc, Envelope, Response, ResponseArgs, Session, User, ANON_SID};
