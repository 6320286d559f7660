//! Envelope signing.
//!
//! Every outbound call travels as a compact HS256 JWS token keyed by the
//! credential active at send time: the configured anonymous secret, or the
//! session token once authenticated. The server unwraps and verifies the
//! token; the client never validates inbound material.

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::LimpError;
use crate::types::{Envelope, EnvelopeClaims};

/// Envelope expiry horizon: one day after issue.
pub const ENVELOPE_TTL_SECS: u64 = 86_400;

/// Sign arbitrary claims into a compact HS256 token.
pub fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, LimpError> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Stamp an envelope with `iat`/`exp` and sign it.
pub fn sign_envelope(envelope: &Envelope, secret: &str) -> Result<String, LimpError> {
    let iat = unix_now();
    let claims = EnvelopeClaims {
        envelope: envelope.clone(),
        iat,
        exp: iat + ENVELOPE_TTL_SECS,
    };
    sign(&claims, secret)
}

/// Middle (payload) segment of a compact JWS token.
///
/// The auth hash scheme transmits only this segment, never the full token.
pub fn payload_segment(token: &str) -> &str {
    token.split('.').nth(1).unwrap_or("")
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
