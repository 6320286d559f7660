//! Auth hash generation.
//!
//! The first factor of `session/auth` is a hash derived from
//! `{authVar, authVal, password}`. The scheme depends on the configured
//! [`AuthHashLevel`]: older servers expect the payload segment of a JWS
//! token keyed by the password (`5.6` folds the anonymous secret into the
//! signed payload), while `6.1` concatenates the inputs directly and
//! enforces a password policy instead.

use serde_json::json;

use crate::config::{AuthHashLevel, Config};
use crate::error::LimpError;
use crate::signing;

/// Compute the auth hash for one `session/auth` attempt.
///
/// `auth_var` must be one of the configured `auth_attrs`, or the literal
/// `"token"` used by re-authentication.
pub fn generate_auth_hash(
    config: &Config,
    auth_var: &str,
    auth_val: &str,
    password: &str,
) -> Result<String, LimpError> {
    if auth_var != "token" && !config.auth_attrs.iter().any(|a| a == auth_var) {
        return Err(LimpError::UnknownAuthAttr(auth_var.to_string()));
    }

    match config.auth_hash_level {
        AuthHashLevel::V6_1 => {
            check_password_policy(password)?;
            Ok(format!(
                "{auth_var}{auth_val}{password}{}",
                config.anon_token
            ))
        }
        level => {
            let mut hash = vec![
                auth_var.to_string(),
                auth_val.to_string(),
                password.to_string(),
            ];
            if level == AuthHashLevel::V5_6 {
                hash.push(config.anon_token.clone());
            }
            let token = signing::sign(&json!({ "hash": hash }), password)?;
            Ok(signing::payload_segment(&token).to_string())
        }
    }
}

/// Newest-level policy: at least 8 chars with one lowercase, one
/// uppercase and one digit.
pub fn check_password_policy(password: &str) -> Result<(), LimpError> {
    let long_enough = password.chars().count() >= 8;
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if long_enough && has_lower && has_upper && has_digit {
        Ok(())
    } else {
        Err(LimpError::PasswordPolicy)
    }
}
