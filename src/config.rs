//! Client configuration.

use std::time::Duration;

use crate::error::LimpError;

/// Default chunk size for file uploads: 500 KiB of raw bytes per call.
pub const DEFAULT_CHUNK_SIZE: usize = 500 * 1024;

/// Default heartbeat period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Auth hash scheme generations.
///
/// Servers older than `6.1` expect a signed-token hash; `5.6` additionally
/// folds the anonymous secret into the signed payload. `6.1` switched to a
/// plain concatenation guarded by a password policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthHashLevel {
    V5_0,
    V5_6,
    #[default]
    V6_1,
}

/// Configuration for a [`LimpClient`](crate::client::LimpClient).
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket endpoint, `ws://` or `wss://`.
    pub endpoint_url: String,
    /// Anonymous signing secret, used whenever no session exists.
    pub anon_token: String,
    /// Attributes accepted as the first factor of `session/auth`.
    pub auth_attrs: Vec<String>,
    /// Raw bytes per `file/upload` call.
    pub file_chunk_size: usize,
    pub auth_hash_level: AuthHashLevel,
    /// Reconnection budget, consumed on clean stream termination.
    pub max_retries: u32,
    /// Whether clean termination re-enters connect at all.
    pub force_retry: bool,
    pub heartbeat_interval: Duration,
}

impl Config {
    pub fn new(
        endpoint_url: impl Into<String>,
        anon_token: impl Into<String>,
        auth_attrs: Vec<String>,
    ) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            anon_token: anon_token.into(),
            auth_attrs,
            file_chunk_size: DEFAULT_CHUNK_SIZE,
            auth_hash_level: AuthHashLevel::default(),
            max_retries: 0,
            force_retry: false,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.file_chunk_size = bytes;
        self
    }

    pub fn with_auth_hash_level(mut self, level: AuthHashLevel) -> Self {
        self.auth_hash_level = level;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, force_retry: bool) -> Self {
        self.max_retries = max_retries;
        self.force_retry = force_retry;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Fail fast on configuration that could never work.
    pub fn validate(&self) -> Result<(), LimpError> {
        if self.auth_attrs.is_empty() {
            return Err(LimpError::Config("auth_attrs not set".into()));
        }
        if self.anon_token.is_empty() {
            return Err(LimpError::Config("anon_token not set".into()));
        }
        if self.file_chunk_size == 0 {
            return Err(LimpError::Config("file_chunk_size must be non-zero".into()));
        }
        let url = url::Url::parse(&self.endpoint_url)
            .map_err(|e| LimpError::Config(format!("invalid endpoint_url: {e}")))?;
        match url.scheme() {
            "ws" | "wss" => Ok(()),
            other => Err(LimpError::Config(format!(
                "endpoint_url must be ws:// or wss://, got {other}://"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config::new("wss://api.example.com/ws", "__ANON", vec!["email".into()])
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
        assert_eq!(valid().file_chunk_size, 500 * 1024);
        assert_eq!(valid().auth_hash_level, AuthHashLevel::V6_1);
    }

    #[test]
    fn test_missing_auth_attrs_rejected() {
        let config = Config::new("ws://localhost:8081/ws", "__ANON", vec![]);
        assert!(matches!(config.validate(), Err(LimpError::Config(_))));
    }

    #[test]
    fn test_bad_scheme_rejected() {
        let mut config = valid();
        config.endpoint_url = "http://api.example.com".into();
        assert!(matches!(config.validate(), Err(LimpError::Config(_))));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = valid().with_chunk_size(0);
        assert!(matches!(config.validate(), Err(LimpError::Config(_))));
    }
}
