use shared::{parse_var, ConfigError};
use std::env;
use std::time::Duration;

/// クライアント設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    /// 検索語の入力が止まってから再取得するまでの待ち時間
    pub search_debounce: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            request_timeout: Duration::from_secs(10),
            search_debounce: Duration::from_millis(300),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            base_url: parse_var(&lookup, "TODO_API_BASE_URL")?.unwrap_or(defaults.base_url),
            request_timeout: parse_var(&lookup, "TODO_API_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            search_debounce: parse_var(&lookup, "TODO_SEARCH_DEBOUNCE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.search_debounce),
        })
    }
}
