use std::env;

/// Configuration loaded from environment variables (`.env` supported).
#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint of the report stream; owned by the external transport.
    pub ws_uri: String,
    /// Name of the domain use case to activate at startup.
    pub use_case: String,
    pub rust_log: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

pub const DEFAULT_WS_URI: &str = "ws://localhost:8888/websocket/";
pub const DEFAULT_USE_CASE: &str = "Bitcoin";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup so validation
    /// can be exercised without mutating the process environment.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let ws_uri = get("WS_URI").unwrap_or_else(|| DEFAULT_WS_URI.to_string());

        if !ws_uri.starts_with("ws://") && !ws_uri.starts_with("wss://") {
            return Err(ConfigError::InvalidValue(
                "WS_URI must start with ws:// or wss://".to_string(),
            ));
        }

        let use_case = get("USE_CASE").unwrap_or_else(|| DEFAULT_USE_CASE.to_string());

        let rust_log = get("RUST_LOG");

        Ok(Self {
            ws_uri,
            use_case,
            rust_log,
        })
    }
}
