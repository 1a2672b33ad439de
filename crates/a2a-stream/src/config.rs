use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::StreamError;

/// Which transport strategy the client uses for `message/stream`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Decide once per process from the runtime identity string.
    #[default]
    Auto,
    /// Always hand SSE framing to the external event-source library.
    Delegated,
    /// Always parse the SSE byte stream manually.
    Fallback,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Delegated => "delegated",
            Self::Fallback => "fallback",
        })
    }
}

impl FromStr for TransportMode {
    type Err = StreamError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "delegated" | "native" => Ok(Self::Delegated),
            "fallback" | "manual" => Ok(Self::Fallback),
            other => Err(StreamError::Config(format!(
                "unknown transport mode `{other}` (expected auto, delegated or fallback)"
            ))),
        }
    }
}

/// Configuration for an [`AgentStreamClient`](crate::AgentStreamClient).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// JSON-RPC endpoint that accepts `message/stream`.
    pub endpoint: String,
    /// Bearer token sent as `Authorization`.
    pub access_token: Option<String>,
    /// Identity token forwarded as `X-Identity-Token`.
    pub id_token: Option<String>,
    /// Connect timeout and idle limit between body chunks. A stream that keeps
    /// delivering data may run longer than this.
    pub timeout: Duration,
    /// Transport strategy.
    pub transport: TransportMode,
    /// Identification string of the embedding runtime (for example a webview
    /// user agent). Only consulted when `transport` is [`TransportMode::Auto`].
    pub runtime_identity: String,
}

impl ClientConfig {
    /// Creates a config for `endpoint` with defaults for everything else.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_token: None,
            id_token: None,
            timeout: Duration::from_secs(300),
            transport: TransportMode::Auto,
            runtime_identity: default_runtime_identity(),
        }
    }

    /// Builds a config from `A2A_STREAM_*` environment variables.
    ///
    /// - `A2A_STREAM_ENDPOINT` (required)
    /// - `A2A_STREAM_ACCESS_TOKEN`, `A2A_STREAM_ID_TOKEN`
    /// - `A2A_STREAM_TIMEOUT_SECS`
    /// - `A2A_STREAM_TRANSPORT` (`auto`, `delegated`, `fallback`)
    /// - `A2A_STREAM_RUNTIME_IDENTITY`
    pub fn from_env() -> Result<Self, StreamError> {
        let endpoint = non_empty_env("A2A_STREAM_ENDPOINT").ok_or_else(|| {
            StreamError::Config("missing A2A_STREAM_ENDPOINT for stream client".into())
        })?;
        let mut config = Self::new(endpoint);
        config.access_token = non_empty_env("A2A_STREAM_ACCESS_TOKEN");
        config.id_token = non_empty_env("A2A_STREAM_ID_TOKEN");
        if let Some(raw) = non_empty_env("A2A_STREAM_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                StreamError::Config(format!("invalid A2A_STREAM_TIMEOUT_SECS `{raw}`: {e}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = non_empty_env("A2A_STREAM_TRANSPORT") {
            config.transport = raw.parse()?;
        }
        if let Some(identity) = non_empty_env("A2A_STREAM_RUNTIME_IDENTITY") {
            config.runtime_identity = identity;
        }
        Ok(config)
    }

    /// Sets the bearer access token.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the identity token.
    pub fn id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }

    /// Overrides the default connect and idle read timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Forces a transport strategy.
    pub fn transport(mut self, mode: TransportMode) -> Self {
        self.transport = mode;
        self
    }

    /// Overrides the runtime identity string used for transport detection.
    pub fn runtime_identity(mut self, identity: impl Into<String>) -> Self {
        self.runtime_identity = identity.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), StreamError> {
        if self.endpoint.trim().is_empty() {
            return Err(StreamError::Config("endpoint must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(StreamError::Config("timeout must be greater than 0".into()));
        }
        Ok(())
    }
}

fn default_runtime_identity() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
