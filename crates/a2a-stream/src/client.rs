use std::fmt;
use std::sync::Arc;

use futures::FutureExt as _;
use tracing::{debug, info};

use crate::abort::AbortHandle;
use crate::capability::detect_process;
use crate::config::{ClientConfig, TransportMode};
use crate::errors::StreamError;
use crate::lifecycle::{EventStream, drive};
use crate::protocol::JsonRpcRequest;
use crate::transport::{
    DelegatedTransport, FallbackTransport, StreamRequest, StreamTransport, TransportKind,
    build_http_client,
};

/// Client that owns at most one in-flight `message/stream` request.
///
/// Starting a new stream aborts the previous one; the superseded stream simply
/// ends without yielding an error.
pub struct AgentStreamClient {
    endpoint: String,
    access_token: Option<String>,
    id_token: Option<String>,
    transport: Arc<dyn StreamTransport>,
    current: Option<AbortHandle>,
}

impl fmt::Debug for AgentStreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentStreamClient")
            .field("endpoint", &self.endpoint)
            .field("transport", &self.transport.kind())
            .field("has_access_token", &self.access_token.is_some())
            .field("in_flight", &self.current.is_some())
            .finish_non_exhaustive()
    }
}

impl AgentStreamClient {
    /// Creates a client and picks its transport strategy.
    ///
    /// With [`TransportMode::Auto`] the choice comes from the process-wide
    /// capability check on `config.runtime_identity`.
    pub fn new(config: ClientConfig) -> Result<Self, StreamError> {
        config.validate()?;
        let http = build_http_client(config.timeout)?;
        let transport: Arc<dyn StreamTransport> = match resolve_transport(&config) {
            TransportKind::Fallback => Arc::new(FallbackTransport::new(http)),
            TransportKind::Delegated => Arc::new(DelegatedTransport::new(http)),
        };
        Self::with_transport(config, transport)
    }

    /// Creates a client from `A2A_STREAM_*` environment variables.
    pub fn from_env() -> Result<Self, StreamError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Creates a client around an explicit transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn StreamTransport>,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        info!(endpoint = %config.endpoint, transport = %transport.kind(), "stream client ready");
        Ok(Self {
            endpoint: config.endpoint,
            access_token: config.access_token,
            id_token: config.id_token,
            transport,
            current: None,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Replaces the bearer token used by subsequent requests.
    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token.filter(|t| !t.trim().is_empty());
    }

    /// Replaces the identity token used by subsequent requests.
    pub fn set_id_token(&mut self, token: Option<String>) {
        self.id_token = token.filter(|t| !t.trim().is_empty());
    }

    /// Aborts the in-flight stream, if any. Its consumer sees a clean end.
    pub fn abort(&mut self) {
        if let Some(handle) = self.current.take() {
            debug!("aborting in-flight stream");
            handle.abort();
        }
    }

    /// Sends `text` and returns the lazy stream of normalized events.
    ///
    /// The request is only issued once the returned stream is first polled.
    /// Any stream returned by an earlier call is aborted.
    pub fn send(&mut self, text: impl Into<String>, context_id: Option<String>) -> EventStream {
        let (handle, signal) = AbortHandle::pair();
        if let Some(previous) = self.current.replace(handle) {
            debug!("superseding in-flight stream");
            previous.abort();
        }

        let request = StreamRequest {
            endpoint: self.endpoint.clone(),
            body: JsonRpcRequest::message_stream(text, context_id),
            access_token: self.access_token.clone(),
            id_token: self.id_token.clone(),
        };
        debug!(request_id = %request.body.id, transport = %self.transport.kind(), "sending message");

        let transport = self.transport.clone();
        let open = async move { transport.open(request).await }.boxed();
        drive(open, signal)
    }
}

fn resolve_transport(config: &ClientConfig) -> TransportKind {
    match config.transport {
        TransportMode::Delegated => TransportKind::Delegated,
        TransportMode::Fallback => TransportKind::Fallback,
        TransportMode::Auto => {
            if detect_process(&config.runtime_identity) {
                TransportKind::Fallback
            } else {
                TransportKind::Delegated
            }
        }
    }
}
