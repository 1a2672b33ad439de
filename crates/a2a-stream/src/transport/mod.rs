//! Transport strategies for `message/stream`.
//!
//! Both strategies issue the same HTTP request and classify the response the
//! same way; they differ only in who turns the SSE body into frames.
mod delegated;
mod fallback;

use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, warn};

pub use delegated::DelegatedTransport;
pub use fallback::FallbackTransport;

use crate::errors::{StreamError, error_for_status};
use crate::lifecycle::FrameStream;
use crate::protocol::JsonRpcRequest;

/// Header carrying the identity token next to the bearer access token.
pub const ID_TOKEN_HEADER: &str = "X-Identity-Token";

/// Which strategy a transport implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Delegated,
    Fallback,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Delegated => "delegated",
            Self::Fallback => "fallback",
        })
    }
}

/// Everything a transport needs to open one stream.
#[derive(Clone, Debug)]
pub struct StreamRequest {
    pub endpoint: String,
    pub body: JsonRpcRequest,
    pub access_token: Option<String>,
    pub id_token: Option<String>,
}

/// Opens a `message/stream` request and yields its SSE frames.
///
/// Implementations must not read ahead of the consumer and must leave envelope
/// decoding to the caller.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn open(&self, request: StreamRequest) -> Result<FrameStream, StreamError>;
}

/// `timeout` bounds connecting and each wait for the next body chunk, never
/// the stream as a whole.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, StreamError> {
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build()
        .map_err(|e| StreamError::Config(format!("failed to build HTTP client: {e}")))
}

/// Sends the POST and maps non-success statuses onto the error taxonomy.
pub(crate) async fn post_stream(
    client: &reqwest::Client,
    request: &StreamRequest,
) -> Result<reqwest::Response, StreamError> {
    let mut http_req = client
        .post(&request.endpoint)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "text/event-stream")
        .json(&request.body);
    if let Some(token) = request.access_token.as_deref() {
        http_req = http_req.bearer_auth(token);
    }
    if let Some(token) = request.id_token.as_deref() {
        http_req = http_req.header(ID_TOKEN_HEADER, token);
    }
    debug!(endpoint = %request.endpoint, request_id = %request.body.id, "opening message stream");

    let response = http_req.send().await.map_err(|e| {
        StreamError::transport(format!("request to {} failed: {e}", request.endpoint))
    })?;
    let status = response.status();
    if !status.is_success() {
        warn!(endpoint = %request.endpoint, status = status.as_u16(), "message stream rejected");
        return Err(error_for_status(status, request.body.method));
    }
    Ok(response)
}

/// Whether a successful response has a body worth streaming.
pub(crate) fn has_body(response: &reqwest::Response) -> bool {
    response.status() != reqwest::StatusCode::NO_CONTENT && response.content_length() != Some(0)
}
