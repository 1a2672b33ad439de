use bytes::Bytes;
use eventsource_stream::Eventsource as _;
use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use super::{StreamRequest, StreamTransport, TransportKind, has_body, post_stream};
use crate::errors::StreamError;
use crate::frame::WireFrame;
use crate::lifecycle::FrameStream;

/// Hands SSE framing to the `eventsource-stream` library.
#[derive(Clone, Debug)]
pub struct DelegatedTransport {
    client: reqwest::Client,
}

impl DelegatedTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl StreamTransport for DelegatedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Delegated
    }

    async fn open(&self, request: StreamRequest) -> Result<FrameStream, StreamError> {
        let response = post_stream(&self.client, &request).await?;
        if !has_body(&response) {
            return Err(StreamError::MissingBody);
        }
        debug!(request_id = %request.body.id, "delegating SSE framing to event source");

        // A closing newline completes a record whose last line was terminated but
        // never followed by a blank line. An unterminated line stays incomplete.
        let body = response
            .bytes_stream()
            .chain(stream::once(async { Ok(Bytes::from_static(b"\n")) }));
        let frames = body.eventsource().map(|item| match item {
            Ok(event) => {
                let name = if event.event.is_empty() {
                    "message".to_string()
                } else {
                    event.event
                };
                Ok(WireFrame::new(name, event.data))
            }
            Err(e) => Err(StreamError::transport(format!("event source failed: {e}"))),
        });
        Ok(Box::pin(frames))
    }
}
