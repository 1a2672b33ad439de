use std::pin::Pin;

use tracing::debug;

use super::{StreamRequest, StreamTransport, TransportKind, has_body, post_stream};
use crate::errors::StreamError;
use crate::frame::frame_stream;
use crate::lifecycle::FrameStream;

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Issues the request directly and parses the SSE body with
/// [`FrameParser`](crate::frame::FrameParser).
#[derive(Clone, Debug)]
pub struct FallbackTransport {
    client: reqwest::Client,
}

impl FallbackTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl StreamTransport for FallbackTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Fallback
    }

    async fn open(&self, request: StreamRequest) -> Result<FrameStream, StreamError> {
        let response = post_stream(&self.client, &request).await?;
        let body: Option<ByteStream> = if has_body(&response) {
            Some(Box::pin(response.bytes_stream()))
        } else {
            None
        };
        debug!(request_id = %request.body.id, has_body = body.is_some(), "parsing SSE body manually");
        Ok(Box::pin(frame_stream(body)))
    }
}
