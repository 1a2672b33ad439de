use std::collections::VecDeque;
use std::fmt;

use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use crate::errors::StreamError;

const DEFAULT_EVENT: &str = "message";

/// One SSE record before JSON decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    /// `event:` field, `"message"` when the record had none.
    pub event: String,
    pub data: String,
}

impl WireFrame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// Incremental SSE line parser.
///
/// Raw bytes are buffered until a full line is available, so a multi-byte
/// character split across chunks is decoded only once it is complete. A parser
/// belongs to exactly one stream.
#[derive(Debug, Default)]
pub struct FrameParser {
    buf: Vec<u8>,
    event: Option<String>,
    data: String,
}

impl FrameParser {
    /// Feeds one chunk and returns every frame it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<WireFrame> {
        let scan_from = self.buf.len();
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        let Some(first) = self.buf[scan_from..].iter().position(|b| *b == b'\n') else {
            return frames;
        };

        let mut start = 0;
        let mut idx = scan_from + first;
        loop {
            let mut line = &self.buf[start..idx];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            let text = String::from_utf8_lossy(line).into_owned();
            if let Some(frame) = self.handle_line(&text) {
                frames.push(frame);
            }
            start = idx + 1;
            match self.buf[start..].iter().position(|b| *b == b'\n') {
                Some(offset) => idx = start + offset,
                None => break,
            }
        }
        self.buf.drain(..start);
        frames
    }

    /// Flushes the parser at end of stream.
    ///
    /// Data whose line was newline-terminated is emitted even without the
    /// closing blank line. A trailing line with no newline at all is dropped.
    pub fn finish(&mut self) -> Option<WireFrame> {
        if !self.buf.is_empty() {
            debug!(bytes = self.buf.len(), "dropping unterminated trailing SSE line");
            self.buf.clear();
        }
        self.take_frame()
    }

    fn handle_line(&mut self, line: &str) -> Option<WireFrame> {
        if line.is_empty() {
            return self.take_frame();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            self.event = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest.trim());
        }
        None
    }

    fn take_frame(&mut self) -> Option<WireFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let event = event
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT.to_string());
        Some(WireFrame {
            event,
            data: std::mem::take(&mut self.data),
        })
    }
}

/// Lazily parses a response body into frames.
///
/// `None` means the response had no body and fails on the first poll with
/// [`StreamError::MissingBody`]. Body read errors end the stream with
/// [`StreamError::Transport`].
pub fn frame_stream<S, B, E>(
    body: Option<S>,
) -> impl futures::Stream<Item = Result<WireFrame, StreamError>> + Send
where
    S: futures::Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send,
    E: fmt::Display + Send,
{
    struct State<S> {
        body: Option<S>,
        parser: FrameParser,
        pending: VecDeque<WireFrame>,
        done: bool,
    }

    stream::try_unfold(
        State {
            body,
            parser: FrameParser::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(frame) = state.pending.pop_front() {
                    return Ok(Some((frame, state)));
                }
                if state.done {
                    return Ok(None);
                }
                let Some(body) = state.body.as_mut() else {
                    return Err(StreamError::MissingBody);
                };

                match body.next().await {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.parser.push_chunk(chunk.as_ref()));
                    }
                    Some(Err(e)) => {
                        return Err(StreamError::transport(format!("SSE body read failed: {e}")));
                    }
                    None => {
                        state.pending.extend(state.parser.finish());
                        state.done = true;
                    }
                }
            }
        },
    )
}
