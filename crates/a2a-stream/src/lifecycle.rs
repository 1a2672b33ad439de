use std::pin::Pin;

use futures::StreamExt as _;
use futures::future::BoxFuture;
use futures::stream;
use tracing::debug;

use crate::abort::AbortSignal;
use crate::errors::StreamError;
use crate::frame::WireFrame;
use crate::normalize::{ParsedEvent, normalize};
use crate::protocol::decode_frame;

/// Frames produced by a transport, in wire order.
pub type FrameStream =
    Pin<Box<dyn futures::Stream<Item = Result<WireFrame, StreamError>> + Send + 'static>>;

/// Normalized events returned to callers.
pub type EventStream =
    Pin<Box<dyn futures::Stream<Item = Result<ParsedEvent, StreamError>> + Send + 'static>>;

/// Pending connection attempt that resolves to the frame stream.
pub type OpenFuture = BoxFuture<'static, Result<FrameStream, StreamError>>;

enum Phase {
    Connecting(OpenFuture),
    Streaming(FrameStream),
    Done,
}

struct State {
    phase: Phase,
    abort: AbortSignal,
}

/// Turns a connection attempt into a lazy stream of normalized events.
///
/// Nothing happens until the first poll. The stream ends right after the first
/// event for which [`ParsedEvent::ends_stream`] holds, and ends without error
/// as soon as `abort` fires, whether the request is still connecting or
/// already streaming. Malformed and result-less frames are skipped; a JSON-RPC
/// error ends the stream with [`StreamError::Protocol`].
pub fn drive(open: OpenFuture, abort: AbortSignal) -> EventStream {
    let state = State {
        phase: Phase::Connecting(open),
        abort,
    };
    Box::pin(stream::try_unfold(state, |mut state| async move {
        loop {
            match std::mem::replace(&mut state.phase, Phase::Done) {
                Phase::Done => return Ok(None),
                Phase::Connecting(open) => {
                    tokio::select! {
                        biased;
                        () = state.abort.aborted() => {
                            debug!("stream aborted before the response arrived");
                            return Ok(None);
                        }
                        opened = open => {
                            state.phase = Phase::Streaming(opened?);
                        }
                    }
                }
                Phase::Streaming(mut frames) => {
                    let next = tokio::select! {
                        biased;
                        () = state.abort.aborted() => {
                            debug!("stream aborted by caller");
                            return Ok(None);
                        }
                        next = frames.next() => next,
                    };
                    let frame = match next {
                        Some(frame) => frame?,
                        None => {
                            debug!("source closed without a final event");
                            return Ok(None);
                        }
                    };
                    let Some(raw) = decode_frame(&frame)? else {
                        state.phase = Phase::Streaming(frames);
                        continue;
                    };
                    let event = normalize(raw);
                    debug!(
                        event_type = %event.event_type,
                        artifact = event.artifact_name.as_deref().unwrap_or(""),
                        is_final = event.is_final,
                        "normalized event"
                    );
                    if !event.ends_stream() {
                        state.phase = Phase::Streaming(frames);
                    }
                    return Ok(Some((event, state)));
                }
            }
        }
    }))
}
