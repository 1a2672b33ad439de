//! Streaming client for A2A agents speaking JSON-RPC 2.0 `message/stream`
//! over Server-Sent Events.
//!
//! A client sends one user message, receives the agent's SSE response and
//! yields normalized [`ParsedEvent`]s until the task reaches a final state,
//! the server closes the stream or the stream is superseded.
//!
//! ```no_run
//! use a2a_stream::prelude::*;
//! use futures::StreamExt as _;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), StreamError> {
//! let config = ClientConfig::new("http://localhost:8080/a2a").access_token("token");
//! let mut client = AgentStreamClient::new(config)?;
//!
//! let mut events = client.send("Summarize the latest report", None);
//! while let Some(event) = events.next().await {
//!     let event = event?;
//!     println!("[{}] {}", event.event_type, event.display_content);
//! }
//! # Ok(())
//! # }
//! ```

/// Cancellation handle and signal for one in-flight stream.
pub mod abort;
/// Runtime capability detection used to choose a transport.
pub mod capability;
/// The request controller that owns the in-flight stream.
pub mod client;
/// Client configuration and environment loading.
pub mod config;
/// Public error types.
pub mod errors;
/// Incremental SSE frame parsing.
pub mod frame;
/// Stream lifecycle: connect, decode, normalize, terminate.
pub mod lifecycle;
/// Normalized event model.
pub mod normalize;
/// Process-wide logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// A2A JSON-RPC wire types.
pub mod protocol;
/// Delegated and fallback transport strategies.
pub mod transport;

pub use abort::{AbortHandle, AbortSignal};
pub use capability::{CapabilityDetector, is_unreliable_runtime};
pub use client::AgentStreamClient;
pub use config::{ClientConfig, TransportMode};
pub use errors::StreamError;
pub use frame::{FrameParser, WireFrame};
pub use lifecycle::{EventStream, FrameStream};
pub use normalize::{ArtifactKind, EventType, ParsedEvent, normalize};
pub use observability::init_observability;
pub use protocol::{RawProtocolEvent, TaskState};
pub use transport::{
    DelegatedTransport, FallbackTransport, StreamRequest, StreamTransport, TransportKind,
};
