//! Common imports for typical client usage.
pub use crate::{
    AgentStreamClient, ArtifactKind, ClientConfig, EventStream, EventType, ParsedEvent,
    StreamError, TaskState, TransportKind, TransportMode,
};
