//! JSON-RPC envelopes and the agent protocol payloads carried inside them.
//!
//! Inbound types are deliberately lenient: every field the normalizer does not
//! strictly need is optional, and a payload that still fails typed decoding is
//! kept as [`RawProtocolEvent::Unknown`] instead of being rejected.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::StreamError;
use crate::frame::WireFrame;

/// JSON-RPC method used for streamed message sends.
pub const MESSAGE_STREAM_METHOD: &str = "message/stream";

const JSONRPC_VERSION: &str = "2.0";

/// Lifecycle state of a remote task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    AuthRequired,
    Completed,
    Failed,
    Canceled,
    Rejected,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskState {
    /// Label used as display content for status updates.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::InputRequired => "input-required",
            Self::AuthRequired => "auth-required",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sender of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    #[serde(other)]
    Unknown,
}

/// One content part of a message or artifact, discriminated by `kind`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    File {
        #[serde(default)]
        file: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    Data {
        #[serde(default)]
        data: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    /// Part kinds this client does not render.
    #[serde(other)]
    Other,
}

impl Part {
    /// Creates a text part without metadata.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            metadata: None,
        }
    }
}

/// Concatenates all text parts in order and ignores the rest.
pub fn concat_text(parts: &[Part]) -> String {
    let mut out = String::new();
    for part in parts {
        if let Part::Text { text, .. } = part {
            out.push_str(text);
        }
    }
    out
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    #[serde(default)]
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Artifact {
    /// `metadata.sourceAgent`, when the producing agent tagged the artifact.
    pub fn source_agent(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("sourceAgent"))
            .and_then(|v| v.as_str())
    }
}

/// Task snapshot (`kind: "task"`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Status change notification (`kind: "status-update"`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Artifact chunk notification (`kind: "artifact-update"`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default)]
    pub artifact: Artifact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_chunk: Option<bool>,
    #[serde(default, rename = "final", skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Payload carried in an envelope's `result`, one case per `kind`.
#[derive(Clone, Debug, PartialEq)]
pub enum RawProtocolEvent {
    Task(Task),
    StatusUpdate(TaskStatusUpdateEvent),
    Message(Message),
    ArtifactUpdate(TaskArtifactUpdateEvent),
    /// Unrecognized `kind`, or a known kind whose shape did not decode.
    Unknown(serde_json::Value),
}

impl RawProtocolEvent {
    /// Classifies a `result` payload by its `kind` field.
    ///
    /// Never fails: shapes that do not decode into their typed variant are
    /// returned as [`RawProtocolEvent::Unknown`].
    pub fn from_value(value: serde_json::Value) -> Self {
        let kind = value.get("kind").and_then(|v| v.as_str()).unwrap_or("");
        let decoded = match kind {
            "task" => serde_json::from_value(value.clone()).map(Self::Task),
            "status-update" => serde_json::from_value(value.clone()).map(Self::StatusUpdate),
            "message" => serde_json::from_value(value.clone()).map(Self::Message),
            "artifact-update" => serde_json::from_value(value.clone()).map(Self::ArtifactUpdate),
            _ => return Self::Unknown(value),
        };
        match decoded {
            Ok(event) => event,
            Err(e) => {
                debug!(kind, error = %e, "result payload did not match its kind; keeping raw value");
                Self::Unknown(value)
            }
        }
    }

    /// Wire discriminator for this payload.
    pub fn kind(&self) -> &str {
        match self {
            Self::Task(_) => "task",
            Self::StatusUpdate(_) => "status-update",
            Self::Message(_) => "message",
            Self::ArtifactUpdate(_) => "artifact-update",
            Self::Unknown(value) => value.get("kind").and_then(|v| v.as_str()).unwrap_or(""),
        }
    }
}

/// Error object of a JSON-RPC response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(default = "unknown_error_code")]
    pub code: i64,
    #[serde(default = "unknown_error_message")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

fn unknown_error_code() -> i64 {
    -1
}

fn unknown_error_message() -> String {
    "unknown error".to_string()
}

/// Decoded JSON-RPC response carried in one SSE frame.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct JsonRpcEnvelope {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// Decodes a frame's data into a protocol event.
///
/// Returns `Ok(None)` for frames that are skipped (blank data, invalid JSON,
/// no `result`) and an error only when the envelope carries a JSON-RPC
/// `error`.
pub fn decode_frame(frame: &WireFrame) -> Result<Option<RawProtocolEvent>, StreamError> {
    let data = frame.data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    let envelope: JsonRpcEnvelope = match serde_json::from_str(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(event = %frame.event, error = %e, "skipping malformed SSE frame");
            return Ok(None);
        }
    };
    if let Some(error) = envelope.error {
        return Err(StreamError::protocol(error.code, error.message));
    }
    match envelope.result {
        Some(result) => Ok(Some(RawProtocolEvent::from_value(result))),
        None => {
            debug!(event = %frame.event, "skipping envelope without result");
            Ok(None)
        }
    }
}

/// Outbound `message/stream` request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: String,
    pub method: &'static str,
    pub params: MessageSendParams,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessageSendParams {
    pub message: OutboundMessage,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl JsonRpcRequest {
    /// Builds a `message/stream` request for one user text with a fresh id.
    pub fn message_stream(text: impl Into<String>, context_id: Option<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            method: MESSAGE_STREAM_METHOD,
            params: MessageSendParams {
                message: OutboundMessage {
                    role: Role::User,
                    parts: vec![Part::text(text)],
                    context_id,
                },
            },
        }
    }
}
