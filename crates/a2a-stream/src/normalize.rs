//! Folds every protocol payload shape into one [`ParsedEvent`].

use std::fmt;

use crate::protocol::{RawProtocolEvent, TaskState, concat_text};

/// Artifact name that always marks the final answer chunk.
pub const FINAL_RESULT_ARTIFACT: &str = "final_result";

/// Normalized event category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Task,
    Status,
    Message,
    Artifact,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Task => "task",
            Self::Status => "status",
            Self::Message => "message",
            Self::Artifact => "artifact",
        })
    }
}

/// Conventional artifact names the backend uses to tag artifact streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    ToolNotificationStart,
    ToolNotificationEnd,
    ExecutionPlan,
    StreamingResult,
    PartialResult,
    FinalResult,
    Other,
}

impl ArtifactKind {
    pub fn classify(name: &str) -> Self {
        match name {
            "tool_notification_start" => Self::ToolNotificationStart,
            "tool_notification_end" => Self::ToolNotificationEnd,
            "execution_plan" => Self::ExecutionPlan,
            "streaming_result" => Self::StreamingResult,
            "partial_result" => Self::PartialResult,
            FINAL_RESULT_ARTIFACT => Self::FinalResult,
            _ => Self::Other,
        }
    }

    /// Result artifacts carry user-facing answer text.
    pub fn is_result(&self) -> bool {
        matches!(
            self,
            Self::StreamingResult | Self::PartialResult | Self::FinalResult
        )
    }
}

/// Normalized event delivered to callers regardless of the raw payload shape.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEvent {
    /// Payload this event was built from.
    #[serde(skip)]
    pub raw: RawProtocolEvent,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_agent: Option<String>,
    pub display_content: String,
    /// Completion signal for the task or, on artifacts, for the answer.
    pub is_final: bool,
    /// Whether `display_content` extends the previous text of the same
    /// artifact stream instead of replacing it.
    pub should_append: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl ParsedEvent {
    /// Classification of `artifact_name`, for artifact events.
    pub fn artifact_kind(&self) -> Option<ArtifactKind> {
        self.artifact_name.as_deref().map(ArtifactKind::classify)
    }

    /// Whether this event closes the stream.
    ///
    /// A final artifact marks the last answer chunk, but the task's own final
    /// status or snapshot still follows it, so only those end consumption.
    pub fn ends_stream(&self) -> bool {
        self.is_final && self.event_type != EventType::Artifact
    }
}

/// Maps a raw payload onto a [`ParsedEvent`]. Never fails.
pub fn normalize(raw: RawProtocolEvent) -> ParsedEvent {
    match &raw {
        RawProtocolEvent::Task(task) => {
            let state = task.status.state;
            let mut summary = if task.id.is_empty() {
                format!("Task {state}")
            } else {
                format!("Task {}: {state}", task.id)
            };
            if let Some(message) = &task.status.message {
                let text = concat_text(&message.parts);
                if !text.trim().is_empty() {
                    summary.push_str(" - ");
                    summary.push_str(&text);
                }
            }
            ParsedEvent {
                event_type: EventType::Task,
                artifact_name: None,
                source_agent: None,
                display_content: summary,
                is_final: matches!(state, TaskState::Completed | TaskState::Failed),
                should_append: false,
                task_id: non_empty(&task.id),
                context_id: task.context_id.clone(),
                raw,
            }
        }
        RawProtocolEvent::StatusUpdate(update) => ParsedEvent {
            event_type: EventType::Status,
            artifact_name: None,
            source_agent: None,
            display_content: update.status.state.to_string(),
            is_final: update.is_final,
            should_append: false,
            task_id: update.task_id.clone(),
            context_id: update.context_id.clone(),
            raw,
        },
        RawProtocolEvent::Message(message) => ParsedEvent {
            event_type: EventType::Message,
            artifact_name: None,
            source_agent: None,
            display_content: concat_text(&message.parts),
            is_final: false,
            should_append: true,
            task_id: message.task_id.clone(),
            context_id: message.context_id.clone(),
            raw,
        },
        RawProtocolEvent::ArtifactUpdate(update) => {
            let artifact = &update.artifact;
            let forced_final = artifact.name.as_deref() == Some(FINAL_RESULT_ARTIFACT);
            ParsedEvent {
                event_type: EventType::Artifact,
                artifact_name: artifact.name.clone(),
                source_agent: artifact.source_agent().map(ToOwned::to_owned),
                display_content: concat_text(&artifact.parts),
                is_final: forced_final || update.is_final.unwrap_or(false),
                should_append: update.append.unwrap_or(false),
                task_id: update.task_id.clone(),
                context_id: update.context_id.clone(),
                raw,
            }
        }
        RawProtocolEvent::Unknown(value) => ParsedEvent {
            event_type: EventType::Message,
            artifact_name: None,
            source_agent: None,
            display_content: best_effort_text(value),
            is_final: false,
            should_append: false,
            task_id: string_field(value, "taskId").or_else(|| string_field(value, "id")),
            context_id: string_field(value, "contextId"),
            raw,
        },
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn string_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

// Looks for text parts wherever the known payload shapes keep them.
fn best_effort_text(value: &serde_json::Value) -> String {
    let candidates = [
        value.get("parts"),
        value.get("artifact").and_then(|a| a.get("parts")),
        value
            .get("status")
            .and_then(|s| s.get("message"))
            .and_then(|m| m.get("parts")),
    ];
    let mut out = String::new();
    for parts in candidates.into_iter().flatten() {
        let Some(parts) = parts.as_array() else {
            continue;
        };
        for part in parts {
            let kind = part.get("kind").and_then(|k| k.as_str());
            if !matches!(kind, None | Some("text")) {
                continue;
            }
            if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                out.push_str(text);
            }
        }
    }
    out
}
