use serde_json::Value;

use crate::sse::RawFrame;
use crate::types::TuiFramePayload;

/// Event kind labels carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ToolCall,
    ToolResult,
    SubagentSpawned,
    SubagentCompleted,
    SubagentFailed,
    SubtypeChange,
    Thinking,
    TaskStarted,
    TaskCompleted,
    Text,
    Done,
    TuiFrame,
}

impl EventKind {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "tool_call" => Self::ToolCall,
            "tool_result" => Self::ToolResult,
            "subagent_spawned" => Self::SubagentSpawned,
            "subagent_completed" => Self::SubagentCompleted,
            "subagent_failed" => Self::SubagentFailed,
            "subtype_change" => Self::SubtypeChange,
            "thinking" => Self::Thinking,
            "task_started" => Self::TaskStarted,
            "task_completed" => Self::TaskCompleted,
            "text" => Self::Text,
            "done" => Self::Done,
            "tui_frame" => Self::TuiFrame,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolCall => "tool_call",
            Self::ToolResult => "tool_result",
            Self::SubagentSpawned => "subagent_spawned",
            Self::SubagentCompleted => "subagent_completed",
            Self::SubagentFailed => "subagent_failed",
            Self::SubtypeChange => "subtype_change",
            Self::Thinking => "thinking",
            Self::TaskStarted => "task_started",
            Self::TaskCompleted => "task_completed",
            Self::Text => "text",
            Self::Done => "done",
            Self::TuiFrame => "tui_frame",
        }
    }
}

/// Parsed, tagged semantic unit produced from one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    ToolCall { tool: String },
    ToolResult { tool: String },
    SubagentSpawned { label: String, subtype: Option<String> },
    SubagentCompleted { label: String },
    SubagentFailed { label: String },
    SubtypeChange { subtype: String },
    Thinking { text: Option<String> },
    TaskStarted { task: String },
    TaskCompleted { task: Option<String> },
    Text { content: String },
    Done,
    TuiFrame(TuiFramePayload),
}

impl StreamEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ToolCall { .. } => EventKind::ToolCall,
            Self::ToolResult { .. } => EventKind::ToolResult,
            Self::SubagentSpawned { .. } => EventKind::SubagentSpawned,
            Self::SubagentCompleted { .. } => EventKind::SubagentCompleted,
            Self::SubagentFailed { .. } => EventKind::SubagentFailed,
            Self::SubtypeChange { .. } => EventKind::SubtypeChange,
            Self::Thinking { .. } => EventKind::Thinking,
            Self::TaskStarted { .. } => EventKind::TaskStarted,
            Self::TaskCompleted { .. } => EventKind::TaskCompleted,
            Self::Text { .. } => EventKind::Text,
            Self::Done => EventKind::Done,
            Self::TuiFrame(_) => EventKind::TuiFrame,
        }
    }

    /// Parse a decoded frame into exactly one event.
    ///
    /// Returns `None` for anything unrecognizable: empty or `[DONE]`
    /// payloads, invalid JSON, unknown kinds, or payloads missing a required
    /// field. The wire format permits informational frames this client does
    /// not understand, so none of these are errors.
    pub fn from_frame(frame: &RawFrame) -> Option<Self> {
        let payload = frame.data.trim();
        if payload.is_empty() || payload == "[DONE]" {
            return None;
        }

        let value: Value = serde_json::from_str(payload).ok()?;
        let kind = frame
            .event
            .as_deref()
            .and_then(EventKind::parse)
            .or_else(|| {
                value
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(EventKind::parse)
            })?;

        map_payload(kind, value)
    }
}

fn map_payload(kind: EventKind, value: Value) -> Option<StreamEvent> {
    match kind {
        EventKind::ToolCall => Some(StreamEvent::ToolCall {
            tool: required_str(&value, "tool")?,
        }),
        EventKind::ToolResult => Some(StreamEvent::ToolResult {
            tool: required_str(&value, "tool")?,
        }),
        EventKind::SubagentSpawned => Some(StreamEvent::SubagentSpawned {
            label: required_str(&value, "label")?,
            subtype: optional_str(&value, "subtype"),
        }),
        EventKind::SubagentCompleted => Some(StreamEvent::SubagentCompleted {
            label: required_str(&value, "label")?,
        }),
        EventKind::SubagentFailed => Some(StreamEvent::SubagentFailed {
            label: required_str(&value, "label")?,
        }),
        EventKind::SubtypeChange => Some(StreamEvent::SubtypeChange {
            subtype: required_str(&value, "subtype")?,
        }),
        EventKind::Thinking => Some(StreamEvent::Thinking {
            text: optional_str(&value, "text"),
        }),
        EventKind::TaskStarted => Some(StreamEvent::TaskStarted {
            task: required_str(&value, "task")?,
        }),
        EventKind::TaskCompleted => Some(StreamEvent::TaskCompleted {
            task: optional_str(&value, "task"),
        }),
        EventKind::Text => {
            // Text payloads arrive either as a bare JSON string or wrapped in
            // an object's `text` field.
            let content = value
                .as_str()
                .map(ToString::to_string)
                .or_else(|| optional_str(&value, "text"))?;
            Some(StreamEvent::Text { content })
        }
        EventKind::Done => Some(StreamEvent::Done),
        EventKind::TuiFrame => {
            let payload: TuiFramePayload = serde_json::from_value(value).ok()?;
            Some(StreamEvent::TuiFrame(payload))
        }
    }
}

fn required_str(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}

fn optional_str(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use crate::sse::RawFrame;

    use super::{EventKind, StreamEvent};

    fn frame(event: Option<&str>, data: &str) -> RawFrame {
        RawFrame {
            event: event.map(ToString::to_string),
            data: data.to_string(),
        }
    }

    #[test]
    fn text_payload_accepts_bare_json_string() {
        let event = StreamEvent::from_frame(&frame(Some("text"), "\"hi\""));
        assert_eq!(
            event,
            Some(StreamEvent::Text {
                content: "hi".to_string()
            })
        );
    }

    #[test]
    fn kind_falls_back_to_payload_type_field() {
        let event = StreamEvent::from_frame(&frame(None, r#"{"type":"tool_call","tool":"search"}"#));
        assert_eq!(
            event,
            Some(StreamEvent::ToolCall {
                tool: "search".to_string()
            })
        );
    }

    #[test]
    fn unknown_kind_produces_no_event() {
        assert!(StreamEvent::from_frame(&frame(Some("heartbeat"), "{}")).is_none());
    }

    #[test]
    fn invalid_json_produces_no_event() {
        assert!(StreamEvent::from_frame(&frame(Some("text"), "not json")).is_none());
    }

    #[test]
    fn done_marker_payload_is_skipped() {
        assert!(StreamEvent::from_frame(&frame(None, "[DONE]")).is_none());
    }

    #[test]
    fn missing_required_field_is_malformed() {
        assert!(StreamEvent::from_frame(&frame(Some("tool_call"), "{}")).is_none());
    }

    #[test]
    fn subagent_spawn_carries_optional_subtype() {
        let event = StreamEvent::from_frame(&frame(
            Some("subagent_spawned"),
            r#"{"label":"researcher","subtype":"explore"}"#,
        ));
        assert_eq!(
            event,
            Some(StreamEvent::SubagentSpawned {
                label: "researcher".to_string(),
                subtype: Some("explore".to_string()),
            })
        );
    }

    #[test]
    fn tui_frame_payload_parses_actions() {
        let event = StreamEvent::from_frame(&frame(
            Some("tui_frame"),
            r#"{"ansi":"\u001b[2Jhello","actions":[{"key":"r","label":"Restart","id":"restart"}]}"#,
        ));
        let Some(StreamEvent::TuiFrame(payload)) = event else {
            panic!("expected tui_frame event");
        };
        assert!(payload.ansi.ends_with("hello"));
        assert_eq!(payload.actions.map(|actions| actions.len()), Some(1));
    }

    #[test]
    fn kind_labels_round_trip() {
        for kind in [
            EventKind::ToolCall,
            EventKind::ToolResult,
            EventKind::SubagentSpawned,
            EventKind::SubagentCompleted,
            EventKind::SubagentFailed,
            EventKind::SubtypeChange,
            EventKind::Thinking,
            EventKind::TaskStarted,
            EventKind::TaskCompleted,
            EventKind::Text,
            EventKind::Done,
            EventKind::TuiFrame,
        ] {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
    }
}
