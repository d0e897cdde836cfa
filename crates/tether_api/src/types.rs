use serde::{Deserialize, Serialize};

/// Server-declared, key-triggered dashboard capability.
///
/// Action sets are replaced wholesale whenever a frame carries a fresh set;
/// they are never merged field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Trigger key looked up against single-character input.
    pub key: String,
    /// Human label shown in the footer hints.
    pub label: String,
    /// Opaque identifier echoed back on submission.
    pub id: String,
    /// Ask a yes/no question before submitting.
    #[serde(default)]
    pub confirm: bool,
    /// Free-text prompts collected in order before submitting.
    #[serde(default)]
    pub prompts: Vec<String>,
}

/// Action set fetched out of band from the frame endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSet {
    #[serde(default)]
    pub navigable: bool,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
}

impl ActionSet {
    pub fn action_for_key(&self, key: &str) -> Option<&ActionDefinition> {
        self.actions.iter().find(|action| action.key == key)
    }
}

/// Client-side selection/scroll hint. The server is authoritative and may
/// clamp either value, so neither is assumed to match actual list length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCursor {
    pub selected: u32,
    pub scroll: u32,
}

/// Outbound action request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionSubmission {
    pub action: String,
    pub selected: u32,
    pub scroll: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
}

impl ActionSubmission {
    pub fn new(action: impl Into<String>, cursor: SessionCursor, inputs: Vec<String>) -> Self {
        Self {
            action: action.into(),
            selected: cursor.selected,
            scroll: cursor.scroll,
            inputs,
        }
    }
}

/// Structured action result. `ok: false` is a non-fatal outcome shown inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionOutcome {
    #[serde(default)]
    pub ok: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn failure_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "action failed".to_string())
    }
}

/// Dashboard push payload: a full ANSI screen plus an optional fresh action
/// set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuiFramePayload {
    pub ansi: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ActionDefinition>>,
}

/// Outbound chat request opening an assistant stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub instance_id: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::{ActionDefinition, ActionSet, ActionSubmission, SessionCursor};

    fn action(key: &str, id: &str) -> ActionDefinition {
        ActionDefinition {
            key: key.to_string(),
            label: id.to_string(),
            id: id.to_string(),
            confirm: false,
            prompts: Vec::new(),
        }
    }

    #[test]
    fn action_lookup_matches_trigger_key() {
        let set = ActionSet {
            navigable: true,
            actions: vec![action("r", "restart"), action("d", "delete")],
        };

        assert_eq!(set.action_for_key("d").map(|a| a.id.as_str()), Some("delete"));
        assert!(set.action_for_key("x").is_none());
    }

    #[test]
    fn submission_omits_empty_inputs() {
        let submission = ActionSubmission::new("restart", SessionCursor::default(), Vec::new());
        let json = serde_json::to_string(&submission).expect("submission serializes");
        assert!(!json.contains("inputs"));
    }

    #[test]
    fn action_definitions_default_optional_fields() {
        let parsed: ActionDefinition =
            serde_json::from_str(r#"{"key":"r","label":"Restart","id":"restart"}"#)
                .expect("minimal action parses");
        assert!(!parsed.confirm);
        assert!(parsed.prompts.is_empty());
    }
}
