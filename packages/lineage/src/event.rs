//! # Lineage Events
//!
//! One immutable record per saved state of a document. Every event carries
//! the complete document text, so any event can be rendered or restored
//! without replaying its ancestors.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a document whose history is tracked
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque event identifier, generated once and never reused
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Provenance of an event. Does not affect graph structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    UserEdit,
    AiSuggestion,
    Save,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventType::UserEdit => "user_edit",
            EventType::AiSuggestion => "ai_suggestion",
            EventType::Save => "save",
        };
        f.write_str(label)
    }
}

/// A saved state in a document's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageEvent {
    pub id: EventId,

    /// Event this one was created from; `None` only for the root
    pub parent_id: Option<EventId>,

    pub timestamp: DateTime<Utc>,

    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Full document text at this event
    pub content: String,

    /// Human annotation, the only field amendable after creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// 1-based append-order counter. Follows append order, not depth, so
    /// sibling branches interleave their version numbers.
    pub version: u64,
}

impl LineageEvent {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Short label for graph nodes and log lines
    pub fn label(&self) -> String {
        match &self.summary {
            Some(summary) if !summary.trim().is_empty() => {
                format!("v{} {}", self.version, summary.trim())
            }
            _ => format!("v{}", self.version),
        }
    }
}

/// Input for appending an event; the store assigns id, version and timestamp
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub content: String,
    pub event_type: EventType,
    pub parent_id: Option<EventId>,
    pub summary: Option<String>,
}

impl NewEvent {
    /// An explicit save parented to `parent_id`
    pub fn save(content: impl Into<String>, parent_id: Option<EventId>) -> Self {
        Self {
            content: content.into(),
            event_type: EventType::Save,
            parent_id,
            summary: None,
        }
    }

    pub fn with_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = LineageEvent {
            id: EventId::from("e2"),
            parent_id: Some(EventId::from("e1")),
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            event_type: EventType::AiSuggestion,
            content: "# Title".to_string(),
            summary: None,
            version: 2,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["parentId"], "e1");
        assert_eq!(json["type"], "ai_suggestion");
        assert_eq!(json["version"], 2);
        assert!(json.get("summary").is_none());

        let back: LineageEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_root_parent_serializes_as_null() {
        let json = r#"{"id":"r","parentId":null,"timestamp":"2024-05-01T10:00:00Z","type":"save","content":"","version":1}"#;
        let event: LineageEvent = serde_json::from_str(json).unwrap();
        assert!(event.is_root());
        assert_eq!(event.label(), "v1");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(EventId::generate(), EventId::generate());
    }
}
