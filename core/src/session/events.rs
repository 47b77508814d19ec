//! Socket events that announce session changes between connected clients.
//!
//! Incoming events are notifications only: their payload is ignored and
//! their arrival just marks the session stale. Outgoing events carry enough
//! for other clients to log what changed.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaneEventKind {
    #[serde(rename = "pane:launched")]
    Launched,
    #[serde(rename = "pane:removed")]
    Removed,
    #[serde(rename = "layouts:updated")]
    LayoutsUpdated,
}


impl PaneEventKind {
    pub const ALL: [PaneEventKind; 3] = [
        PaneEventKind::Launched,
        PaneEventKind::Removed,
        PaneEventKind::LayoutsUpdated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaneEventKind::Launched => "pane:launched",
            PaneEventKind::Removed => "pane:removed",
            PaneEventKind::LayoutsUpdated => "layouts:updated",
        }
    }

    /// Recognise an event name; anything else is not ours.
    pub fn parse(name: &str) -> Option<PaneEventKind> {
        let name = name.trim();
        PaneEventKind::ALL.into_iter().find(|k| k.as_str() == name)
    }
}


impl fmt::Display for PaneEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// An outgoing session-change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneEvent {
    pub kind: PaneEventKind,
    pub module_type: Option<String>,
    pub instance_ids: Vec<String>,
    pub timestamp: u64,
}


/// Socket payload of a `PaneEvent`; the kind travels as the event name.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    module_type: Option<&'a str>,
    instance_ids: &'a [String],
    timestamp: u64,
}


impl PaneEvent {
    pub fn new(kind: PaneEventKind, module_type: Option<String>, instance_ids: Vec<String>) -> Self {
        PaneEvent {
            kind,
            module_type,
            instance_ids,
            timestamp: now_ms(),
        }
    }

    /// Event name plus JSON payload, ready for a socket emit.
    pub fn to_wire(&self) -> (String, serde_json::Value) {
        let payload = WirePayload {
            module_type: self.module_type.as_deref(),
            instance_ids: &self.instance_ids,
            timestamp: self.timestamp,
        };
        let payload = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);
        (self.kind.as_str().to_string(), payload)
    }
}


pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognises_all_names() {
        for kind in PaneEventKind::ALL {
            assert_eq!(PaneEventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(PaneEventKind::parse("pane:moved"), None);
        assert_eq!(PaneEventKind::parse(""), None);
    }

    #[test]
    fn wire_payload_is_camel_case() {
        let event = PaneEvent::new(
            PaneEventKind::Launched,
            Some("SERVICE".into()),
            vec!["9f3k2l".into()],
        );
        let (name, payload) = event.to_wire();
        assert_eq!(name, "pane:launched");
        assert_eq!(payload["moduleType"], "SERVICE");
        assert_eq!(payload["instanceIds"][0], "9f3k2l");
        assert!(payload["timestamp"].as_u64().unwrap() > 0);
        assert!(payload.get("kind").is_none());
    }

    #[test]
    fn wire_payload_omits_missing_module_type() {
        let event = PaneEvent::new(PaneEventKind::LayoutsUpdated, None, Vec::new());
        let (name, payload) = event.to_wire();
        assert_eq!(name, "layouts:updated");
        assert!(payload.get("moduleType").is_none());
        assert_eq!(payload["instanceIds"], serde_json::json!([]));
    }
}
