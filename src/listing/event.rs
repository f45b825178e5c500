//! Live-event wire format.
//!
//! Events travel as JSON `{"event": "<namespace>:<action>", "payload": ...}`.
//! The event name is decoded at the transport boundary into a closed
//! `(ListingKind, ListingAction)` pair; anything that does not match a known
//! combination is rejected by the caller, never crashed on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ListingAction, ListingKind};

/// A fully-decoded live event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventName {
    pub kind: ListingKind,
    pub action: ListingAction,
}

impl EventName {
    /// Create an event name from its parts
    pub fn new(kind: ListingKind, action: ListingAction) -> Self {
        Self { kind, action }
    }

    /// Decode a `<namespace>:<action>` string.
    ///
    /// Returns None for a missing separator, an unknown namespace, or an
    /// unknown action.
    pub fn parse(s: &str) -> Option<Self> {
        let (namespace, action) = s.split_once(':')?;
        Some(Self {
            kind: ListingKind::parse(namespace)?,
            action: ListingAction::parse(action)?,
        })
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.action)
    }
}

/// The message envelope pushed over a live stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub event: String,
    pub payload: Value,
}

impl WireMessage {
    /// Build an envelope for a typed event
    pub fn new(name: EventName, payload: Value) -> Self {
        Self {
            event: name.to_string(),
            payload,
        }
    }

    /// Serialize to the single-line JSON form sent over the stream
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse an inbound message
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_names() {
        let name = EventName::parse("romhack:added").unwrap();
        assert_eq!(name.kind, ListingKind::Romhack);
        assert_eq!(name.action, ListingAction::Added);

        let name = EventName::parse("script:deleted").unwrap();
        assert_eq!(name.kind, ListingKind::Script);
        assert_eq!(name.action, ListingAction::Deleted);
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        assert!(EventName::parse("romhackadded").is_none());
        assert!(EventName::parse("savegame:added").is_none());
        assert!(EventName::parse("romhack:renamed").is_none());
        assert!(EventName::parse("").is_none());
    }

    #[test]
    fn test_display_matches_wire_form() {
        let name = EventName::new(ListingKind::Sprite, ListingAction::Updated);
        assert_eq!(name.to_string(), "sprite:updated");
    }

    #[test]
    fn test_wire_message_roundtrip() {
        let name = EventName::new(ListingKind::Sound, ListingAction::Added);
        let msg = WireMessage::new(name, json!({"_id": "1", "title": "Chiptune"}));

        let encoded = msg.encode().unwrap();
        let decoded = WireMessage::decode(&encoded).unwrap();
        assert_eq!(decoded.event, "sound:added");
        assert_eq!(decoded.payload["title"], "Chiptune");
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(WireMessage::decode("not json at all").is_err());
    }
}
