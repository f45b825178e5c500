//! # Listing Domain Model
//!
//! Types shared by the catalogue server and the sync client: the closed set
//! of listing namespaces, the live-event actions, listing records, and the
//! tombstone that stands in for a deleted listing.

pub mod event;

pub use event::{EventName, WireMessage};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of listing types served by the catalogue.
///
/// The namespace scopes both the storage collection and live-event routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Romhack,
    Sprite,
    Sound,
    Script,
}

impl ListingKind {
    /// All known listing kinds
    pub const ALL: [ListingKind; 4] = [
        ListingKind::Romhack,
        ListingKind::Sprite,
        ListingKind::Sound,
        ListingKind::Script,
    ];

    /// Returns the namespace string used on the wire and in URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::Romhack => "romhack",
            ListingKind::Sprite => "sprite",
            ListingKind::Sound => "sound",
            ListingKind::Script => "script",
        }
    }

    /// Parse a namespace string; unknown namespaces are rejected, not
    /// crashed on.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "romhack" => Some(ListingKind::Romhack),
            "sprite" => Some(ListingKind::Sprite),
            "sound" => Some(ListingKind::Sound),
            "script" => Some(ListingKind::Script),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Actions a listing mutation can broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingAction {
    Added,
    Updated,
    Deleted,
}

impl ListingAction {
    /// Returns the action string used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingAction::Added => "added",
            ListingAction::Updated => "updated",
            ListingAction::Deleted => "deleted",
        }
    }

    /// Parse an action string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "added" => Some(ListingAction::Added),
            "updated" => Some(ListingAction::Updated),
            "deleted" => Some(ListingAction::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A listing record as stored and broadcast.
///
/// Records are schemaless JSON documents; identity lives in the `_id` field.
pub type ListingRecord = Value;

/// Extract the identity key of a record, if present.
pub fn record_id(record: &ListingRecord) -> Option<&str> {
    record.get("_id").and_then(Value::as_str)
}

/// Tombstone standing in for a removed listing.
///
/// Replaces the listing in cached views instead of removing it, so a UI slot
/// still referencing the record can detect the deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedEntry {
    #[serde(rename = "_id")]
    pub id: String,

    /// Always true; present so the tombstone is self-describing on the wire
    pub deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DeletedEntry {
    /// Create a tombstone for the given record id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            deleted: true,
            reason: None,
        }
    }

    /// Attach a human-readable reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Render as a broadcastable payload
    pub fn into_value(self) -> Value {
        serde_json::json!({
            "_id": self.id,
            "deleted": true,
            "reason": self.reason,
        })
    }
}
