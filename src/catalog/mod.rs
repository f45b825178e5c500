//! # Listing Catalogue
//!
//! In-memory document store for listing records, one collection per
//! namespace. This is the collaborator the live-sync core receives events
//! from: the route layer performs a mutation here and, on success,
//! broadcasts exactly one event.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::listing::{record_id, DeletedEntry, ListingKind, ListingRecord};

/// Catalogue errors
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// No listing matched the requested identity
    #[error("{0} not found")]
    NotFound(ListingKind),

    /// A listing with the same unique field already exists
    #[error("A {kind} with this {field} already exists")]
    Conflict { kind: ListingKind, field: &'static str },

    /// The submitted record is not usable
    #[error("Invalid listing: {0}")]
    Invalid(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for catalogue operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// In-memory listing store keyed by namespace.
#[derive(Debug, Default)]
pub struct Catalog {
    collections: RwLock<HashMap<ListingKind, Vec<ListingRecord>>>,
}

/// A listing is addressable by slug, numeric id, or object id.
fn matches_identity(record: &ListingRecord, id: &str) -> bool {
    if record.get("slug").and_then(Value::as_str) == Some(id) {
        return true;
    }
    if let Ok(numeric) = id.parse::<i64>() {
        if record.get("id").and_then(Value::as_i64) == Some(numeric) {
            return true;
        }
    }
    record_id(record) == Some(id)
}

fn release_date(record: &ListingRecord) -> &str {
    record
        .get("releaseDate")
        .and_then(Value::as_str)
        .unwrap_or("")
}

impl Catalog {
    /// Create an empty catalogue
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch all listings of a kind, newest release first.
    ///
    /// `search` filters by case-insensitive substring match on title or
    /// slug.
    pub fn fetch_all(&self, kind: ListingKind, search: Option<&str>) -> Vec<ListingRecord> {
        let collections = match self.collections.read() {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        let mut records: Vec<ListingRecord> = collections
            .get(&kind)
            .map(|list| {
                list.iter()
                    .filter(|record| match search {
                        Some(term) => {
                            let term = term.to_lowercase();
                            ["title", "slug"].iter().any(|field| {
                                record
                                    .get(field)
                                    .and_then(Value::as_str)
                                    .map_or(false, |v| v.to_lowercase().contains(&term))
                            })
                        }
                        None => true,
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        records.sort_by(|a, b| release_date(b).cmp(release_date(a)));
        records
    }

    /// Fetch one listing by slug, numeric id, or object id.
    pub fn fetch_one(&self, kind: ListingKind, id: &str) -> CatalogResult<ListingRecord> {
        let collections = self
            .collections
            .read()
            .map_err(|_| CatalogError::Internal("lock poisoned".into()))?;

        collections
            .get(&kind)
            .and_then(|list| list.iter().find(|r| matches_identity(r, id)))
            .cloned()
            .ok_or(CatalogError::NotFound(kind))
    }

    /// Insert a new listing.
    ///
    /// Rejects records without an object title and records whose title or
    /// slug collides with an existing listing. Assigns an `_id` when the
    /// submission has none.
    pub fn create(&self, kind: ListingKind, body: ListingRecord) -> CatalogResult<ListingRecord> {
        let mut record = match body {
            Value::Object(map) => Value::Object(map),
            other => {
                return Err(CatalogError::Invalid(format!(
                    "expected a JSON object, got {}",
                    kind_of(&other)
                )))
            }
        };

        let title = record.get("title").and_then(Value::as_str);
        if title.map_or(true, str::is_empty) {
            return Err(CatalogError::Invalid("a title is required".into()));
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| CatalogError::Internal("lock poisoned".into()))?;
        let list = collections.entry(kind).or_default();

        for existing in list.iter() {
            if existing.get("title").and_then(Value::as_str) == title {
                return Err(CatalogError::Conflict { kind, field: "title" });
            }
            let slug = record.get("slug").and_then(Value::as_str);
            if slug.is_some() && existing.get("slug").and_then(Value::as_str) == slug {
                return Err(CatalogError::Conflict { kind, field: "slug" });
            }
        }

        if record_id(&record).is_none() {
            if let Some(map) = record.as_object_mut() {
                map.insert(
                    "_id".into(),
                    Value::String(Uuid::new_v4().simple().to_string()),
                );
            }
        }

        list.push(record.clone());
        Ok(record)
    }

    /// Apply a partial patch to an existing listing and return the updated
    /// record.
    pub fn update(
        &self,
        kind: ListingKind,
        id: &str,
        patch: ListingRecord,
    ) -> CatalogResult<ListingRecord> {
        let patch = match patch {
            Value::Object(map) => map,
            other => {
                return Err(CatalogError::Invalid(format!(
                    "expected a JSON object, got {}",
                    kind_of(&other)
                )))
            }
        };

        let mut collections = self
            .collections
            .write()
            .map_err(|_| CatalogError::Internal("lock poisoned".into()))?;

        let record = collections
            .get_mut(&kind)
            .and_then(|list| list.iter_mut().find(|r| matches_identity(r, id)))
            .ok_or(CatalogError::NotFound(kind))?;

        if let Some(map) = record.as_object_mut() {
            for (key, value) in patch {
                // Identity is immutable.
                if key == "_id" {
                    continue;
                }
                map.insert(key, value);
            }
        }

        Ok(record.clone())
    }

    /// Remove a listing and return its tombstone.
    pub fn delete(&self, kind: ListingKind, id: &str) -> CatalogResult<DeletedEntry> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| CatalogError::Internal("lock poisoned".into()))?;

        let list = collections
            .get_mut(&kind)
            .ok_or(CatalogError::NotFound(kind))?;

        let position = list
            .iter()
            .position(|r| matches_identity(r, id))
            .ok_or(CatalogError::NotFound(kind))?;

        let removed = list.remove(position);
        let object_id = record_id(&removed).unwrap_or(id).to_string();
        Ok(DeletedEntry::new(object_id))
    }

    /// Number of listings of a kind
    pub fn count(&self, kind: ListingKind) -> usize {
        self.collections
            .read()
            .map(|c| c.get(&kind).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .create(
                ListingKind::Romhack,
                json!({
                    "title": "Emerald Redux",
                    "slug": "emerald-redux",
                    "releaseDate": "2024-01-10",
                }),
            )
            .unwrap();
        catalog
            .create(
                ListingKind::Romhack,
                json!({
                    "title": "Crystal Clear",
                    "slug": "crystal-clear",
                    "releaseDate": "2025-03-02",
                }),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_create_assigns_id() {
        let catalog = Catalog::new();
        let record = catalog
            .create(ListingKind::Sprite, json!({"title": "Shiny Gyarados"}))
            .unwrap();
        assert!(record_id(&record).is_some());
        assert_eq!(catalog.count(ListingKind::Sprite), 1);
    }

    #[test]
    fn test_create_rejects_duplicate_title() {
        let catalog = seeded();
        let err = catalog
            .create(ListingKind::Romhack, json!({"title": "Emerald Redux"}))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Conflict { field: "title", .. }));
    }

    #[test]
    fn test_create_rejects_duplicate_slug() {
        let catalog = seeded();
        let err = catalog
            .create(
                ListingKind::Romhack,
                json!({"title": "Another", "slug": "emerald-redux"}),
            )
            .unwrap_err();
        assert!(matches!(err, CatalogError::Conflict { field: "slug", .. }));
    }

    #[test]
    fn test_create_requires_title() {
        let catalog = Catalog::new();
        let err = catalog
            .create(ListingKind::Sound, json!({"slug": "untitled"}))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
    }

    #[test]
    fn test_fetch_all_sorted_newest_first() {
        let catalog = seeded();
        let records = catalog.fetch_all(ListingKind::Romhack, None);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["title"], "Crystal Clear");
        assert_eq!(records[1]["title"], "Emerald Redux");
    }

    #[test]
    fn test_fetch_all_search() {
        let catalog = seeded();
        let records = catalog.fetch_all(ListingKind::Romhack, Some("EMERALD"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["slug"], "emerald-redux");
    }

    #[test]
    fn test_fetch_one_by_slug_and_object_id() {
        let catalog = seeded();
        let by_slug = catalog.fetch_one(ListingKind::Romhack, "crystal-clear").unwrap();
        let oid = record_id(&by_slug).unwrap().to_string();
        let by_oid = catalog.fetch_one(ListingKind::Romhack, &oid).unwrap();
        assert_eq!(by_slug, by_oid);
    }

    #[test]
    fn test_fetch_one_missing() {
        let catalog = seeded();
        assert!(matches!(
            catalog.fetch_one(ListingKind::Romhack, "missing"),
            Err(CatalogError::NotFound(ListingKind::Romhack))
        ));
    }

    #[test]
    fn test_update_patches_fields() {
        let catalog = seeded();
        let updated = catalog
            .update(
                ListingKind::Romhack,
                "emerald-redux",
                json!({"version": "1.1"}),
            )
            .unwrap();
        assert_eq!(updated["version"], "1.1");
        assert_eq!(updated["title"], "Emerald Redux");
    }

    #[test]
    fn test_update_cannot_change_identity() {
        let catalog = seeded();
        let before = catalog.fetch_one(ListingKind::Romhack, "emerald-redux").unwrap();
        let updated = catalog
            .update(ListingKind::Romhack, "emerald-redux", json!({"_id": "forged"}))
            .unwrap();
        assert_eq!(record_id(&updated), record_id(&before));
    }

    #[test]
    fn test_delete_returns_tombstone() {
        let catalog = seeded();
        let tombstone = catalog.delete(ListingKind::Romhack, "emerald-redux").unwrap();
        assert!(tombstone.deleted);
        assert_eq!(catalog.count(ListingKind::Romhack), 1);

        assert!(matches!(
            catalog.delete(ListingKind::Romhack, "emerald-redux"),
            Err(CatalogError::NotFound(_))
        ));
    }
}
