//! Shared client session state: the global update mode and the active
//! route. One instance of each is shared by every listing store.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Policy governing how live events affect cached listing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Apply live events immediately when the matching list view is active
    Auto,
    /// Queue live `added` events for manual merge; still apply corrections
    Notify,
    /// Ignore live events entirely except bookkeeping
    Manual,
}

impl Default for UpdateMode {
    fn default() -> Self {
        UpdateMode::Notify
    }
}

/// Global, user-configurable settings shared across all listing stores.
#[derive(Debug, Default)]
pub struct Settings {
    update_mode: RwLock<UpdateMode>,
}

impl Settings {
    /// Create settings with the default update mode (notify)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings with an explicit mode
    pub fn with_mode(mode: UpdateMode) -> Self {
        Self {
            update_mode: RwLock::new(mode),
        }
    }

    /// Current update mode
    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
            .read()
            .map(|m| *m)
            .unwrap_or(UpdateMode::Notify)
    }

    /// Change the update mode
    pub fn set_update_mode(&self, mode: UpdateMode) {
        if let Ok(mut current) = self.update_mode.write() {
            *current = mode;
        }
    }
}

/// The route the UI session currently displays.
///
/// Stores compare this against their associated route to decide whether
/// live events and auto-refresh apply to a visible view.
#[derive(Debug, Default)]
pub struct ActiveRoute {
    name: RwLock<Option<String>>,
}

impl ActiveRoute {
    /// Create with no active route
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active route name
    pub fn set(&self, name: impl Into<String>) {
        if let Ok(mut current) = self.name.write() {
            *current = Some(name.into());
        }
    }

    /// Clear the active route (navigation away from any listing view)
    pub fn clear(&self) {
        if let Ok(mut current) = self.name.write() {
            *current = None;
        }
    }

    /// Current route name, if any
    pub fn current(&self) -> Option<String> {
        self.name.read().ok().and_then(|n| n.clone())
    }

    /// Whether the active route matches the given name
    pub fn matches(&self, name: &str) -> bool {
        self.name
            .read()
            .map(|current| current.as_deref() == Some(name))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_notify() {
        let settings = Settings::new();
        assert_eq!(settings.update_mode(), UpdateMode::Notify);
    }

    #[test]
    fn test_set_update_mode() {
        let settings = Settings::new();
        settings.set_update_mode(UpdateMode::Auto);
        assert_eq!(settings.update_mode(), UpdateMode::Auto);
    }

    #[test]
    fn test_active_route_matching() {
        let route = ActiveRoute::new();
        assert!(!route.matches("Romhacks"));

        route.set("Romhacks");
        assert!(route.matches("Romhacks"));
        assert!(!route.matches("Sprites"));

        route.clear();
        assert!(!route.matches("Romhacks"));
        assert_eq!(route.current(), None);
    }

    #[test]
    fn test_mode_serde_form() {
        let mode: UpdateMode = serde_json::from_str("\"manual\"").unwrap();
        assert_eq!(mode, UpdateMode::Manual);
        assert_eq!(serde_json::to_string(&UpdateMode::Auto).unwrap(), "\"auto\"");
    }
}
