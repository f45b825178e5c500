//! Listing store reconciliation engine.
//!
//! One instance per listing type. Combines periodic polling, staleness
//! tracking, and live-event application under the global update mode:
//!
//! - `auto`: apply live events immediately while the matching list view is
//!   active, and refresh on a timer.
//! - `notify`: queue live `added` events for an explicit merge; still apply
//!   `deleted`/`updated` corrections.
//! - `manual`: ignore live events entirely.
//!
//! Live `added` items are always prepended, newest arrival first; only a
//! full fetch applies the catalogue's own ordering.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::listing::{record_id, ListingAction, ListingKind, ListingRecord};
use crate::sync::{SyncError, SyncResult};

use super::settings::{ActiveRoute, Settings, UpdateMode};
use super::LiveClient;

/// Default staleness window and auto-refresh interval
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_millis(60_000);

/// Performs the full-list fetch for a store.
pub trait ListingFetcher: Send + Sync {
    fn fetch(&self, kind: ListingKind) -> BoxFuture<'static, SyncResult<Vec<ListingRecord>>>;
}

/// Fetcher backed by the catalogue's REST API.
pub struct HttpListingFetcher {
    base_url: String,
    client: reqwest::Client,
}

impl HttpListingFetcher {
    /// Create a fetcher for the given server base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

impl ListingFetcher for HttpListingFetcher {
    fn fetch(&self, kind: ListingKind) -> BoxFuture<'static, SyncResult<Vec<ListingRecord>>> {
        let url = format!("{}/api/{}", self.base_url, kind);
        let client = self.client.clone();

        Box::pin(async move {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| SyncError::Fetch(e.to_string()))?;

            if !response.status().is_success() {
                return Err(SyncError::Fetch(format!(
                    "unexpected status {}",
                    response.status()
                )));
            }

            response
                .json::<Vec<ListingRecord>>()
                .await
                .map_err(|e| SyncError::Fetch(e.to_string()))
        })
    }
}

/// Per-store configuration
#[derive(Debug, Clone)]
pub struct ListingStoreOptions {
    /// Namespace this store caches
    pub kind: ListingKind,
    /// Route whose view shows this store's list
    pub route_name: String,
    /// Staleness window and auto-refresh interval
    pub refresh_window: Duration,
}

impl ListingStoreOptions {
    /// Options with the default refresh window
    pub fn new(kind: ListingKind, route_name: impl Into<String>) -> Self {
        Self {
            kind,
            route_name: route_name.into(),
            refresh_window: DEFAULT_REFRESH_WINDOW,
        }
    }

    /// Override the refresh window
    pub fn with_refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }
}

#[derive(Debug, Default)]
struct StoreState {
    data: Vec<ListingRecord>,
    queued: Vec<ListingRecord>,
    loading: bool,
    error: Option<String>,
    last_fetched_ms: i64,
}

/// Locally cached listing state for one namespace.
pub struct ListingStore {
    options: ListingStoreOptions,
    state: RwLock<StoreState>,
    settings: Arc<Settings>,
    route: Arc<ActiveRoute>,
    client: Arc<LiveClient>,
    fetcher: Arc<dyn ListingFetcher>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl ListingStore {
    /// Create a store; live updates start only once `init_live_updates`
    /// is called.
    pub fn new(
        options: ListingStoreOptions,
        settings: Arc<Settings>,
        route: Arc<ActiveRoute>,
        client: Arc<LiveClient>,
        fetcher: Arc<dyn ListingFetcher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            options,
            state: RwLock::new(StoreState::default()),
            settings,
            route,
            client,
            fetcher,
            refresh_task: Mutex::new(None),
        })
    }

    /// Namespace this store caches
    pub fn kind(&self) -> ListingKind {
        self.options.kind
    }

    /// The authoritative, visible list
    pub fn data(&self) -> Vec<ListingRecord> {
        self.state.read().map(|s| s.data.clone()).unwrap_or_default()
    }

    /// Records received live but withheld pending user acknowledgement
    pub fn queued(&self) -> Vec<ListingRecord> {
        self.state.read().map(|s| s.queued.clone()).unwrap_or_default()
    }

    /// Whether a fetch is in flight
    pub fn loading(&self) -> bool {
        self.state.read().map(|s| s.loading).unwrap_or(false)
    }

    /// Last fetch failure, if any
    pub fn error(&self) -> Option<String> {
        self.state.read().ok().and_then(|s| s.error.clone())
    }

    /// Milliseconds-since-epoch of the last refresh or live observation;
    /// zero when nothing has been fetched yet
    pub fn last_fetched_ms(&self) -> i64 {
        self.state.read().map(|s| s.last_fetched_ms).unwrap_or(0)
    }

    /// True when the cache is older than the refresh window
    pub fn is_stale(&self) -> bool {
        now_ms() - self.last_fetched_ms() > self.options.refresh_window.as_millis() as i64
    }

    /// Fetch the full list unless the cache is populated and fresh.
    ///
    /// On success the list is replaced wholesale; on failure the list is
    /// left unchanged and the error is captured. Loading is cleared on both
    /// paths.
    pub async fn fetch_data(&self, force: bool) {
        {
            let populated = self
                .state
                .read()
                .map(|s| !s.data.is_empty())
                .unwrap_or(false);
            if populated && !force && !self.is_stale() {
                return;
            }
        }

        if let Ok(mut state) = self.state.write() {
            state.loading = true;
            state.error = None;
        }

        let result = self.fetcher.fetch(self.options.kind).await;

        if let Ok(mut state) = self.state.write() {
            match result {
                Ok(records) => {
                    state.data = records;
                    state.last_fetched_ms = now_ms();
                }
                Err(err) => {
                    state.error = Some(err.to_string());
                }
            }
            state.loading = false;
        }
    }

    /// Explicit forced refresh
    pub async fn refresh_data(&self) {
        self.fetch_data(true).await;
    }

    /// Move every queued entry to the front of `data`, preserving queue
    /// order, and empty the queue.
    pub fn merge_queued(&self) {
        if let Ok(mut state) = self.state.write() {
            let mut merged = std::mem::take(&mut state.queued);
            merged.append(&mut state.data);
            state.data = merged;
        }
    }

    /// Start the recurring refresh timer.
    ///
    /// No-op when a timer already runs or the mode is not `auto`. The timer
    /// only refreshes while the active view matches this store's route.
    pub fn start_auto_refresh(self: &Arc<Self>) {
        let mut task = match self.refresh_task.lock() {
            Ok(t) => t,
            Err(_) => return,
        };
        if task.is_some() || self.settings.update_mode() != UpdateMode::Auto {
            return;
        }

        let store = Arc::downgrade(self);
        let window = self.options.refresh_window;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(window);
            // The first tick completes immediately; refreshes start one
            // window out.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else { break };
                if store.route.matches(&store.options.route_name) {
                    store.refresh_data().await;
                }
            }
        }));
    }

    /// Stop the refresh timer; safe to call when none is running.
    pub fn stop_auto_refresh(&self) {
        if let Ok(mut task) = self.refresh_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }

    /// Whether the refresh timer is currently installed
    pub fn auto_refresh_active(&self) -> bool {
        self.refresh_task.lock().map(|t| t.is_some()).unwrap_or(false)
    }

    /// Subscribe to this store's live events and, under `auto` with the
    /// matching view active, start the refresh timer.
    ///
    /// Under `manual` mode no subscriptions are installed at all.
    pub fn init_live_updates(self: &Arc<Self>) {
        let mode = self.settings.update_mode();

        if mode == UpdateMode::Auto && self.route.matches(&self.options.route_name) {
            self.start_auto_refresh();
        }

        if mode == UpdateMode::Manual {
            return;
        }

        let kind = self.options.kind;

        let weak = Arc::downgrade(self);
        self.client.subscribe(
            kind,
            ListingAction::Added,
            Box::new(move |payload| {
                if let Some(store) = weak.upgrade() {
                    store.apply_added(payload);
                }
            }),
        );

        let weak = Arc::downgrade(self);
        self.client.subscribe(
            kind,
            ListingAction::Deleted,
            Box::new(move |payload| {
                if let Some(store) = weak.upgrade() {
                    store.apply_deleted(payload);
                }
            }),
        );

        let weak = Arc::downgrade(self);
        self.client.subscribe(
            kind,
            ListingAction::Updated,
            Box::new(move |payload| {
                if let Some(store) = weak.upgrade() {
                    store.apply_updated(payload);
                }
            }),
        );
    }

    /// Unsubscribe the namespace and stop the refresh timer. Idempotent.
    pub fn stop_live_updates(&self) {
        self.client.unsubscribe(self.options.kind);
        self.stop_auto_refresh();
    }

    fn apply_added(&self, payload: Value) {
        let mode = self.settings.update_mode();
        let route_matches = self.route.matches(&self.options.route_name);

        if let Ok(mut state) = self.state.write() {
            state.last_fetched_ms = now_ms();
            match mode {
                UpdateMode::Notify => state.queued.insert(0, payload),
                UpdateMode::Auto if route_matches => state.data.insert(0, payload),
                // Observed for staleness bookkeeping, not applied.
                _ => {}
            }
        }
    }

    fn apply_deleted(&self, payload: Value) {
        let mode = self.settings.update_mode();

        if let Ok(mut state) = self.state.write() {
            state.last_fetched_ms = now_ms();

            // This subscription is never installed under manual mode, but
            // the mode can change after installation.
            if mode == UpdateMode::Manual {
                return;
            }

            let Some(id) = record_id(&payload).map(str::to_string) else {
                return;
            };

            // Replace in place with the tombstone rather than removing, so
            // a UI slot still referencing the record can detect deletion.
            if let Some(pos) = state
                .data
                .iter()
                .position(|r| record_id(r) == Some(id.as_str()))
            {
                state.data[pos] = payload.clone();
            }

            state.queued.retain(|r| record_id(r) != Some(id.as_str()));
        }
    }

    fn apply_updated(&self, payload: Value) {
        if self.settings.update_mode() == UpdateMode::Manual
            || !self.route.matches(&self.options.route_name)
        {
            return;
        }

        if let Ok(mut state) = self.state.write() {
            let Some(id) = record_id(&payload).map(str::to_string) else {
                return;
            };
            if let Some(pos) = state
                .data
                .iter()
                .position(|r| record_id(r) == Some(id.as_str()))
            {
                state.data[pos] = payload;
            }
        }
    }
}

impl Drop for ListingStore {
    fn drop(&mut self) {
        if let Ok(mut task) = self.refresh_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
