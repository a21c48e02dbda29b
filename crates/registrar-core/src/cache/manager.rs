use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::api::{ApiError, ApiResult, HttpClient};
use crate::models::{Collection, EntityKind, Envelope};

use super::key::QueryKey;

#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

impl CachedData<Value> {
    pub fn collection<T: DeserializeOwned>(&self) -> ApiResult<Collection<T>> {
        Envelope::from_value(self.data.clone())?.into_collection()
    }

    pub fn entity<T: DeserializeOwned>(&self) -> ApiResult<T> {
        Envelope::from_value(self.data.clone())?.into_data()
    }
}

/// Lifecycle of one cached read as seen by its subscribers.
#[derive(Debug, Clone)]
pub enum QueryState {
    /// First fetch in flight, nothing to show yet.
    Loading,
    Ready(Arc<CachedData<Value>>),
    /// Invalidated; the previous value is shown while the re-fetch runs.
    Refreshing(Arc<CachedData<Value>>),
    Failed(ApiError),
}

impl QueryState {
    /// The value to render, fresh or stale.
    pub fn data(&self) -> Option<&Arc<CachedData<Value>>> {
        match self {
            QueryState::Ready(data) | QueryState::Refreshing(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading | QueryState::Refreshing(_))
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            QueryState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// How long a read nobody subscribes to stays cached.
pub const DEFAULT_KEEP_UNUSED: Duration = Duration::from_secs(60);

struct Entry {
    tags: Vec<EntityKind>,
    tx: watch::Sender<QueryState>,
    stale: bool,
    /// Last subscribe, one-shot read or unsubscribe.
    last_used: Instant,
}

impl Entry {
    fn new(tags: &[EntityKind]) -> Self {
        let (tx, _) = watch::channel(QueryState::Loading);
        Self {
            tags: tags.to_vec(),
            tx,
            stale: true,
            last_used: Instant::now(),
        }
    }

    fn is_expired(&self, now: Instant, keep_unused: Duration) -> bool {
        !self.is_active() && now.saturating_duration_since(self.last_used) >= keep_unused
    }

    fn provides_any(&self, tags: &[EntityKind]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }

    fn is_active(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

/// Live view of one cached read.
///
/// Holding a subscription keeps the entry active: invalidating any of its
/// tags re-issues the request and the new state arrives here. Dropping the
/// last subscription lets the next invalidation evict the entry.
pub struct Subscription {
    key: QueryKey,
    rx: watch::Receiver<QueryState>,
    entries: Weak<Mutex<Entries>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(entries) = self.entries.upgrade() else {
            return;
        };
        let mut entries = entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entry) = entries.map.get_mut(&self.key) {
            // The keep-unused window starts when the last subscriber leaves.
            entry.last_used = Instant::now();
        }
    }
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> QueryState {
        self.rx.borrow().clone()
    }

    /// True when a new state arrived since the last `current`/`changed` call.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Mark the current state as seen and return it.
    pub fn take(&mut self) -> QueryState {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next state change. Returns false once the entry is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the read settles and return its value.
    pub async fn ready(&mut self) -> ApiResult<Arc<CachedData<Value>>> {
        loop {
            let state = self.rx.borrow_and_update().clone();
            match state {
                QueryState::Ready(data) => return Ok(data),
                QueryState::Failed(e) => return Err(e),
                QueryState::Loading | QueryState::Refreshing(_) => {
                    if self.rx.changed().await.is_err() {
                        return Err(ApiError::InvalidResponse("query was evicted".to_string()));
                    }
                }
            }
        }
    }
}

struct Entries {
    map: HashMap<QueryKey, Entry>,
    /// Session generation the entries were fetched under.
    generation: u64,
}

/// Tag-invalidated cache over the HTTP adapter.
///
/// Reads are stored under the entity tags they provide. Writes go through
/// [`EntityCache::mutate`], which invalidates the tags the write affects;
/// every active read under those tags then re-fetches.
///
/// Entries belong to the signed-in user: once the session is cleared or
/// another user signs in, everything cached so far is dropped. A read with
/// no subscribers is dropped after the keep-unused window.
#[derive(Clone)]
pub struct EntityCache {
    http: HttpClient,
    entries: Arc<Mutex<Entries>>,
    keep_unused: Duration,
}

impl EntityCache {
    pub fn new(http: HttpClient) -> Self {
        Self::with_keep_unused(http, DEFAULT_KEEP_UNUSED)
    }

    pub fn with_keep_unused(http: HttpClient, keep_unused: Duration) -> Self {
        let generation = http.session().generation();
        Self {
            http,
            entries: Arc::new(Mutex::new(Entries {
                map: HashMap::new(),
                generation,
            })),
            keep_unused,
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Lock the entries, first dropping them if the session changed hands.
    fn lock(&self) -> MutexGuard<'_, Entries> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let generation = self.http.session().generation();
        if entries.generation != generation {
            if !entries.map.is_empty() {
                debug!(dropped = entries.map.len(), "Session changed, dropping cached reads");
            }
            entries.map.clear();
            entries.generation = generation;
        }
        entries
    }

    /// Drop reads that have gone unused for the keep-unused window.
    fn prune(&self, entries: &mut Entries) {
        let now = Instant::now();
        let keep_unused = self.keep_unused;
        let before = entries.map.len();
        entries.map.retain(|_, entry| !entry.is_expired(now, keep_unused));
        let evicted = before - entries.map.len();
        if evicted > 0 {
            debug!(evicted, "Evicted unused reads");
        }
    }

    /// Subscribe to a read. The first subscriber (or the first after an
    /// invalidation or failure) triggers the request.
    pub fn subscribe(&self, key: QueryKey, tags: &[EntityKind]) -> Subscription {
        let (rx, needs_fetch) = {
            let mut entries = self.lock();
            self.prune(&mut entries);
            let entry = entries.map.entry(key.clone()).or_insert_with(|| Entry::new(tags));
            entry.last_used = Instant::now();
            for tag in tags {
                if !entry.tags.contains(tag) {
                    entry.tags.push(*tag);
                }
            }
            let failed = matches!(*entry.tx.borrow(), QueryState::Failed(_));
            let needs_fetch = entry.stale || failed;
            if needs_fetch {
                entry.stale = false;
                if failed {
                    entry.tx.send_replace(QueryState::Loading);
                }
            }
            (entry.tx.subscribe(), needs_fetch)
        };

        if needs_fetch {
            self.spawn_fetch(key.clone());
        }
        Subscription {
            key,
            rx,
            entries: Arc::downgrade(&self.entries),
        }
    }

    /// One-shot read: the cached value when fresh, otherwise a request.
    pub async fn fetch(&self, key: QueryKey, tags: &[EntityKind]) -> ApiResult<Arc<CachedData<Value>>> {
        {
            let mut entries = self.lock();
            self.prune(&mut entries);
            if let Some(entry) = entries.map.get_mut(&key) {
                entry.last_used = Instant::now();
                if !entry.stale {
                    if let QueryState::Ready(ref data) = *entry.tx.borrow() {
                        debug!(key = %key, "Cache hit");
                        return Ok(data.clone());
                    }
                }
            }

            let entry = entries.map.entry(key.clone()).or_insert_with(|| Entry::new(tags));
            entry.stale = false;
        }
        self.run_fetch(&key).await
    }

    fn spawn_fetch(&self, key: QueryKey) {
        let cache = self.clone();
        tokio::spawn(async move {
            // Outcome is published to subscribers through the entry.
            let _ = cache.run_fetch(&key).await;
        });
    }

    async fn run_fetch(&self, key: &QueryKey) -> ApiResult<Arc<CachedData<Value>>> {
        debug!(key = %key, "Fetching");
        let generation = self.http.session().generation();
        let result = self.http.get(key.path(), key.params()).await;

        // Whichever fetch resolves last wins; no in-flight dedup.
        let mut entries = self.lock();
        if entries.generation != generation {
            debug!(key = %key, "Session changed during fetch, discarding result");
            return result.map(|value| Arc::new(CachedData::new(value)));
        }
        match result {
            Ok(value) => {
                let data = Arc::new(CachedData::new(value));
                if let Some(entry) = entries.map.get_mut(key) {
                    entry.last_used = Instant::now();
                    entry.tx.send_replace(QueryState::Ready(data.clone()));
                }
                Ok(data)
            }
            Err(e) => {
                debug!(key = %key, error = %e, "Fetch failed");
                if let Some(entry) = entries.map.get_mut(key) {
                    entry.tx.send_replace(QueryState::Failed(e.clone()));
                }
                Err(e)
            }
        }
    }

    /// Perform a write and, on success, invalidate `invalidates`.
    pub async fn mutate(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        invalidates: &[EntityKind],
    ) -> ApiResult<Value> {
        let value = self.http.request(method, path, body, &[]).await?;
        self.invalidate(invalidates);
        Ok(value)
    }

    /// Re-fetch every active read under `tags`; evict inactive ones.
    pub fn invalidate(&self, tags: &[EntityKind]) {
        let refetch: Vec<QueryKey> = {
            let mut entries = self.lock();
            entries
                .map
                .retain(|_, entry| !entry.provides_any(tags) || entry.is_active());

            entries
                .map
                .iter_mut()
                .filter(|(_, entry)| entry.provides_any(tags))
                .map(|(key, entry)| {
                    let previous = entry.tx.borrow().clone();
                    let next = match previous {
                        QueryState::Ready(data) | QueryState::Refreshing(data) => {
                            QueryState::Refreshing(data)
                        }
                        QueryState::Loading | QueryState::Failed(_) => QueryState::Loading,
                    };
                    entry.tx.send_replace(next);
                    entry.stale = false;
                    key.clone()
                })
                .collect()
        };

        debug!(?tags, refetching = refetch.len(), "Invalidated tags");
        for key in refetch {
            self.spawn_fetch(key);
        }
    }

    /// Drop every entry, e.g. after logout.
    pub fn clear(&self) {
        self.lock().map.clear();
    }

    /// Current state of a read, if cached.
    pub fn state(&self, key: &QueryKey) -> Option<QueryState> {
        self.lock().map.get(key).map(|entry| entry.tx.borrow().clone())
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().map.is_empty()
    }

    /// Most recent fetch time across entries, for the status bar.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.lock()
            .map
            .values()
            .filter_map(|entry| entry.tx.borrow().data().map(|d| d.cached_at))
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_age_display() {
        let mut cached = CachedData::new(1);
        assert_eq!(cached.age_display(), "just now");
        cached.cached_at = Utc::now() - Duration::minutes(5);
        assert_eq!(cached.age_display(), "5m ago");
        cached.cached_at = Utc::now() - Duration::hours(3);
        assert_eq!(cached.age_display(), "3h ago");
        cached.cached_at = Utc::now() - Duration::days(2);
        assert_eq!(cached.age_display(), "2d ago");
        cached.cached_at = Utc::now() + Duration::minutes(10);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_query_state_accessors() {
        let data = Arc::new(CachedData::new(serde_json::json!({"data": []})));
        assert!(QueryState::Loading.is_loading());
        assert!(QueryState::Refreshing(data.clone()).is_loading());
        assert!(QueryState::Refreshing(data.clone()).data().is_some());
        assert!(!QueryState::Ready(data).is_loading());
        let failed = QueryState::Failed(ApiError::Unauthenticated);
        assert!(failed.error().unwrap().is_unauthenticated());
    }
}
