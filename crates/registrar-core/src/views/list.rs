use std::marker::PhantomData;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::api::{ApiError, ApiResult, Registrar, Resource};
use crate::cache::{EntityCache, QueryKey, QueryState, Subscription};
use crate::config::Config;
use crate::models::{EntityKind, PageMeta};
use crate::notify::Notifier;

use super::debounce::Debouncer;
use super::record_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Edit,
    Delete,
}

/// What the front-end should do after a row action.
#[derive(Debug, Clone, PartialEq)]
pub enum RowIntent {
    /// Open the edit form prefilled with `record`.
    Edit { id: String, record: Value },
    /// Ask the user to confirm deleting `id`.
    ConfirmDelete { id: String, label: String },
}

/// A searchable, paginated table over one entity list.
///
/// The table stays bound to a cache subscription, so a write anywhere in
/// the client that invalidates this entity type refreshes it in place.
pub struct ListView<T = Value> {
    cache: EntityCache,
    resource: Resource,
    path: String,
    search: String,
    applied_search: String,
    debouncer: Debouncer,
    page: u32,
    limit: u32,
    filters: Vec<(String, String)>,
    subscription: Option<Subscription>,
    raw_rows: Vec<Value>,
    rows: Vec<T>,
    meta: Option<PageMeta>,
    loading: bool,
    error: Option<ApiError>,
    selected: usize,
    pending_delete: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ListView<T> {
    /// Table over the standard list endpoint of `kind`.
    pub fn new(registrar: &Registrar, kind: EntityKind, config: &Config) -> Self {
        let resource = registrar.resource(kind);
        let path = resource.def().base.to_string();
        Self::with_path(registrar, kind, path, config)
    }

    /// Table over a role-specific list path that still carries `kind`'s tag.
    pub fn with_path(
        registrar: &Registrar,
        kind: EntityKind,
        path: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self {
            cache: registrar.cache().clone(),
            resource: registrar.resource(kind),
            path: path.into(),
            search: String::new(),
            applied_search: String::new(),
            debouncer: Debouncer::new(config.search_debounce()),
            page: 1,
            limit: config.page_size.max(1),
            filters: Vec::new(),
            subscription: None,
            raw_rows: Vec::new(),
            rows: Vec::new(),
            meta: None,
            loading: false,
            error: None,
            selected: 0,
            pending_delete: None,
            _marker: PhantomData,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.resource.kind()
    }

    /// Query parameters of the current read.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if !self.applied_search.is_empty() {
            params.push(("searchTerm".to_string(), self.applied_search.clone()));
        }
        params.push(("page".to_string(), self.page.to_string()));
        params.push(("limit".to_string(), self.limit.to_string()));
        params.extend(self.filters.iter().cloned());
        params
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey::new(self.path.clone(), &self.params())
    }

    /// Bind to the read for the current parameters.
    pub fn mount(&mut self) {
        let key = self.query_key();
        debug!(key = %key, "List mounted");
        let mut subscription = self.cache.subscribe(key, &[self.resource.kind()]);
        let state = subscription.take();
        self.subscription = Some(subscription);
        self.apply(state);
    }

    pub fn unmount(&mut self) {
        self.subscription = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Pull in whatever changed since the last tick.
    ///
    /// Returns true when something visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(search) = self.debouncer.poll(now) {
            self.apply_search(search);
            changed = true;
        }
        let next = match self.subscription.as_mut() {
            Some(sub) if sub.has_changed() => Some(sub.take()),
            _ => None,
        };
        if let Some(state) = next {
            self.apply(state);
            changed = true;
        }
        changed
    }

    /// Wait until the bound read settles and show it.
    pub async fn settle(&mut self) -> ApiResult<()> {
        if self.subscription.is_none() {
            self.mount();
        }
        let Some(sub) = self.subscription.as_mut() else {
            return Ok(());
        };
        let result = sub.ready().await;
        let state = sub.take();
        self.apply(state);
        result.map(|_| ())
    }

    fn apply(&mut self, state: QueryState) {
        self.loading = state.is_loading();
        match state {
            QueryState::Failed(e) => {
                debug!(error = %e, "List read failed");
                self.error = Some(e);
            }
            QueryState::Loading => {}
            QueryState::Ready(data) | QueryState::Refreshing(data) => {
                let parsed = data
                    .collection::<Value>()
                    .and_then(|raw| data.collection::<T>().map(|typed| (raw, typed)));
                match parsed {
                    Ok((raw, typed)) => {
                        self.error = None;
                        self.meta = raw.meta;
                        self.raw_rows = raw.items;
                        self.rows = typed.items;
                    }
                    Err(e) => self.error = Some(e),
                }
            }
        }
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    fn remount(&mut self) {
        if self.subscription.is_some() {
            self.mount();
        }
    }

    // ===== Search, paging, filters =====

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Record search input; the read follows once typing settles.
    pub fn type_search(&mut self, text: impl Into<String>, now: Instant) {
        self.search = text.into();
        self.debouncer.push(self.search.trim().to_string(), now);
    }

    pub fn push_search_char(&mut self, c: char, now: Instant) {
        let mut text = self.search.clone();
        text.push(c);
        self.type_search(text, now);
    }

    pub fn pop_search_char(&mut self, now: Instant) {
        let mut text = self.search.clone();
        text.pop();
        self.type_search(text, now);
    }

    /// Apply the typed search now instead of waiting.
    pub fn submit_search(&mut self) {
        if let Some(search) = self.debouncer.flush() {
            self.apply_search(search);
        }
    }

    fn apply_search(&mut self, search: String) {
        self.applied_search = search;
        self.page = 1;
        self.selected = 0;
        self.remount();
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn total_pages(&self) -> u32 {
        self.meta.as_ref().map(|m| m.total_page.max(1)).unwrap_or(1)
    }

    pub fn set_page(&mut self, page: u32) {
        let page = page.max(1);
        if page != self.page {
            self.page = page;
            self.selected = 0;
            self.remount();
        }
    }

    pub fn next_page(&mut self) {
        if self.meta.as_ref().map(PageMeta::has_next).unwrap_or(false) {
            self.set_page(self.page + 1);
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.set_page(self.page - 1);
        }
    }

    pub fn set_filter(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.filters.retain(|(n, _)| n != name);
        if !value.is_empty() {
            self.filters.push((name.to_string(), value));
        }
        self.page = 1;
        self.remount();
    }

    // ===== Rows and selection =====

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn raw_rows(&self) -> &[Value] {
        &self.raw_rows
    }

    pub fn meta(&self) -> Option<&PageMeta> {
        self.meta.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_row(&self) -> Option<&T> {
        self.rows.get(self.selected)
    }

    pub fn selected_id(&self) -> Option<String> {
        self.raw_rows.get(self.selected).and_then(record_key)
    }

    // ===== Row actions =====

    pub fn row_action(&mut self, action: RowAction) -> Option<RowIntent> {
        let record = self.raw_rows.get(self.selected)?.clone();
        let id = record_key(&record)?;
        match action {
            RowAction::Edit => Some(RowIntent::Edit { id, record }),
            RowAction::Delete => {
                self.pending_delete = Some(id.clone());
                Some(RowIntent::ConfirmDelete {
                    label: record_label(&record).unwrap_or_else(|| id.clone()),
                    id,
                })
            }
        }
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the record awaiting confirmation.
    ///
    /// The outcome is reported through `notifier`; the list refreshes via
    /// tag invalidation.
    pub async fn confirm_delete(&mut self, notifier: &Notifier) -> ApiResult<()> {
        let Some(id) = self.pending_delete.take() else {
            return Ok(());
        };
        match self.resource.delete(&id).await {
            Ok(()) => {
                notifier.success(format!("{} deleted", self.resource.kind().singular()));
                Ok(())
            }
            Err(e) => {
                notifier.error(e.user_message());
                Err(e)
            }
        }
    }
}

/// A short human label for a record, for confirmations.
pub fn record_label(record: &Value) -> Option<String> {
    if let Some(name) = record.get("name") {
        if let Some(s) = name.as_str() {
            return Some(s.to_string());
        }
        let first = name.get("firstName").and_then(Value::as_str).unwrap_or("");
        let last = name.get("lastName").and_then(Value::as_str).unwrap_or("");
        let full = format!("{} {}", first, last).trim().to_string();
        if !full.is_empty() {
            return Some(full);
        }
    }
    ["title", "question", "year"]
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_label() {
        assert_eq!(
            record_label(&json!({ "name": { "firstName": "Ada", "lastName": "Lovelace" } })),
            Some("Ada Lovelace".to_string())
        );
        assert_eq!(
            record_label(&json!({ "name": "Science" })),
            Some("Science".to_string())
        );
        assert_eq!(record_label(&json!({ "title": "T" })), Some("T".to_string()));
        assert_eq!(record_label(&json!({ "_id": "x" })), None);
    }
}
