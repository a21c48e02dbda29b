use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::{ApiError, ApiResult, Registrar};
use crate::cache::{QueryState, Subscription};
use crate::models::EntityKind;

/// One record, kept current through a cache subscription.
pub struct DetailView<T = Value> {
    kind: EntityKind,
    id: String,
    subscription: Subscription,
    record: Option<T>,
    raw: Option<Value>,
    loading: bool,
    error: Option<ApiError>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> DetailView<T> {
    pub fn new(registrar: &Registrar, kind: EntityKind, id: impl Into<String>) -> Self {
        let id = id.into();
        let mut subscription = registrar.resource(kind).subscribe_get(&id);
        let state = subscription.take();
        let mut view = Self {
            kind,
            id,
            subscription,
            record: None,
            raw: None,
            loading: true,
            error: None,
            _marker: PhantomData,
        };
        view.apply(state);
        view
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn record(&self) -> Option<&T> {
        self.record.as_ref()
    }

    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// Pick up a new state if one arrived. Returns true when it did.
    pub fn tick(&mut self) -> bool {
        if !self.subscription.has_changed() {
            return false;
        }
        let state = self.subscription.take();
        self.apply(state);
        true
    }

    pub async fn settle(&mut self) -> ApiResult<()> {
        let result = self.subscription.ready().await;
        let state = self.subscription.take();
        self.apply(state);
        result.map(|_| ())
    }

    fn apply(&mut self, state: QueryState) {
        self.loading = state.is_loading();
        match state {
            QueryState::Loading => {}
            QueryState::Failed(e) => self.error = Some(e),
            QueryState::Ready(data) | QueryState::Refreshing(data) => {
                let parsed = data
                    .entity::<Value>()
                    .and_then(|raw| data.entity::<T>().map(|typed| (raw, typed)));
                match parsed {
                    Ok((raw, typed)) => {
                        self.error = None;
                        self.raw = Some(raw);
                        self.record = Some(typed);
                    }
                    Err(e) => self.error = Some(e),
                }
            }
        }
    }
}

/// Label/value pairs for every scalar field of a record, nested names
/// flattened with dots. Used by the detail pane.
pub fn flatten_fields(record: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into(record, "", &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "__v" || key == "password" {
                    continue;
                }
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(child, &name, out);
            }
        }
        Value::Array(items) => {
            let scalars: Vec<String> = items.iter().filter_map(scalar_text).collect();
            if scalars.len() == items.len() {
                out.push((prefix.to_string(), scalars.join(", ")));
            } else {
                for (i, item) in items.iter().enumerate() {
                    flatten_into(item, &format!("{}[{}]", prefix, i), out);
                }
            }
        }
        other => {
            if let Some(text) = scalar_text(other) {
                out.push((prefix.to_string(), text));
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
