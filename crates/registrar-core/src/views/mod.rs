//! Headless view models.
//!
//! These hold everything a page needs apart from drawing: the bound cache
//! subscription, search and paging state, selection and pending actions.
//! The terminal front-end renders them; tests drive them directly.

pub mod columns;
pub mod dashboard;
pub mod debounce;
pub mod detail;
pub mod list;

use serde_json::Value;

pub use columns::{cell, columns_for, Column};
pub use dashboard::{counters_for, Counter, CounterValue, Dashboard};
pub use debounce::Debouncer;
pub use detail::{flatten_fields, DetailView};
pub use list::{record_label, ListView, RowAction, RowIntent};

/// Identifier of a raw record, preferring `_id` over `id`.
pub fn record_key(record: &Value) -> Option<String> {
    ["_id", "id"]
        .iter()
        .find_map(|field| match record.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_key_prefers_object_id() {
        assert_eq!(
            record_key(&json!({ "id": "S-1", "_id": "abc" })),
            Some("abc".to_string())
        );
        assert_eq!(record_key(&json!({ "id": "S-1" })), Some("S-1".to_string()));
        assert_eq!(record_key(&json!({ "_id": "" , "id": 7 })), Some("7".to_string()));
        assert_eq!(record_key(&json!({})), None);
    }
}
