//! Response envelope and collection types.
//!
//! The backend wraps every payload as
//! `{ "success": true, "message": "...", "data": ..., "meta": {...} }`.
//! Bare payloads are accepted too.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiError, ApiResult};

/// Pagination metadata returned alongside collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PageMeta {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(rename = "totalPage", default)]
    pub total_page: u32,
}

impl PageMeta {
    pub fn has_next(&self) -> bool {
        self.page < self.total_page
    }
}

#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub message: Option<String>,
    pub data: Value,
    pub meta: Option<PageMeta>,
}

impl Envelope {
    pub fn from_value(value: Value) -> ApiResult<Self> {
        let is_envelope = value
            .as_object()
            .map(|o| o.contains_key("data") && (o.contains_key("success") || o.contains_key("message")))
            .unwrap_or(false);

        if !is_envelope {
            return Ok(Self {
                message: None,
                data: value,
                meta: None,
            });
        }

        let Value::Object(mut map) = value else {
            return Err(ApiError::InvalidResponse("envelope is not an object".to_string()));
        };

        if map.get("success").and_then(Value::as_bool) == Some(false) {
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            return Err(ApiError::BadRequest(message));
        }

        let meta = match map.remove("meta") {
            Some(Value::Null) | None => None,
            Some(meta) => Some(
                serde_json::from_value(meta)
                    .map_err(|e| ApiError::InvalidResponse(format!("meta: {}", e)))?,
            ),
        };

        Ok(Self {
            message: map.get("message").and_then(Value::as_str).map(str::to_string),
            data: map.remove("data").unwrap_or(Value::Null),
            meta,
        })
    }

    pub fn into_data<T: DeserializeOwned>(self) -> ApiResult<T> {
        serde_json::from_value(self.data)
            .map_err(|e| ApiError::InvalidResponse(format!("unexpected payload: {}", e)))
    }

    /// Interpret the payload as a list. Some list endpoints nest it as
    /// `{ "result": [...], "meta": {...} }` inside `data`.
    pub fn into_collection<T: DeserializeOwned>(self) -> ApiResult<Collection<T>> {
        let (items, meta) = match self.data {
            Value::Object(mut inner) if inner.contains_key("result") => {
                let meta = match inner.remove("meta") {
                    Some(Value::Null) | None => self.meta,
                    Some(meta) => serde_json::from_value(meta).ok().or(self.meta),
                };
                (inner.remove("result").unwrap_or(Value::Array(Vec::new())), meta)
            }
            Value::Null => (Value::Array(Vec::new()), self.meta),
            other => (other, self.meta),
        };
        let items = serde_json::from_value(items)
            .map_err(|e| ApiError::InvalidResponse(format!("unexpected list payload: {}", e)))?;
        Ok(Collection { items, meta })
    }
}

/// A list read result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection<T> {
    pub items: Vec<T>,
    pub meta: Option<PageMeta>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            meta: None,
        }
    }
}

impl<T> Collection<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total count across pages, falling back to the page length.
    pub fn total(&self) -> u64 {
        self.meta.map(|m| m.total).unwrap_or(self.items.len() as u64)
    }
}
