//! Core library for registrar, a role-based academic records client.
//!
//! - `api`: HTTP adapter with one-shot token refresh, endpoint table, auth endpoints
//! - `cache`: tag-invalidated entity cache with live subscriptions
//! - `auth`: session store, token claims, keychain storage
//! - `forms`: field rules, form state and the built-in schemas
//! - `routes`: pages, role guards and menus
//! - `views`: headless list/detail/dashboard models and the search debouncer
//! - `models`: records mirrored from the backend
//! - `notify`: transient notifications
//! - `config`: persisted settings and environment overrides

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod forms;
pub mod models;
pub mod notify;
pub mod routes;
pub mod utils;
pub mod views;

pub use api::{ApiError, ApiResult, Registrar};
pub use auth::{Role, SessionStore};
pub use config::Config;
pub use notify::Notifier;
