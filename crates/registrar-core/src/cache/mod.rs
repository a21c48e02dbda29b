//! Tag-invalidated entity cache.
//!
//! This module provides the `EntityCache` that sits between views and the
//! HTTP adapter. Every read is stored under the entity tags it provides;
//! every write names the tags it invalidates. Invalidating a tag re-issues
//! each active read under it, so views never keep showing data that a
//! successful write has made stale.
//!
//! Nothing is persisted: entries live for the duration of the process.

pub mod key;
pub mod manager;

pub use key::{params, QueryKey};
pub use manager::{CachedData, EntityCache, QueryState, Subscription};
