//! REST API client module for the academic records backend.
//!
//! This module provides the `HttpClient` adapter, the auth endpoints, the
//! per-entity endpoint table and the `Registrar` handle that bundles them.
//!
//! The backend authenticates with a short-lived access token and a
//! longer-lived refresh credential; the adapter refreshes once on 401.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod service;

pub use auth::{AuthApi, LoginOutcome};
pub use client::{HttpClient, Params};
pub use endpoints::{endpoint, EndpointDef, EntityApi, Resource};
pub use error::{ApiError, ApiResult};
pub use service::Registrar;
