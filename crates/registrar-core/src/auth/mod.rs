//! Authentication module for managing the signed-in user.
//!
//! This module provides:
//! - `SessionStore`: process-wide session handle, persisted to disk
//! - `CredentialStore`: refresh token storage via the OS keyring
//! - `decode_token`: reads role and identity claims from an access token
//!
//! Sessions are cleared on logout, on token expiry, and whenever a token
//! fails to decode.

pub mod credentials;
pub mod session;
pub mod token;

pub use credentials::CredentialStore;
pub use session::{SessionData, SessionStore};
pub use token::{decode_token, AuthError, AuthUser, Role};
