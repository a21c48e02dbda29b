//! Access token payload decoding.
//!
//! Tokens are JWTs issued by the backend. The client only reads the payload
//! to learn who is signed in and with which role; the signature is never
//! checked here, the backend does that on every request.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    Expired,

    #[error("Not signed in")]
    NotSignedIn,
}

/// User roles known to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    SuperAdmin,
    Admin,
    Faculty,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "superAdmin",
            Role::Admin => "admin",
            Role::Faculty => "faculty",
            Role::Student => "student",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "Super Admin",
            Role::Admin => "Admin",
            Role::Faculty => "Faculty",
            Role::Student => "Student",
        }
    }

    /// Whether this role may open pages that require `required`.
    ///
    /// SuperAdmin inherits every Admin page.
    pub fn satisfies(&self, required: Role) -> bool {
        *self == required || (*self == Role::SuperAdmin && required == Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity claims carried in the access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl AuthUser {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at().map(|at| Utc::now() >= at).unwrap_or(false)
    }
}

/// Decode the payload segment of a JWT into [`AuthUser`].
pub fn decode_token(token: &str) -> Result<AuthUser, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::InvalidToken("expected three segments".to_string()));
    }

    // Some issuers pad the segment; the URL-safe engine rejects padding.
    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| AuthError::InvalidToken(format!("payload encoding: {}", e)))?;

    serde_json::from_slice(&payload)
        .map_err(|e| AuthError::InvalidToken(format!("payload claims: {}", e)))
}

/// Build an unsigned token with the given claims.
///
/// Used by tests and local tooling; the backend never accepts these.
pub fn encode_unsigned(user: &AuthUser) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(user).unwrap_or_default());
    format!("{}.{}.sig", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, exp: Option<i64>) -> AuthUser {
        AuthUser {
            user_id: "A-0001".to_string(),
            role,
            iat: Some(1_700_000_000),
            exp,
        }
    }

    #[test]
    fn test_decode_round_trips_claims() {
        let original = user(Role::Faculty, Some(4_102_444_800));
        let decoded = decode_token(&encode_unsigned(&original)).expect("token should decode");
        assert_eq!(decoded, original);
        assert!(!decoded.is_expired());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_token("not-a-token"), Err(AuthError::InvalidToken(_))));
        assert!(matches!(decode_token("a.!!!.c"), Err(AuthError::InvalidToken(_))));
        let no_role = format!("h.{}.s", URL_SAFE_NO_PAD.encode(br#"{"userId":"x"}"#));
        assert!(matches!(decode_token(&no_role), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token() {
        let decoded = decode_token(&encode_unsigned(&user(Role::Student, Some(1)))).unwrap();
        assert!(decoded.is_expired());
    }

    #[test]
    fn test_role_satisfies() {
        assert!(Role::SuperAdmin.satisfies(Role::Admin));
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(!Role::Admin.satisfies(Role::SuperAdmin));
        assert!(!Role::Faculty.satisfies(Role::Admin));
        assert!(!Role::SuperAdmin.satisfies(Role::Student));
    }

    #[test]
    fn test_role_wire_names() {
        let role: Role = serde_json::from_str("\"superAdmin\"").unwrap();
        assert_eq!(role, Role::SuperAdmin);
        assert_eq!(Role::Student.to_string(), "student");
    }
}
