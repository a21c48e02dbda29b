#![allow(dead_code)]

use chrono::Utc;
use registrar_core::auth::token::encode_unsigned;
use registrar_core::auth::{AuthUser, Role};
use registrar_core::{Config, Registrar, SessionStore};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const REFRESH: &str = "refresh-abc";

/// An unsigned access token for `role`, valid for an hour.
///
/// `iat` lets two tokens for the same user differ.
pub fn token(role: Role, iat: i64) -> String {
    token_for("A-0001", role, iat)
}

/// Like [`token`], for a specific user.
pub fn token_for(user_id: &str, role: Role, iat: i64) -> String {
    encode_unsigned(&AuthUser {
        user_id: user_id.to_string(),
        role,
        iat: Some(iat),
        exp: Some(Utc::now().timestamp() + 3600),
    })
}

pub fn config_for(server: &MockServer) -> Config {
    Config {
        api_base_url: format!("{}/api/v1", server.uri()),
        ..Config::default()
    }
}

/// A registrar signed in as `role` against `server`.
pub async fn signed_in(server: &MockServer, role: Role) -> (Registrar, String) {
    signed_in_with(&config_for(server), role)
}

/// A registrar signed in as `role` with an explicit config.
pub fn signed_in_with(config: &Config, role: Role) -> (Registrar, String) {
    let session = SessionStore::in_memory();
    let access = token(role, 1);
    session.sign_in(access.clone(), false).unwrap();
    session.set_refresh_token(REFRESH.to_string());
    let registrar = Registrar::new(config, session).unwrap();
    (registrar, access)
}

pub fn envelope(data: Value) -> Value {
    json!({ "success": true, "message": "ok", "data": data })
}

pub fn page(items: Value, total: u64) -> Value {
    json!({
        "success": true,
        "message": "ok",
        "data": items,
        "meta": { "page": 1, "limit": 10, "total": total, "totalPage": 1 }
    })
}
