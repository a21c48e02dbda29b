use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::credentials::CredentialStore;
use super::token::{decode_token, AuthError, AuthUser};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user: AuthUser,
    #[serde(default)]
    pub needs_password_change: bool,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_expired(&self) -> bool {
        self.user.is_expired()
    }
}

/// Where a session survives restarts.
#[derive(Debug, Clone)]
struct Persistence {
    session_file: PathBuf,
    /// Refresh tokens go to the OS keychain when enabled.
    keychain: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    data: Option<SessionData>,
    refresh_token: Option<String>,
    /// Bumped whenever the signed-in user goes away or changes.
    generation: u64,
}

/// Process-wide session handle.
///
/// Cloning is cheap; every clone observes the same state. The HTTP adapter
/// reads the token from here and clears it when a refresh fails.
#[derive(Debug, Clone)]
pub struct SessionStore {
    state: Arc<RwLock<SessionState>>,
    persistence: Option<Persistence>,
}

impl SessionStore {
    /// A session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            persistence: None,
        }
    }

    /// A session persisted under `cache_dir`, with the refresh token in the keychain.
    pub fn persistent(cache_dir: &Path) -> Self {
        Self::with_persistence(cache_dir.join(SESSION_FILE), true)
    }

    /// A session persisted to an explicit file, refresh token kept in memory.
    pub fn file_backed(session_file: PathBuf) -> Self {
        Self::with_persistence(session_file, false)
    }

    fn with_persistence(session_file: PathBuf, keychain: bool) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            persistence: Some(Persistence {
                session_file,
                keychain,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Restore a persisted session.
    ///
    /// Returns `Ok(true)` when a usable session was restored. A stored token
    /// that no longer decodes, or has expired, is discarded.
    pub fn load(&self) -> Result<bool> {
        let Some(ref persistence) = self.persistence else {
            return Ok(false);
        };
        let path = &persistence.session_file;
        if !path.exists() {
            return Ok(false);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read session file")?;
        let data: SessionData = match serde_json::from_str(&contents) {
            Ok(data) => data,
            Err(e) => {
                if let Err(remove) = std::fs::remove_file(path) {
                    warn!(error = %remove, "Failed to remove corrupt session file");
                }
                return Err(e).context("Failed to parse session file");
            }
        };

        match decode_token(&data.token) {
            Ok(user) if !user.is_expired() => {
                let refresh_token = if persistence.keychain {
                    CredentialStore::get(&user.user_id).ok()
                } else {
                    None
                };
                let mut state = self.write();
                state.data = Some(SessionData { user, ..data });
                state.refresh_token = refresh_token;
                debug!("Session restored from disk");
                Ok(true)
            }
            Ok(_) => {
                debug!("Stored session has expired");
                self.logout();
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Stored session token is unreadable, clearing");
                self.logout();
                Ok(false)
            }
        }
    }

    fn save(&self) -> Result<()> {
        let Some(ref persistence) = self.persistence else {
            return Ok(());
        };
        let state = self.read();
        if let Some(ref data) = state.data {
            let path = &persistence.session_file;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Install an already decoded user and their access token.
    ///
    /// Use [`SessionStore::sign_in`] for a token straight from the backend.
    pub fn set_user(&self, user: AuthUser, token: String) {
        {
            let mut state = self.write();
            let same_user = state
                .data
                .as_ref()
                .is_some_and(|d| d.user.user_id == user.user_id);
            if !same_user {
                state.generation += 1;
            }
            let needs_password_change = state
                .data
                .as_ref()
                .filter(|d| d.user.user_id == user.user_id)
                .map(|d| d.needs_password_change)
                .unwrap_or(false);
            state.data = Some(SessionData {
                token,
                user,
                needs_password_change,
                created_at: Utc::now(),
            });
        }
        if let Err(e) = self.save() {
            warn!(error = %e, "Failed to save session");
        }
    }

    /// Decode `token` and install the user it names.
    ///
    /// A token that does not decode leaves the store signed out.
    pub fn sign_in(&self, token: String, needs_password_change: bool) -> Result<AuthUser, AuthError> {
        let user = match decode_token(&token) {
            Ok(user) => user,
            Err(e) => {
                self.logout();
                return Err(e);
            }
        };
        if user.is_expired() {
            self.logout();
            return Err(AuthError::Expired);
        }
        self.set_user(user.clone(), token);
        if let Some(data) = self.write().data.as_mut() {
            data.needs_password_change = needs_password_change;
        }
        if let Err(e) = self.save() {
            warn!(error = %e, "Failed to save session");
        }
        info!(user_id = %user.user_id, role = %user.role, "Signed in");
        Ok(user)
    }

    /// Swap in a refreshed access token for the current user.
    pub fn replace_token(&self, token: String) -> Result<AuthUser, AuthError> {
        let needs_password_change = self.needs_password_change();
        self.sign_in(token, needs_password_change)
    }

    /// Clear memory, the session file and the keychain entry.
    pub fn logout(&self) {
        let previous = {
            let mut state = self.write();
            state.refresh_token = None;
            let previous = state.data.take();
            if previous.is_some() {
                state.generation += 1;
            }
            previous
        };

        if let Some(ref persistence) = self.persistence {
            let path = &persistence.session_file;
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(error = %e, "Failed to remove session file");
                }
            }
            if persistence.keychain {
                if let Some(ref data) = previous {
                    if let Err(e) = CredentialStore::delete(&data.user.user_id) {
                        debug!(error = %e, "No keychain entry to delete");
                    }
                }
            }
        }

        if let Some(data) = previous {
            info!(user_id = %data.user.user_id, "Signed out");
        }
    }

    /// The signed-in user, if the token is still within its lifetime.
    pub fn current_user(&self) -> Option<AuthUser> {
        self.read()
            .data
            .as_ref()
            .filter(|d| !d.is_expired())
            .map(|d| d.user.clone())
    }

    /// The access token of the current session.
    pub fn current_token(&self) -> Option<String> {
        self.read().data.as_ref().map(|d| d.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn needs_password_change(&self) -> bool {
        self.read()
            .data
            .as_ref()
            .map(|d| d.needs_password_change)
            .unwrap_or(false)
    }

    /// Mark the password as changed so routing stops redirecting.
    pub fn clear_password_change(&self) {
        if let Some(data) = self.write().data.as_mut() {
            data.needs_password_change = false;
        }
        if let Err(e) = self.save() {
            warn!(error = %e, "Failed to save session");
        }
    }

    pub fn set_refresh_token(&self, refresh_token: String) {
        let user_id = self.read().data.as_ref().map(|d| d.user.user_id.clone());
        if let (Some(ref persistence), Some(ref user_id)) = (&self.persistence, &user_id) {
            if persistence.keychain {
                if let Err(e) = CredentialStore::store(user_id, &refresh_token) {
                    warn!(error = %e, "Failed to store refresh token");
                }
            }
        }
        self.write().refresh_token = Some(refresh_token);
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    /// Changes each time the session is cleared or another user signs in.
    ///
    /// Anything cached on behalf of a user compares this to know when to
    /// forget it.
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.read().data.as_ref().map(|d| d.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::{encode_unsigned, Role};

    fn token_for(role: Role, exp: i64) -> String {
        encode_unsigned(&AuthUser {
            user_id: "2030010001".to_string(),
            role,
            iat: None,
            exp: Some(exp),
        })
    }

    const FAR_FUTURE: i64 = 4_102_444_800;

    #[test]
    fn test_sign_in_and_logout() {
        let store = SessionStore::in_memory();
        assert!(store.current_user().is_none());

        let token = token_for(Role::Student, FAR_FUTURE);
        let user = store.sign_in(token.clone(), false).expect("sign in");
        assert_eq!(user.role, Role::Student);
        assert_eq!(store.current_token().as_deref(), Some(token.as_str()));
        assert!(store.is_authenticated());

        store.set_refresh_token("refresh".into());
        store.logout();
        assert!(store.current_user().is_none());
        assert!(store.current_token().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn test_undecodable_token_is_unauthenticated() {
        let store = SessionStore::in_memory();
        store
            .sign_in(token_for(Role::Admin, FAR_FUTURE), false)
            .unwrap();
        assert!(store.sign_in("garbage".into(), false).is_err());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_expired_token_rejected() {
        let store = SessionStore::in_memory();
        assert!(matches!(
            store.sign_in(token_for(Role::Admin, 10), false),
            Err(AuthError::Expired)
        ));
        assert!(store.current_token().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::in_memory();
        let other = store.clone();
        store.sign_in(token_for(Role::Faculty, FAR_FUTURE), true).unwrap();
        assert!(other.needs_password_change());
        other.clear_password_change();
        assert!(!store.needs_password_change());
    }

    #[test]
    fn test_persisted_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::file_backed(path.clone());
        store.sign_in(token_for(Role::Admin, FAR_FUTURE), true).unwrap();
        assert!(path.exists());

        let restored = SessionStore::file_backed(path.clone());
        assert!(restored.load().unwrap());
        assert_eq!(restored.current_user().map(|u| u.role), Some(Role::Admin));
        assert!(restored.needs_password_change());

        restored.logout();
        assert!(!path.exists());
    }

    #[test]
    fn test_load_discards_expired_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let user = AuthUser {
            user_id: "x".into(),
            role: Role::Student,
            iat: None,
            exp: Some(10),
        };
        let data = SessionData {
            token: encode_unsigned(&user),
            user,
            needs_password_change: false,
            created_at: Utc::now(),
        };
        std::fs::write(&path, serde_json::to_string(&data).unwrap()).unwrap();

        let store = SessionStore::file_backed(path.clone());
        assert!(!store.load().unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_load_removes_corrupt_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = SessionStore::file_backed(path.clone());
        assert!(store.load().is_err());
        assert!(!path.exists());
        // Next start is quiet.
        assert!(!store.load().unwrap());
    }

    #[test]
    fn test_generation_tracks_user_changes() {
        let store = SessionStore::in_memory();
        let start = store.generation();

        store.sign_in(token_for(Role::Admin, FAR_FUTURE), false).unwrap();
        let signed_in = store.generation();
        assert_ne!(signed_in, start);

        // Refreshing the same user's token keeps cached reads.
        store.replace_token(token_for(Role::Admin, FAR_FUTURE - 1)).unwrap();
        assert_eq!(store.generation(), signed_in);

        store.logout();
        let signed_out = store.generation();
        assert_ne!(signed_out, signed_in);

        // Logging out twice is not another change.
        store.logout();
        assert_eq!(store.generation(), signed_out);

        let other = encode_unsigned(&AuthUser {
            user_id: "2030010002".to_string(),
            role: Role::Student,
            iat: None,
            exp: Some(FAR_FUTURE),
        });
        store.sign_in(token_for(Role::Admin, FAR_FUTURE), false).unwrap();
        let first = store.generation();
        store.sign_in(other, false).unwrap();
        assert_ne!(store.generation(), first);
    }
}
