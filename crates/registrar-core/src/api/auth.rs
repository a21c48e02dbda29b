//! Authentication endpoints.
//!
//! Login and refresh never go through the refresh-on-401 path: a rejected
//! password is reported as-is rather than triggering a token refresh.

use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::models::envelope::Envelope;

use super::client::{cookie_value, Credential, HttpClient, REFRESH_COOKIE};
use super::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken", default)]
    refresh_token: Option<String>,
    #[serde(rename = "needsPasswordChange", default)]
    needs_password_change: bool,
}

/// Outcome of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: AuthUser,
    pub needs_password_change: bool,
}

/// Auth endpoints bound to an [`HttpClient`] and its session.
#[derive(Clone)]
pub struct AuthApi {
    http: HttpClient,
}

impl AuthApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Log in and install the resulting session.
    pub async fn login(&self, id: &str, password: &str) -> ApiResult<LoginOutcome> {
        let body = json!({ "id": id, "password": password });
        let raw = self
            .http
            .request_raw(Method::POST, "/auth/login", Some(&body), Credential::None)
            .await?;

        let data: LoginData = Envelope::from_value(raw.body)?.into_data()?;
        let refresh_token = data
            .refresh_token
            .or_else(|| cookie_value(&raw.headers, REFRESH_COOKIE));

        let session = self.http.session();
        let user = session
            .sign_in(data.access_token, data.needs_password_change)
            .map_err(|e| {
                warn!(error = %e, "Login returned an unreadable token");
                ApiError::Unauthenticated
            })?;

        match refresh_token {
            Some(refresh) => session.set_refresh_token(refresh),
            None => warn!("Login response carried no refresh credential"),
        }

        Ok(LoginOutcome {
            user,
            needs_password_change: data.needs_password_change,
        })
    }

    pub async fn register(&self, payload: &Value) -> ApiResult<Value> {
        let raw = self
            .http
            .request_raw(Method::POST, "/auth/register", Some(payload), Credential::None)
            .await?;
        Envelope::from_value(raw.body)?.into_data()
    }

    /// Refresh the access token using the stored refresh credential.
    pub async fn refresh(&self) -> ApiResult<String> {
        self.http.refresh_access_token().await
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> ApiResult<()> {
        let body = json!({ "oldPassword": old_password, "newPassword": new_password });
        self.http.post("/auth/change-password", &body).await?;
        self.http.session().clear_password_change();
        info!("Password changed");
        Ok(())
    }

    pub async fn forget_password(&self, id: &str) -> ApiResult<()> {
        let body = json!({ "id": id });
        self.http
            .request_raw(Method::POST, "/auth/forget-password", Some(&body), Credential::None)
            .await?;
        Ok(())
    }

    /// Reset a password with the token delivered out of band.
    pub async fn reset_password(&self, id: &str, new_password: &str, reset_token: &str) -> ApiResult<()> {
        let body = json!({ "id": id, "newPassword": new_password });
        self.http
            .request_raw(
                Method::POST,
                "/auth/reset-password",
                Some(&body),
                Credential::Token(reset_token.to_string()),
            )
            .await?;
        Ok(())
    }

    pub fn logout(&self) {
        self.http.session().logout();
    }
}
