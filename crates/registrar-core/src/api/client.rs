//! HTTP adapter for the academic records REST API.
//!
//! Every backend call goes through [`HttpClient::request`]. The adapter
//! attaches the session's access token, maps failures onto [`ApiError`],
//! and on an authentication failure performs exactly one token refresh
//! before giving up and clearing the session.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::config::{AuthScheme, Config};

use super::error::{ApiError, ApiResult};

/// Path of the token refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Name of the cookie the backend reads the refresh credential from.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Query parameters as ordered name/value pairs.
pub type Params = [(String, String)];

/// How a single request authenticates.
#[derive(Debug, Clone)]
pub(crate) enum Credential {
    /// Whatever access token the session currently holds.
    Session,
    /// An explicit token, e.g. a password reset token.
    Token(String),
    /// The refresh cookie only.
    RefreshCookie(String),
    None,
}

/// Response body plus headers, for callers that read cookies.
#[derive(Debug)]
pub struct RawResponse {
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Debug, Deserialize)]
struct RefreshData {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// API client. Clone is cheap - reqwest::Client and the session are shared.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth_scheme: AuthScheme,
    session: SessionStore,
}

impl HttpClient {
    pub fn new(config: &Config, session: SessionStore) -> ApiResult<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            auth_scheme: config.auth_scheme,
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn headers(&self, credential: &Credential) -> ApiResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let token = match credential {
            Credential::Session => self.session.current_token(),
            Credential::Token(token) => Some(token.clone()),
            Credential::RefreshCookie(refresh) => {
                let cookie = format!("{}={}", REFRESH_COOKIE, refresh);
                headers.insert(
                    header::COOKIE,
                    HeaderValue::from_str(&cookie)
                        .map_err(|e| ApiError::InvalidResponse(format!("bad cookie value: {}", e)))?,
                );
                None
            }
            Credential::None => None,
        };
        if let Some(token) = token {
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&self.auth_scheme.header_value(&token))
                    .map_err(|e| ApiError::InvalidResponse(format!("bad token value: {}", e)))?,
            );
        }
        Ok(headers)
    }

    async fn send(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
        params: &Params,
        credential: &Credential,
    ) -> ApiResult<Response> {
        let url = self.url(path);
        debug!(%method, url = %url, params = params.len(), "Sending request");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .headers(self.headers(credential)?);
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Check if response is successful, returning the parsed body or a typed error.
    async fn check_response(response: Response) -> ApiResult<RawResponse> {
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .map_err(|e| ApiError::InvalidResponse(format!("body is not JSON: {}", e)))?
        };
        Ok(RawResponse { headers, body })
    }

    /// Issue a request with the session token, refreshing once on 401.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        params: &Params,
    ) -> ApiResult<Value> {
        let response = self
            .send(&method, path, body, params, &Credential::Session)
            .await?;

        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Self::check_response(response).await.map(|raw| raw.body);
        }

        debug!(path, "Access token rejected, attempting refresh");
        if let Err(e) = self.refresh_access_token().await {
            warn!(error = %e, "Token refresh failed, signing out");
            self.session.logout();
            return Err(ApiError::Unauthenticated);
        }

        let retry = self
            .send(&method, path, body, params, &Credential::Session)
            .await?;
        match Self::check_response(retry).await {
            Err(ApiError::Unauthenticated) => {
                warn!(path, "Refreshed token rejected, signing out");
                self.session.logout();
                Err(ApiError::Unauthenticated)
            }
            other => other.map(|raw| raw.body),
        }
    }

    /// Issue a request without the refresh-on-401 behavior.
    pub(crate) async fn request_raw(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        credential: Credential,
    ) -> ApiResult<RawResponse> {
        let response = self.send(&method, path, body, &[], &credential).await?;
        Self::check_response(response).await
    }

    /// Exchange the stored refresh credential for a new access token.
    pub async fn refresh_access_token(&self) -> ApiResult<String> {
        let refresh = self
            .session
            .refresh_token()
            .ok_or(ApiError::Unauthenticated)?;

        let raw = self
            .request_raw(Method::POST, REFRESH_PATH, None, Credential::RefreshCookie(refresh))
            .await?;

        let data = raw.body.get("data").cloned().unwrap_or(raw.body);
        let refreshed: RefreshData = serde_json::from_value(data)
            .map_err(|e| ApiError::InvalidResponse(format!("refresh response: {}", e)))?;

        self.session
            .replace_token(refreshed.access_token.clone())
            .map_err(|e| {
                warn!(error = %e, "Refreshed token does not decode");
                ApiError::Unauthenticated
            })?;
        debug!("Access token refreshed");
        Ok(refreshed.access_token)
    }

    pub async fn get(&self, path: &str, params: &Params) -> ApiResult<Value> {
        self.request(Method::GET, path, None, params).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.request(Method::POST, path, Some(body), &[]).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.request(Method::PATCH, path, Some(body), &[]).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.request(Method::PUT, path, Some(body), &[]).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.request(Method::DELETE, path, None, &[]).await
    }
}

/// Pull `name=value` out of `Set-Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
}
