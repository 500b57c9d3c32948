//! Authenticated API client for the feedline backend
//!
//! Every call goes through [`ApiClient::request`], which attaches the current
//! bearer token and, on a 401, refreshes the session once and replays the
//! request with the new token.

pub mod auth;
pub mod comments;
pub mod feed;
pub mod media;
pub mod notifications;
pub mod posts;
pub mod users;

use reqwest::{Client, ClientBuilder, Method, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{CredentialStore, MemoryStore};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::{AccessToken, SessionConfig, SessionManager};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-request options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Send without a bearer token and never refresh (login, register)
    pub skip_auth: bool,
}

impl RequestOptions {
    /// Options for calls that precede authentication
    pub const fn anonymous() -> Self {
        Self { skip_auth: true }
    }
}

/// Feedline API client
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionManager,
}

impl ApiClient {
    /// Create a client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Client for `config`, persisting the refresh token in `credentials`
    pub fn from_config(config: &Config, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        Self::builder()
            .base_url(config.base_url())
            .timeout(config.timeout())
            .session_config(config.session())
            .credentials(credentials)
            .build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session this client authenticates with
    pub const fn session(&self) -> &SessionManager {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Perform a request and decode the JSON response
    ///
    /// A 401 on an authenticated request triggers one session refresh and one
    /// replay with the new token. A 401 on the replay fails with
    /// [`Error::AuthExpired`]; a failed refresh is returned as is.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<T> {
        let url = self.url(path);
        let max_retries = self.session.config().max_auth_retries;
        let mut token = if options.skip_auth {
            None
        } else {
            self.session.access_token()
        };
        let mut retries = 0;

        loop {
            tracing::debug!(%method, path, retry = retries, "API request");

            let response = self
                .send(method.clone(), &url, body.as_ref(), token.as_ref())
                .await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !options.skip_auth {
                if retries >= max_retries {
                    tracing::warn!(path, "Still unauthorized after refresh");
                    return Err(Error::AuthExpired);
                }
                retries += 1;
                token = Some(self.token_after_unauthorized(token.as_ref()).await?);
                continue;
            }

            return decode(status, response).await;
        }
    }

    /// Token to replay with after a 401
    ///
    /// If the session already moved past the token that was rejected, another
    /// caller refreshed in the meantime and the current token is reused.
    async fn token_after_unauthorized(&self, rejected: Option<&AccessToken>) -> Result<AccessToken> {
        if let Some(current) = self.session.access_token() {
            if rejected.is_none_or(|r| r.as_str() != current.as_str()) {
                tracing::debug!("Token changed since request was sent, replaying");
                return Ok(current);
            }
        }

        tracing::info!("Access token rejected, refreshing session");
        self.session.refresh().await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        token: Option<&AccessToken>,
    ) -> Result<reqwest::Response> {
        let mut request = self.http.request(method, url);

        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, token.bearer());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    /// `GET` with bearer auth
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None, RequestOptions::default())
            .await
    }

    /// `POST` a JSON body with bearer auth
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request(
            Method::POST,
            path,
            Some(serde_json::to_value(body)?),
            RequestOptions::default(),
        )
        .await
    }

    /// `POST` without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::POST, path, None, RequestOptions::default())
            .await
    }

    /// `PATCH` with an optional JSON body
    pub async fn patch<T: DeserializeOwned>(&self, path: &str, body: Option<Value>) -> Result<T> {
        self.request(Method::PATCH, path, body, RequestOptions::default())
            .await
    }

    /// `DELETE` with bearer auth
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::DELETE, path, None, RequestOptions::default())
            .await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Decode a response, mapping non-success statuses to [`Error::Api`]
async fn decode<T: DeserializeOwned>(status: StatusCode, response: reqwest::Response) -> Result<T> {
    let body = response.text().await?;

    if !status.is_success() {
        tracing::debug!(status = status.as_u16(), "API error response");
        return Err(Error::from_response(status, &body));
    }

    // Empty bodies decode as `null` so `()` and `Option<T>` work
    let body = if body.trim().is_empty() { "null" } else { &body };
    Ok(serde_json::from_str(body)?)
}

/// Query string builder that skips absent values
#[derive(Debug, Default)]
pub(crate) struct Query {
    parts: Vec<String>,
}

impl Query {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(mut self, key: &str, value: impl ToString) -> Self {
        self.parts.push(format!(
            "{}={}",
            key,
            urlencoding::encode(&value.to_string())
        ));
        self
    }

    pub(crate) fn push_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.push(key, value),
            None => self,
        }
    }

    /// Append to `path`, adding `?` only when there are parameters
    pub(crate) fn apply(self, path: &str) -> String {
        if self.parts.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, self.parts.join("&"))
        }
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    credentials: Option<Arc<dyn CredentialStore>>,
    session_config: Option<SessionConfig>,
    session: Option<SessionManager>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Durable storage for the refresh token (defaults to in-memory)
    pub fn credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Renewal margin and replay policy
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = Some(config);
        self
    }

    /// Share an existing session instead of creating one
    pub fn session(mut self, session: SessionManager) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".into()))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got {base_url}"
            )));
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("feedline/{}", crate::VERSION));

        let http = ClientBuilder::new()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        let session = self.session.unwrap_or_else(|| {
            let credentials = self
                .credentials
                .unwrap_or_else(|| Arc::new(MemoryStore::new()));
            SessionManager::new(
                credentials,
                http.clone(),
                &base_url,
                self.session_config.unwrap_or_default(),
            )
        });

        Ok(ApiClient {
            http,
            base_url,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let result = ApiClient::builder().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_bad_scheme() {
        let result = ApiClient::builder().base_url("localhost:8080").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client = ApiClient::builder()
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/me"), "http://localhost:8080/me");
    }

    #[test]
    fn test_query_builder() {
        assert_eq!(Query::new().apply("/feed"), "/feed");
        assert_eq!(
            Query::new()
                .push_opt("cursor", None::<&str>)
                .push("limit", 20)
                .apply("/users/1/followers"),
            "/users/1/followers?limit=20"
        );
        assert_eq!(
            Query::new().push("q", "jo hn&co").apply("/users/search"),
            "/users/search?q=jo%20hn%26co"
        );
    }
}
