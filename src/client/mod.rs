//! 银行 API 客户端
//!
//! 每个请求在发送前读取存储中的凭据并附加 Bearer 头；收到 401 时执行一次
//! 协调刷新，然后用新令牌重放原请求（每个请求至多重放一次）。

mod refresh;
mod request;

pub use request::ApiRequest;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::storage::{CredentialStore, TokenStore};
use refresh::RefreshCoordinator;

/// Authenticated API client
pub struct ApiClient {
    http: Client,
    base_url: String,
    credentials: TokenStore,
    refresh: RefreshCoordinator,
    config: ApiConfig,
}

impl ApiClient {
    /// 创建新的客户端
    pub fn new(config: &ApiConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("bank-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_parts(config, http, TokenStore::new(store)))
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    pub fn with_http_client(self, http: Client) -> Self {
        Self::with_parts(&self.config, http, self.credentials)
    }

    fn with_parts(config: &ApiConfig, http: Client, credentials: TokenStore) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let refresh = RefreshCoordinator::new(
            http.clone(),
            format!("{}/auth/refresh", base_url),
            config.refresh_timeout(),
            credentials.clone(),
        );

        Self {
            http,
            base_url,
            credentials,
            refresh,
            config: config.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Persisted credential pair
    pub fn credentials(&self) -> &TokenStore {
        &self.credentials
    }

    pub async fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing().await
    }

    /// 发送请求，必要时刷新令牌并重放一次
    ///
    /// Non-2xx responses are returned as [`ApiError`] with status and body
    /// preserved. A 401 triggers the shared refresh unless the request has
    /// already been replayed; if recovery fails the original 401 is returned.
    pub async fn send(&self, mut request: ApiRequest) -> Result<Response, ApiError> {
        let mut bearer = self.credentials.access_token()?;

        loop {
            let response = self.dispatch(&request, bearer.as_deref()).await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let error = ApiError::from_response(response).await;
            if status != StatusCode::UNAUTHORIZED || request.is_retried() {
                return Err(error);
            }

            request.mark_retried();
            match self.refresh.on_unauthorized(bearer.as_deref()).await {
                Ok(access_token) => {
                    metrics::counter!("bank_client_request_replay_total").increment(1);
                    debug!(method = %request.method(), path = %request.path(), "Replaying request with refreshed token");
                    bearer = Some(access_token);
                }
                Err(reason) => {
                    debug!(path = %request.path(), reason = %reason, "Token recovery failed");
                    return Err(error);
                }
            }
        }
    }

    /// Sends the request and decodes a JSON body
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Sends the request and discards any body
    pub async fn send_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.send(request).await?;
        Ok(())
    }

    /// Explicitly refreshes the access token, sharing an in-flight refresh.
    ///
    /// Unlike the 401 path, the refresh failure itself is surfaced.
    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        Ok(self.refresh.refresh().await?)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<Response, reqwest::Error> {
        let mut builder = self
            .http
            .request(request.method().clone(), self.url(request.path()))
            .headers(request.headers().clone());

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        debug!(
            method = %request.method(),
            path = %request.path(),
            authenticated = bearer.is_some(),
            retried = request.is_retried(),
            "Dispatching request"
        );

        builder.send().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_url_joining() {
        let config = ApiConfig::new("http://localhost:3001/api/v1/");
        let client = ApiClient::new(&config, Arc::new(MemoryStore::new())).unwrap();

        assert_eq!(client.base_url(), "http://localhost:3001/api/v1");
        assert_eq!(client.url("/auth/me"), "http://localhost:3001/api/v1/auth/me");
        assert_eq!(client.url("accounts"), "http://localhost:3001/api/v1/accounts");
    }
}
