//! 认证服务：注册、登录、登出、会话恢复

use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    client::{ApiClient, ApiRequest},
    error::ApiError,
    models::{AuthResponse, CredentialsRequest, LogoutRequest, User, UserEnvelope},
};

pub struct AuthService {
    client: Arc<ApiClient>,
    current_user: RwLock<Option<User>>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            current_user: RwLock::new(None),
        }
    }

    /// 用户注册
    pub async fn signup(&self, email: &str, password: &Secret<String>) -> Result<User, ApiError> {
        self.authenticate("/auth/signup", email, password).await
    }

    /// 用户登录
    pub async fn login(&self, email: &str, password: &Secret<String>) -> Result<User, ApiError> {
        self.authenticate("/auth/login", email, password).await
    }

    async fn authenticate(
        &self,
        path: &'static str,
        email: &str,
        password: &Secret<String>,
    ) -> Result<User, ApiError> {
        let payload = CredentialsRequest {
            email: email.trim().to_string(),
            password: password.expose_secret().clone(),
        };
        payload.validate()?;

        let request = ApiRequest::post(path).json(&payload)?;
        let auth: AuthResponse = self.client.send_json(request).await?;
        self.set_auth(auth).await
    }

    /// 持久化令牌并缓存当前用户
    pub async fn set_auth(&self, auth: AuthResponse) -> Result<User, ApiError> {
        self.client.credentials().save(&auth.tokens)?;
        info!(user_id = %auth.user.id, role = ?auth.user.role, "Session established");

        *self.current_user.write().await = Some(auth.user.clone());
        Ok(auth.user)
    }

    /// 用户登出
    ///
    /// 本地凭据在任何情况下都会被清除；远端调用的错误在清理之后返回。
    pub async fn logout(&self) -> Result<(), ApiError> {
        let remote: Result<(), ApiError> = async {
            let Some(tokens) = self.client.credentials().load()? else {
                return Ok(());
            };
            let request = ApiRequest::post("/auth/logout").json(&LogoutRequest {
                refresh_token: &tokens.refresh_token,
            })?;
            self.client.send_empty(request).await
        }
        .await;

        let cleared = self.client.credentials().clear();
        *self.current_user.write().await = None;

        match &remote {
            Ok(()) => info!("Logged out"),
            Err(e) => warn!(error = %e, "Remote logout failed, local credentials cleared"),
        }

        remote?;
        cleared?;
        Ok(())
    }

    /// 获取当前登录用户
    pub async fn me(&self) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self.client.send_json(ApiRequest::get("/auth/me")).await?;
        Ok(envelope.user)
    }

    /// Re-fetches the profile and updates the cached user; failures keep the cache.
    pub async fn refresh_user_from_server(&self) -> Option<User> {
        match self.me().await {
            Ok(user) => {
                *self.current_user.write().await = Some(user.clone());
                Some(user)
            }
            Err(e) => {
                debug!(error = %e, "Failed to refresh user profile");
                None
            }
        }
    }

    /// 启动时恢复会话：存在凭据时拉取用户信息，失败不视为错误
    pub async fn bootstrap(&self) -> Option<User> {
        match self.client.credentials().load() {
            Ok(Some(_)) => self.refresh_user_from_server().await,
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credentials");
                None
            }
        }
    }

    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        self.client.refresh_access_token().await
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.client.credentials().load(), Ok(Some(_)))
    }

    pub async fn current_user(&self) -> Option<User> {
        self.current_user.read().await.clone()
    }
}
