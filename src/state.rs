//! 应用状态
//! 所有服务共享同一个 ApiClient，因此也共享同一个刷新槽位与凭据存储

use std::sync::Arc;

use crate::{
    client::ApiClient,
    config::{ApiConfig, AppConfig},
    error::ApiError,
    services::{AccountService, AdminService, AuthService, KycService, MfaService},
    storage::{CredentialStore, FileStore},
};

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ApiClient>,
    pub auth_service: Arc<AuthService>,
    pub account_service: Arc<AccountService>,
    pub kyc_service: Arc<KycService>,
    pub mfa_service: Arc<MfaService>,
    pub admin_service: Arc<AdminService>,
}

impl AppState {
    pub fn new(config: &ApiConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let client = Arc::new(ApiClient::new(config, store)?);
        Ok(Self::from_client(client))
    }

    /// 使用配置中的凭据文件
    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        let store = Arc::new(FileStore::new(&config.storage.credentials_path));
        Self::new(&config.api, store)
    }

    pub fn from_client(client: Arc<ApiClient>) -> Self {
        Self {
            auth_service: Arc::new(AuthService::new(client.clone())),
            account_service: Arc::new(AccountService::new(client.clone())),
            kyc_service: Arc::new(KycService::new(client.clone())),
            mfa_service: Arc::new(MfaService::new(client.clone())),
            admin_service: Arc::new(AdminService::new(client.clone())),
            client,
        }
    }
}
