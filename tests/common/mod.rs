//! 测试公共模块
//! 提供 mock 服务器、内存凭据存储与测试数据

#![allow(dead_code)]

use bank_client::{
    config::ApiConfig,
    models::Tokens,
    storage::{CredentialStore, MemoryStore, TokenStore},
    ApiClient, AppState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

pub const API_PREFIX: &str = "/api/v1";

/// 创建指向 mock 服务器的配置
pub fn create_test_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: format!("{}{}", server.uri(), API_PREFIX),
        request_timeout_secs: 5,
        refresh_timeout_secs: 5,
    }
}

/// 带前缀的路径，用于 wiremock 匹配
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

pub struct TestClient {
    pub store: Arc<MemoryStore>,
    pub client: Arc<ApiClient>,
}

impl TestClient {
    pub fn tokens(&self) -> TokenStore {
        self.client.credentials().clone()
    }

    pub fn state(&self) -> AppState {
        AppState::from_client(self.client.clone())
    }
}

/// 创建测试客户端，可选预置凭据
pub fn create_test_client(server: &MockServer, tokens: Option<Tokens>) -> TestClient {
    create_test_client_with_config(&create_test_config(server), tokens)
}

/// 使用自定义配置创建测试客户端（例如缩短刷新超时）
pub fn create_test_client_with_config(config: &ApiConfig, tokens: Option<Tokens>) -> TestClient {
    let store = Arc::new(MemoryStore::new());
    if let Some(tokens) = tokens {
        TokenStore::new(store.clone()).save(&tokens).unwrap();
    }
    let client = ApiClient::new(config, store.clone()).expect("Failed to create test client");

    TestClient {
        store,
        client: Arc::new(client),
    }
}

/// 指向不可达地址的客户端（用于模拟网络错误）
pub fn create_unreachable_client(tokens: Option<Tokens>) -> TestClient {
    let config = ApiConfig {
        base_url: "http://127.0.0.1:1/api/v1".to_string(),
        request_timeout_secs: 2,
        refresh_timeout_secs: 2,
    };
    create_test_client_with_config(&config, tokens)
}

pub fn stored_value(store: &MemoryStore, key: &str) -> Option<String> {
    store.get(key).unwrap()
}

pub fn user_json(id: &str, email: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "role": "ACCOUNT_HOLDER",
        "kycStatus": "VERIFIED",
        "totpEnabled": false
    })
}

pub fn auth_response_json(access: &str, refresh: &str) -> Value {
    json!({
        "user": user_json("u-1", "holder@bank.test"),
        "tokens": { "accessToken": access, "refreshToken": refresh }
    })
}

pub fn account_json(id: &str, currency: &str, balance: Value) -> Value {
    json!({
        "id": id,
        "userId": "u-1",
        "currency": currency,
        "status": "OPEN",
        "balanceMinor": balance,
        "createdAt": "2024-05-01T10:00:00Z"
    })
}

pub fn movement_json(kind: &str, amount: i64, balance: i64) -> Value {
    json!({
        "transaction": {
            "id": "tx-1",
            "type": kind,
            "amountMinor": amount,
            "currency": "EUR",
            "createdAt": "2024-05-01T10:05:00Z"
        },
        "balanceMinor": balance
    })
}

pub fn error_json(code: &str, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}
