//! 银行 API 客户端库
//! 提供带令牌自动刷新的 HTTP 客户端，以及账户、KYC、两步验证和管理接口的封装

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod telemetry;

pub use client::{ApiClient, ApiRequest};
pub use error::{ApiError, OtpChallenge, RefreshError};
pub use state::AppState;
pub use storage::{CredentialStore, FileStore, MemoryStore, TokenStore};
