//! 统一错误模型
//! 客户端侧的错误分类：传输错误、401、刷新失败、校验错误、其他状态码

use reqwest::StatusCode;
use thiserror::Error;

use crate::models::{ErrorBody, ErrorEnvelope};
use crate::storage::StorageError;

/// 刷新访问令牌失败的原因
///
/// 需要 `Clone`：同一次刷新的结果会被所有并发等待者共享。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("no refresh token stored")]
    MissingRefreshToken,

    #[error("refresh endpoint rejected the token with status {status}")]
    Rejected { status: u16, body: String },

    #[error("refresh request timed out")]
    Timeout,

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh response could not be decoded: {0}")]
    Decode(String),

    #[error("credential storage failed during refresh: {0}")]
    Storage(String),

    #[error("stored session was replaced or cleared while the refresh was in flight")]
    SessionChanged,
}

/// 服务端要求的二次验证状态（来自错误信封中的 `code`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpChallenge {
    /// 用户尚未启用 TOTP，需要先完成绑定
    SetupRequired,
    /// 操作需要提供验证码
    Required,
    /// 提供的验证码错误
    Invalid,
}

impl OtpChallenge {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "OTP_SETUP_REQUIRED" => Some(OtpChallenge::SetupRequired),
            "OTP_REQUIRED" => Some(OtpChallenge::Required),
            "OTP_INVALID" => Some(OtpChallenge::Invalid),
            _ => None,
        }
    }
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unauthorized ({status})")]
    Unauthorized {
        status: StatusCode,
        body: String,
        error: Option<ErrorBody>,
    },

    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[from] RefreshError),

    #[error("Validation failed ({status})")]
    Validation {
        status: StatusCode,
        body: String,
        error: Option<ErrorBody>,
    },

    #[error("Request failed with status {status}")]
    Status {
        status: StatusCode,
        body: String,
        error: Option<ErrorBody>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Credential storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// 根据非成功状态码与响应体构造错误，保留原始 body
    pub fn from_status(status: StatusCode, body: String) -> Self {
        let error = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized { status, body, error },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation { status, body, error }
            }
            _ => ApiError::Status { status, body, error },
        }
    }

    /// 读取响应体并分类
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::from_status(status, body)
    }

    /// 获取 HTTP 状态码（仅服务端返回的错误有）
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { status, .. }
            | ApiError::Validation { status, .. }
            | ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            ApiError::RefreshFailed(RefreshError::Rejected { status, .. }) => {
                StatusCode::from_u16(*status).ok()
            }
            _ => None,
        }
    }

    /// 获取错误码
    pub fn code(&self) -> Option<u16> {
        self.status().map(|s| s.as_u16())
    }

    /// 服务端错误信封
    pub fn error_body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::Unauthorized { error, .. }
            | ApiError::Validation { error, .. }
            | ApiError::Status { error, .. } => error.as_ref(),
            _ => None,
        }
    }

    /// 服务端提供的机器可读错误码，例如 `OTP_REQUIRED`
    pub fn error_code(&self) -> Option<&str> {
        self.error_body().map(|e| e.code.as_str())
    }

    /// 原始响应体
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { body, .. }
            | ApiError::Validation { body, .. }
            | ApiError::Status { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn otp_challenge(&self) -> Option<OtpChallenge> {
        self.error_code().and_then(OtpChallenge::from_code)
    }

    /// 面向用户的错误消息：优先使用服务端消息
    pub fn user_message(&self) -> String {
        if let Some(body) = self.error_body() {
            if !body.message.is_empty() {
                return body.message.clone();
            }
        }
        match self {
            ApiError::Transport(_) => "Network error, please try again".to_string(),
            ApiError::Unauthorized { .. } => "Authentication required".to_string(),
            ApiError::RefreshFailed(_) => "Session expired, please sign in again".to_string(),
            ApiError::Validation { .. } => "Request was rejected".to_string(),
            ApiError::Status { status, .. } => format!("Request failed ({})", status.as_u16()),
            ApiError::InvalidInput(msg) => msg.clone(),
            ApiError::Json(_) => "Unexpected response from server".to_string(),
            ApiError::Storage(_) => "Could not access stored credentials".to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::InvalidInput(e.to_string())
    }
}
