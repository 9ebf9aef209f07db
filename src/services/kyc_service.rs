//! KYC 服务

use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::{
    client::{ApiClient, ApiRequest},
    error::ApiError,
    models::{KycDecision, KycStatus, KycSubmission, User, UserEnvelope},
};

pub struct KycService {
    client: Arc<ApiClient>,
}

impl KycService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// 当前用户的 KYC 状态
    pub async fn status(&self) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self.client.send_json(ApiRequest::get("/kyc/status")).await?;
        Ok(envelope.user)
    }

    pub async fn submit(&self, full_name: &str, country: &str) -> Result<User, ApiError> {
        let submission = KycSubmission {
            full_name: full_name.trim().to_string(),
            country: country.trim().to_string(),
        };
        submission.validate()?;

        let request = ApiRequest::post("/kyc/submit").json(&submission)?;
        let envelope: UserEnvelope = self.client.send_json(request).await?;
        info!(kyc_status = envelope.user.kyc_status.as_str(), "KYC submitted");
        Ok(envelope.user)
    }

    /// 员工审核：设置指定用户的 KYC 状态
    pub async fn set_status(&self, user_id: &str, status: KycStatus) -> Result<(), ApiError> {
        let request = ApiRequest::patch(format!("/kyc/admin/{}/status", user_id))
            .json(&KycDecision { status })?;
        self.client.send_empty(request).await?;
        info!(user_id = %user_id, status = status.as_str(), "KYC status updated");
        Ok(())
    }
}
