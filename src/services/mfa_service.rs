//! 两步验证（TOTP）绑定

use std::sync::Arc;
use validator::Validate;

use crate::{
    client::{ApiClient, ApiRequest},
    error::ApiError,
    models::{OtpRequest, SuccessResponse, TotpSetup},
};

pub struct MfaService {
    client: Arc<ApiClient>,
}

impl MfaService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn totp_setup(&self) -> Result<TotpSetup, ApiError> {
        let request = ApiRequest::post("/mfa/totp/setup").json(&serde_json::json!({}))?;
        self.client.send_json(request).await
    }

    pub async fn totp_enable(&self, otp_code: &str) -> Result<bool, ApiError> {
        let payload = OtpRequest {
            otp_code: otp_code.trim().to_string(),
        };
        payload.validate()?;

        let request = ApiRequest::post("/mfa/totp/enable").json(&payload)?;
        let response: SuccessResponse = self.client.send_json(request).await?;
        Ok(response.success)
    }
}
