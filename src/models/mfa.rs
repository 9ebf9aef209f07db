//! TOTP enrollment models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// TOTP enrollment material
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpSetup {
    pub qrcode_data_url: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default, rename = "otpauth_url", skip_serializing_if = "Option::is_none")]
    pub otpauth_url: Option<String>,
}

#[derive(Debug, Serialize, Validate)]
pub struct OtpRequest {
    #[validate(length(min = 6, max = 8, message = "authenticator codes have 6 to 8 digits"))]
    pub otp_code: String,
}

/// `{"success": true}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
}
