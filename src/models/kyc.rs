//! KYC submission models

use serde::Serialize;
use validator::Validate;

use super::KycStatus;

/// KYC submission
#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct KycSubmission {
    #[validate(length(min = 1, max = 200, message = "full name is required"))]
    pub full_name: String,
    #[validate(length(min = 2, max = 56, message = "country is required"))]
    pub country: String,
}

/// Staff decision on a KYC submission
#[derive(Debug, Serialize)]
pub struct KycDecision {
    pub status: KycStatus,
}
