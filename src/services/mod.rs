//! Typed wrappers over the banking API resources

pub mod account_service;
pub mod admin_service;
pub mod auth_service;
pub mod kyc_service;
pub mod mfa_service;

pub use account_service::{AccountService, ActionOutcome, PendingAction, RateQuote};
pub use admin_service::AdminService;
pub use auth_service::AuthService;
pub use kyc_service::KycService;
pub use mfa_service::MfaService;
