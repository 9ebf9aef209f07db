//! Account, transaction and money movement models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MinorUnits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Open,
    Closed,
}

/// Bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub user_id: String,
    pub currency: String,
    pub status: AccountStatus,
    pub balance_minor: MinorUnits,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_open(&self) -> bool {
        self.status == AccountStatus::Open
    }

    /// 仅当余额为零且账户未关闭时允许关闭
    pub fn can_close(&self) -> bool {
        self.balance_minor.value() == 0 && self.status != AccountStatus::Closed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    #[serde(other)]
    Other,
}

/// Ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount_minor: MinorUnits,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Result of a deposit, withdrawal or conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyMovement {
    pub transaction: Transaction,
    pub balance_minor: MinorUnits,
}

/// `{"account": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEnvelope {
    pub account: Account,
}

/// `{"accounts": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsEnvelope {
    #[serde(default)]
    pub accounts: Vec<Account>,
}

/// Minimal account view returned by account closure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedAccount {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedAccountEnvelope {
    pub account: ClosedAccount,
}

/// Open account request
#[derive(Debug, Serialize)]
pub struct OpenAccountRequest<'a> {
    pub currency: &'a str,
}

/// Deposit / withdrawal request
#[derive(Debug, Serialize)]
pub struct AmountRequest<'a> {
    pub amount_minor: MinorUnits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_code: Option<&'a str>,
}

/// Currency conversion request
#[derive(Debug, Serialize)]
pub struct ConvertRequest<'a> {
    pub to_currency: &'a str,
    pub amount_minor: MinorUnits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_code: Option<&'a str>,
}

/// Account closure request; the backend expects the field even when empty
#[derive(Debug, Serialize)]
pub struct CloseAccountRequest<'a> {
    pub otp_code: &'a str,
}
