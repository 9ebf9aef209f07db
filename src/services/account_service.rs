//! 账户服务：账户查询、开户/销户、存取款与货币兑换
//!
//! 资金操作分两步：先在本地构造 [`PendingAction`]（做基本校验并分配幂等键），
//! 用户确认后再调用 [`AccountService::confirm`]。同一个待确认操作重试时
//! （例如补充验证码）复用同一个幂等键，服务端据此去重。

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    client::{ApiClient, ApiRequest},
    error::ApiError,
    models::{
        Account, AccountEnvelope, AccountsEnvelope, AmountRequest, CloseAccountRequest,
        ClosedAccount, ClosedAccountEnvelope, ConvertRequest, MinorUnits, MoneyMovement,
        OpenAccountRequest, PageRequest, Paginated, Transaction,
    },
};

const IDEMPOTENCY_KEY: &str = "idempotency-key";

/// Indicative exchange rate shown to the user before a conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateQuote {
    pub rate: f64,
    pub as_of: DateTime<Utc>,
}

/// A money movement awaiting user confirmation
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    Deposit {
        account_id: String,
        amount: MinorUnits,
        idempotency_key: Uuid,
    },
    Withdraw {
        account_id: String,
        amount: MinorUnits,
        idempotency_key: Uuid,
    },
    Convert {
        account_id: String,
        to_currency: String,
        amount: MinorUnits,
        quote: Option<RateQuote>,
        idempotency_key: Uuid,
    },
    Close {
        account_id: String,
    },
}

impl PendingAction {
    pub fn deposit(account: &Account, amount_minor: i64) -> Result<Self, ApiError> {
        ensure_positive(amount_minor)?;
        Ok(PendingAction::Deposit {
            account_id: account.id.clone(),
            amount: MinorUnits(amount_minor),
            idempotency_key: Uuid::new_v4(),
        })
    }

    pub fn withdraw(account: &Account, amount_minor: i64) -> Result<Self, ApiError> {
        ensure_positive(amount_minor)?;
        if amount_minor > account.balance_minor.value() {
            return Err(ApiError::InvalidInput(
                "Withdrawal amount exceeds available balance".to_string(),
            ));
        }
        Ok(PendingAction::Withdraw {
            account_id: account.id.clone(),
            amount: MinorUnits(amount_minor),
            idempotency_key: Uuid::new_v4(),
        })
    }

    pub fn convert(
        account: &Account,
        to_currency: &str,
        amount_minor: i64,
        quote: Option<RateQuote>,
    ) -> Result<Self, ApiError> {
        let to_currency = to_currency.trim().to_uppercase();
        if to_currency.is_empty() || to_currency.eq_ignore_ascii_case(&account.currency) {
            return Err(ApiError::InvalidInput(
                "Target currency must differ from the account currency".to_string(),
            ));
        }
        ensure_positive(amount_minor)?;
        Ok(PendingAction::Convert {
            account_id: account.id.clone(),
            to_currency,
            amount: MinorUnits(amount_minor),
            quote,
            idempotency_key: Uuid::new_v4(),
        })
    }

    pub fn close(account: &Account) -> Result<Self, ApiError> {
        if !account.can_close() {
            return Err(ApiError::InvalidInput(
                "Account can only be closed when open with a zero balance".to_string(),
            ));
        }
        Ok(PendingAction::Close {
            account_id: account.id.clone(),
        })
    }

    pub fn account_id(&self) -> &str {
        match self {
            PendingAction::Deposit { account_id, .. }
            | PendingAction::Withdraw { account_id, .. }
            | PendingAction::Convert { account_id, .. }
            | PendingAction::Close { account_id } => account_id,
        }
    }

    pub fn idempotency_key(&self) -> Option<Uuid> {
        match self {
            PendingAction::Deposit { idempotency_key, .. }
            | PendingAction::Withdraw { idempotency_key, .. }
            | PendingAction::Convert { idempotency_key, .. } => Some(*idempotency_key),
            PendingAction::Close { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PendingAction::Deposit { .. } => "DEPOSIT",
            PendingAction::Withdraw { .. } => "WITHDRAW",
            PendingAction::Convert { .. } => "CONVERT",
            PendingAction::Close { .. } => "CLOSE",
        }
    }
}

fn ensure_positive(amount_minor: i64) -> Result<(), ApiError> {
    if amount_minor <= 0 {
        return Err(ApiError::InvalidInput(
            "Amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Outcome of a confirmed [`PendingAction`]
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Moved(MoneyMovement),
    Closed(ClosedAccount),
}

pub struct AccountService {
    client: Arc<ApiClient>,
}

impl AccountService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// 列出账户；`user_id` 供员工查看指定用户的账户
    pub async fn list_accounts(&self, user_id: Option<&str>) -> Result<Vec<Account>, ApiError> {
        let request = ApiRequest::get("/accounts").query_opt("userId", user_id);
        let envelope: AccountsEnvelope = self.client.send_json(request).await?;
        Ok(envelope.accounts)
    }

    pub async fn get_account(&self, account_id: &str) -> Result<Account, ApiError> {
        let envelope: AccountEnvelope = self
            .client
            .send_json(ApiRequest::get(format!("/accounts/{}", account_id)))
            .await?;
        Ok(envelope.account)
    }

    pub async fn open_account(&self, currency: &str) -> Result<Account, ApiError> {
        let currency = currency.trim().to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ApiError::InvalidInput(format!(
                "Invalid currency code: {currency}"
            )));
        }

        let request = ApiRequest::post("/accounts").json(&OpenAccountRequest {
            currency: &currency,
        })?;
        let envelope: AccountEnvelope = self.client.send_json(request).await?;
        info!(account_id = %envelope.account.id, currency = %currency, "Account opened");
        Ok(envelope.account)
    }

    /// Distinct currencies of the caller's open accounts
    pub async fn open_currencies(&self) -> Result<Vec<String>, ApiError> {
        let mut currencies: Vec<String> = self
            .list_accounts(None)
            .await?
            .into_iter()
            .filter(Account::is_open)
            .map(|a| a.currency)
            .collect();
        currencies.sort();
        currencies.dedup();
        Ok(currencies)
    }

    pub async fn list_transactions(
        &self,
        account_id: &str,
        page: PageRequest,
    ) -> Result<Paginated<Transaction>, ApiError> {
        let request = ApiRequest::get(format!("/accounts/{}/transactions", account_id))
            .query("page", page.page)
            .query("pageSize", page.page_size);
        self.client.send_json(request).await
    }

    pub async fn deposit(
        &self,
        account_id: &str,
        amount: MinorUnits,
        idempotency_key: Uuid,
        otp_code: Option<&str>,
    ) -> Result<MoneyMovement, ApiError> {
        let request = ApiRequest::post(format!("/accounts/{}/deposits", account_id))
            .header(IDEMPOTENCY_KEY, &idempotency_key.to_string())?
            .json(&AmountRequest {
                amount_minor: amount,
                otp_code,
            })?;
        self.client.send_json(request).await
    }

    pub async fn withdraw(
        &self,
        account_id: &str,
        amount: MinorUnits,
        idempotency_key: Uuid,
        otp_code: Option<&str>,
    ) -> Result<MoneyMovement, ApiError> {
        let request = ApiRequest::post(format!("/accounts/{}/withdrawals", account_id))
            .header(IDEMPOTENCY_KEY, &idempotency_key.to_string())?
            .json(&AmountRequest {
                amount_minor: amount,
                otp_code,
            })?;
        self.client.send_json(request).await
    }

    /// The rate is only forwarded together with its timestamp
    pub async fn convert(
        &self,
        account_id: &str,
        to_currency: &str,
        amount: MinorUnits,
        quote: Option<RateQuote>,
        idempotency_key: Uuid,
        otp_code: Option<&str>,
    ) -> Result<MoneyMovement, ApiError> {
        let request = ApiRequest::post(format!("/accounts/{}/convert", account_id))
            .header(IDEMPOTENCY_KEY, &idempotency_key.to_string())?
            .json(&ConvertRequest {
                to_currency,
                amount_minor: amount,
                rate: quote.map(|q| q.rate),
                rate_timestamp: quote.map(|q| q.as_of),
                otp_code,
            })?;
        self.client.send_json(request).await
    }

    pub async fn close_account(
        &self,
        account_id: &str,
        otp_code: Option<&str>,
    ) -> Result<ClosedAccount, ApiError> {
        let request = ApiRequest::delete(format!("/accounts/{}", account_id)).json(
            &CloseAccountRequest {
                otp_code: otp_code.unwrap_or(""),
            },
        )?;
        let envelope: ClosedAccountEnvelope = self.client.send_json(request).await?;
        info!(account_id = %envelope.account.id, status = %envelope.account.status, "Account closed");
        Ok(envelope.account)
    }

    /// 提交已确认的资金操作
    pub async fn confirm(
        &self,
        action: &PendingAction,
        otp_code: Option<&str>,
    ) -> Result<ActionOutcome, ApiError> {
        let otp_code = otp_code.map(str::trim).filter(|c| !c.is_empty());

        let outcome = match action {
            PendingAction::Deposit {
                account_id,
                amount,
                idempotency_key,
            } => ActionOutcome::Moved(
                self.deposit(account_id, *amount, *idempotency_key, otp_code)
                    .await?,
            ),
            PendingAction::Withdraw {
                account_id,
                amount,
                idempotency_key,
            } => ActionOutcome::Moved(
                self.withdraw(account_id, *amount, *idempotency_key, otp_code)
                    .await?,
            ),
            PendingAction::Convert {
                account_id,
                to_currency,
                amount,
                quote,
                idempotency_key,
            } => ActionOutcome::Moved(
                self.convert(
                    account_id,
                    to_currency,
                    *amount,
                    *quote,
                    *idempotency_key,
                    otp_code,
                )
                .await?,
            ),
            PendingAction::Close { account_id } => {
                ActionOutcome::Closed(self.close_account(account_id, otp_code).await?)
            }
        };

        info!(kind = action.kind(), account_id = %action.account_id(), "Action confirmed");
        Ok(outcome)
    }
}
