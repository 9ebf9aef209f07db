//! Staff-facing models: reconciliation and audit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MinorUnits, PageRequest};

/// Ledger/balance mismatch found by reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileMismatch {
    pub account_id: String,
    pub currency: String,
    pub balance_minor: MinorUnits,
    pub computed_minor: MinorUnits,
    pub delta_minor: MinorUnits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileResult {
    #[serde(default)]
    pub mismatches: Vec<ReconcileMismatch>,
    pub checked: u64,
}

impl ReconcileResult {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Audit trail entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub actor_id: String,
    pub action: String,
    pub resource: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Audit log filter
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

impl AuditQuery {
    /// 转换为查询参数，未设置的过滤条件不发送
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(actor_id) = &self.actor_id {
            params.push(("actorId", actor_id.clone()));
        }
        if let Some(action) = &self.action {
            params.push(("action", action.clone()));
        }
        if let Some(from) = self.from {
            params.push(("from", from.to_rfc3339()));
        }
        if let Some(to) = self.to {
            params.push(("to", to.to_rfc3339()));
        }
        params.push(("page", self.page.page.to_string()));
        params.push(("pageSize", self.page.page_size.to_string()));
        params
    }
}
