//! 管理服务：用户查询、TOTP 重置、审计日志、对账

use std::sync::Arc;
use tracing::info;

use crate::{
    client::{ApiClient, ApiRequest},
    error::ApiError,
    models::{
        AuditLog, AuditQuery, PageRequest, Paginated, ReconcileResult, SuccessResponse, User,
        UserEnvelope,
    },
};

pub struct AdminService {
    client: Arc<ApiClient>,
}

impl AdminService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list_users(
        &self,
        page: PageRequest,
        search: Option<&str>,
    ) -> Result<Paginated<User>, ApiError> {
        let request = ApiRequest::get("/admin/users")
            .query("page", page.page)
            .query("pageSize", page.page_size)
            .query_opt("search", search.filter(|s| !s.is_empty()));
        self.client.send_json(request).await
    }

    pub async fn user_detail(&self, user_id: &str) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self
            .client
            .send_json(ApiRequest::get(format!("/admin/users/{}", user_id)))
            .await?;
        Ok(envelope.user)
    }

    pub async fn reset_user_totp(&self, user_id: &str) -> Result<bool, ApiError> {
        let request = ApiRequest::post(format!("/admin/users/{}/totp/reset", user_id))
            .json(&serde_json::json!({}))?;
        let response: SuccessResponse = self.client.send_json(request).await?;
        info!(user_id = %user_id, "TOTP reset requested");
        Ok(response.success)
    }

    pub async fn list_audit(&self, query: &AuditQuery) -> Result<Paginated<AuditLog>, ApiError> {
        let request = query
            .to_query()
            .into_iter()
            .fold(ApiRequest::get("/admin/audit"), |req, (k, v)| req.query(k, v));
        self.client.send_json(request).await
    }

    /// 触发一次对账
    pub async fn reconcile_run(&self) -> Result<ReconcileResult, ApiError> {
        let request = ApiRequest::post("/admin/reconcile/run").json(&serde_json::json!({}))?;
        let result: ReconcileResult = self.client.send_json(request).await?;
        info!(
            checked = result.checked,
            mismatches = result.mismatches.len(),
            "Reconciliation finished"
        );
        Ok(result)
    }

    pub async fn reconcile_status(&self) -> Result<ReconcileResult, ApiError> {
        self.client
            .send_json(ApiRequest::get("/admin/reconcile/status"))
            .await
    }
}
