use crate::error::Result;
use crate::model::admin::{AuditLogPage, AuditLogQuery, RoleUpdate, Settings, Stats};
use crate::model::{AuditLog, Envelope, Identity, Role, UserId};

use super::{ApiClient, ApiRequest};

/// `/admin` endpoints. The server refuses all of them to anyone but an admin.
pub struct AdminApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AdminApi<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn users(&self) -> Result<Vec<Identity>> {
        self.client.data(ApiRequest::get("/admin/users")).await
    }

    pub async fn verify_user(&self, id: &UserId) -> Result<Identity> {
        self.user_action(id, "verify").await
    }

    pub async fn suspend_user(&self, id: &UserId) -> Result<Identity> {
        self.user_action(id, "suspend").await
    }

    pub async fn activate_user(&self, id: &UserId) -> Result<Identity> {
        self.user_action(id, "activate").await
    }

    async fn user_action(&self, id: &UserId, action: &str) -> Result<Identity> {
        self.client
            .data(ApiRequest::put("/admin/users").segment(id).segment(action))
            .await
    }

    pub async fn update_role(&self, id: &UserId, role: Role) -> Result<Identity> {
        let request =
            ApiRequest::put("/admin/users").segment(id).segment("role").json(&RoleUpdate { role })?;
        self.client.data(request).await
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.client.data(ApiRequest::get("/admin/stats")).await
    }

    pub async fn audit_logs(&self, query: &AuditLogQuery) -> Result<AuditLogPage> {
        let request = ApiRequest::get("/admin/audit-logs").query(query.to_pairs());
        let envelope: Envelope<Vec<AuditLog>> = self.client.send(request).await?;
        Ok(AuditLogPage {
            logs: envelope.data,
            page: query.page,
            pages: envelope.pages.unwrap_or(1),
        })
    }

    pub async fn settings(&self) -> Result<Settings> {
        self.client.data(ApiRequest::get("/admin/settings")).await
    }

    pub async fn update_settings(&self, settings: &Settings) -> Result<Settings> {
        let request = ApiRequest::put("/admin/settings").json(settings)?;
        self.client.data(request).await
    }
}
