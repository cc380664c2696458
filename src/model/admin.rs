use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{reference, LogId, Role, UserId};

/// Dashboard statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub overview: Overview,
    #[serde(default)]
    pub recent_activity: Vec<AuditLog>,
    #[serde(default)]
    pub suspicious_activities: Vec<AuditLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_users: u64,
    #[serde(default)]
    pub verified_users: u64,
    pub total_elections: u64,
    #[serde(default)]
    pub active_elections: u64,
    pub total_votes: u64,
    /// Percentage of verified voters who have voted.
    #[serde(default, deserialize_with = "number_or_string")]
    pub voter_turnout: f64,
}

/// The server formats some percentages as strings (`"42.50"`).
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

/// A single audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LogId>,
    pub action: String,
    /// Absent for system actions.
    #[serde(
        default,
        deserialize_with = "reference::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    /// `vote_cast` -> `vote cast`.
    pub fn action_label(&self) -> String {
        self.action.replace('_', " ")
    }
}

/// Filters for the audit log listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    pub action: Option<String>,
    pub severity: Option<Severity>,
    pub page: u32,
    pub limit: u32,
}

impl Default for AuditLogQuery {
    fn default() -> Self {
        Self {
            action: None,
            severity: None,
            page: 1,
            limit: 50,
        }
    }
}

impl AuditLogQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(action) = self.action.as_ref().filter(|a| !a.is_empty()) {
            pairs.push(("action".to_string(), action.clone()));
        }
        if let Some(severity) = self.severity {
            let severity = match severity {
                Severity::Info => "info",
                Severity::Warning => "warning",
                Severity::Critical => "critical",
            };
            pairs.push(("severity".to_string(), severity.to_string()));
        }
        pairs
    }
}

/// One page of audit logs.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogPage {
    pub logs: Vec<AuditLog>,
    pub page: u32,
    pub pages: u32,
}

/// Platform-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub site_description: String,
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(default = "default_true")]
    pub allow_registration: bool,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default = "default_max_candidates")]
    pub max_candidates_per_election: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_candidates() -> u32 {
    10
}

/// Body of `PUT /admin/users/:id/role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleUpdate {
    pub role: Role,
}
