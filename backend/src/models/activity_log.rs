//! Activity log rows, the payload used to record one, and the enriched view
//! returned to dashboards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::middleware::client_info::ClientInfo;
use crate::models::actor::ActorRef;
use crate::types::ActivityLogId;
use crate::validation::rules;

/// Database representation of one immutable activity log entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLog {
    pub id: ActivityLogId,
    pub admin_id: Option<i64>,
    pub staff_id: Option<i64>,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    /// The actor this entry belongs to, if the row is well formed.
    pub fn actor(&self) -> Option<ActorRef> {
        ActorRef::from_columns(self.admin_id, self.staff_id, self.user_id)
    }
}

/// A validated entry ready to be written, with its actor already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLogRecord {
    pub actor: ActorRef,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Payload for recording an activity, in the vocabulary callers use.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewActivityLog {
    /// `"admin"`, `"staff"` or `"user"`.
    #[validate(custom(function = "rules::validate_actor_kind"))]
    pub actor_kind: String,
    #[validate(range(min = 1))]
    pub actor_id: i64,
    /// Short snake_case label such as `login` or `incident_assign`.
    #[validate(custom(function = "rules::validate_not_blank"))]
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewActivityLog {
    pub fn new(actor_kind: impl Into<String>, actor_id: i64, action: impl Into<String>) -> Self {
        Self {
            actor_kind: actor_kind.into(),
            actor_id,
            action: action.into(),
            details: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Copies ip address and user agent from the request that triggered the
    /// activity.
    pub fn with_client(mut self, client: &ClientInfo) -> Self {
        self.ip_address = Some(client.ip_address.clone());
        self.user_agent = client.user_agent.clone();
        self
    }
}

/// An activity log entry joined with its actor's identity.
///
/// `actor_kind` is `"unknown"` when none of the references resolve to an
/// actor row; name and email are then absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ActivityLogView {
    pub id: ActivityLogId,
    pub actor_kind: String,
    pub actor_id: Option<i64>,
    pub actor_name: Option<String>,
    pub actor_email: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub const ACTOR_KIND_UNKNOWN: &str = "unknown";

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

fn default_all() -> String {
    "all".to_string()
}

/// Filter and paging options for reading the activity log.
///
/// Field names follow the dashboard's query string (`userType`, `dateFrom`,
/// ...). Empty strings and `"all"` mean no restriction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_all")]
    pub user_type: String,
    #[serde(default = "default_all")]
    pub action: String,
    /// Inclusive `YYYY-MM-DD`.
    #[serde(default)]
    pub date_from: String,
    /// Inclusive `YYYY-MM-DD`.
    #[serde(default)]
    pub date_to: String,
}

impl Default for ActivityLogQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            user_type: default_all(),
            action: default_all(),
            date_from: String::new(),
            date_to: String::new(),
        }
    }
}

impl ActivityLogQuery {
    pub fn for_user_type(user_type: impl Into<String>) -> Self {
        Self {
            user_type: user_type.into(),
            ..Self::default()
        }
    }
}
