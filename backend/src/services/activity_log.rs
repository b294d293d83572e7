use chrono_tz::Tz;
use std::sync::Arc;
use validator::Validate;

use crate::config::Config;
use crate::db::connection::DbPool;
use crate::error::AuditError;
use crate::models::activity_log::{
    ActivityLog, ActivityLogQuery, ActivityLogRecord, ActivityLogView, NewActivityLog,
};
use crate::models::actor::{ActorKind, ActorRef};
use crate::repositories::activity_log::{
    ActivityLogFilters, ActivityLogRepository, PgActivityLogRepository,
};
use crate::repositories::actor::{ActorRepository, PgActorRepository};
use crate::types::ActivityLogId;
use crate::utils::{csv::append_csv_row, time};

const FILTER_ALL: &str = "all";

#[derive(Debug, Clone, Copy)]
pub struct ActivityLogSettings {
    pub time_zone: Tz,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl From<&Config> for ActivityLogSettings {
    fn from(config: &Config) -> Self {
        Self {
            time_zone: config.time_zone,
            default_page_size: config.activity_log_page_size,
            max_page_size: config.activity_log_max_page_size,
        }
    }
}

/// Records and reads the audit trail of admin, staff and citizen actions.
///
/// Writes are refused for actors that do not exist or are not active. No
/// method panics or propagates a storage failure past its own return value,
/// so a broken audit path never takes down the operation being audited.
#[derive(Clone)]
pub struct ActivityLogService {
    actors: Arc<dyn ActorRepository>,
    logs: Arc<dyn ActivityLogRepository>,
    settings: ActivityLogSettings,
}

impl ActivityLogService {
    pub fn new(pool: DbPool, config: &Config) -> Self {
        Self::with_repositories(
            Arc::new(PgActorRepository::new(pool.clone())),
            Arc::new(PgActivityLogRepository::new(pool)),
            ActivityLogSettings::from(config),
        )
    }

    pub fn with_repositories(
        actors: Arc<dyn ActorRepository>,
        logs: Arc<dyn ActivityLogRepository>,
        settings: ActivityLogSettings,
    ) -> Self {
        Self {
            actors,
            logs,
            settings,
        }
    }

    /// Validates the payload and the actor, then appends one entry.
    pub async fn log_activity(&self, entry: NewActivityLog) -> Result<ActivityLogId, AuditError> {
        let result = self.try_log_activity(&entry).await;
        match &result {
            Ok(id) => tracing::debug!(
                log_id = %id,
                actor_kind = %entry.actor_kind,
                actor_id = entry.actor_id,
                action = %entry.action,
                "Recorded activity"
            ),
            Err(err) => tracing::warn!(
                error = %err,
                code = err.code(),
                actor_kind = %entry.actor_kind,
                actor_id = entry.actor_id,
                action = %entry.action,
                "Failed to record activity log"
            ),
        }
        result
    }

    async fn try_log_activity(&self, entry: &NewActivityLog) -> Result<ActivityLogId, AuditError> {
        entry.validate()?;
        let kind: ActorKind = entry.actor_kind.parse()?;
        let actor = ActorRef::new(kind, entry.actor_id);

        if !self.validate_actor(kind, entry.actor_id).await {
            return Err(AuditError::ActorUnavailable {
                kind,
                id: entry.actor_id,
            });
        }

        let record = ActivityLogRecord {
            actor,
            action: entry.action.clone(),
            details: entry.details.clone(),
            ip_address: entry.ip_address.clone(),
            user_agent: entry.user_agent.clone(),
        };
        Ok(self.logs.insert(&record).await?)
    }

    /// True iff exactly one active actor row matches. Lookup errors count as
    /// "cannot confirm".
    pub async fn validate_actor(&self, kind: ActorKind, id: i64) -> bool {
        if id < 1 {
            return false;
        }
        match self.actors.count_active(ActorRef::new(kind, id)).await {
            Ok(count) => count == 1,
            Err(err) => {
                tracing::warn!(
                    error = ?err,
                    actor_kind = %kind,
                    actor_id = id,
                    "Failed to validate actor"
                );
                false
            }
        }
    }

    /// One page of enriched entries, most recent first. Invalid filters and
    /// storage failures yield an empty page.
    pub async fn get_activity_logs(&self, query: &ActivityLogQuery) -> Vec<ActivityLogView> {
        let filters = match resolve_filters(query, &self.settings.time_zone) {
            Ok(filters) => filters,
            Err(err) => {
                tracing::warn!(error = %err, ?query, "Rejected activity log filters");
                return Vec::new();
            }
        };
        let (limit, offset) = self.page_window(query);

        match self.logs.list(&filters, limit, offset).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = ?err, ?query, "Failed to read activity logs");
                Vec::new()
            }
        }
    }

    /// Number of entries matching the filters, ignoring paging.
    pub async fn count_activity_logs(&self, query: &ActivityLogQuery) -> Result<i64, AuditError> {
        let filters = resolve_filters(query, &self.settings.time_zone)?;
        Ok(self.logs.count(&filters).await?)
    }

    /// Every entry matching the filters, most recent first, ignoring paging.
    pub async fn export_activity_logs(
        &self,
        query: &ActivityLogQuery,
    ) -> Result<Vec<ActivityLogView>, AuditError> {
        let filters = resolve_filters(query, &self.settings.time_zone)?;
        Ok(self.logs.export(&filters).await?)
    }

    pub async fn fetch_activity_log(
        &self,
        id: ActivityLogId,
    ) -> Result<Option<ActivityLog>, AuditError> {
        Ok(self.logs.fetch(id).await?)
    }

    fn page_window(&self, query: &ActivityLogQuery) -> (i64, i64) {
        let max = self.settings.max_page_size.max(1);
        let limit = if query.limit < 1 {
            self.settings.default_page_size.clamp(1, max)
        } else {
            query.limit.min(max)
        };
        let page = query.page.max(1);
        (limit, (page - 1).saturating_mul(limit))
    }
}

/// Turns dashboard query options into repository filters.
///
/// Dates are calendar days in `tz`; `date_to` is inclusive. A non-blank date
/// that is not `YYYY-MM-DD` fails the whole query, so a bad bound never widens
/// the range.
pub fn resolve_filters(
    query: &ActivityLogQuery,
    tz: &Tz,
) -> Result<ActivityLogFilters, AuditError> {
    let user_type = query.user_type.trim();
    let actor_kind = if user_type.is_empty() || user_type == FILTER_ALL {
        None
    } else {
        Some(user_type.parse::<ActorKind>()?)
    };

    let action = query.action.trim();
    let action = (!action.is_empty() && action != FILTER_ALL).then(|| action.to_string());

    let from = parse_date_filter("dateFrom", &query.date_from)?
        .map(|date| time::start_of_local_day(date, tz));
    let before = parse_date_filter("dateTo", &query.date_to)?
        .map(|date| time::end_of_local_day_exclusive(date, tz));

    Ok(ActivityLogFilters {
        actor_kind,
        action,
        from,
        before,
    })
}

fn parse_date_filter(
    field: &'static str,
    raw: &str,
) -> Result<Option<chrono::NaiveDate>, AuditError> {
    time::parse_iso_date(raw)
        .map_err(|_| AuditError::Validation(vec![format!("{}: invalid_date", field)]))
}

const CSV_HEADER: [&str; 9] = [
    "ID",
    "Created At",
    "User Type",
    "User Name",
    "User Email",
    "Action",
    "Details",
    "IP Address",
    "User Agent",
];

/// Renders entries as CSV with a header row. Times are shown in `tz`.
pub fn activity_logs_csv(rows: &[ActivityLogView], tz: &Tz) -> String {
    let mut buffer = String::new();
    let header: Vec<String> = CSV_HEADER.iter().map(|h| h.to_string()).collect();
    append_csv_row(&mut buffer, &header);

    for row in rows {
        append_csv_row(
            &mut buffer,
            &[
                row.id.to_string(),
                row.created_at
                    .with_timezone(tz)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                row.actor_kind.clone(),
                row.actor_name.clone().unwrap_or_default(),
                row.actor_email.clone().unwrap_or_default(),
                row.action.clone(),
                row.details.clone().unwrap_or_default(),
                row.ip_address.clone().unwrap_or_default(),
                row.user_agent.clone().unwrap_or_default(),
            ],
        );
    }

    buffer
}
