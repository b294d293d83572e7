//! Append and query access to `activity_logs`.
//!
//! Reads join the three actor tables so every row comes back with the
//! actor's display name and email.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::connection::DbPool;
use crate::models::activity_log::{ActivityLog, ActivityLogRecord, ActivityLogView};
use crate::models::actor::{ActorKind, ActorTable};
use crate::types::ActivityLogId;

const TABLE_NAME: &str = "activity_logs";
const SELECT_COLUMNS: &str =
    "id, admin_id, staff_id, user_id, action, details, ip_address, user_agent, created_at";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityLogFilters {
    pub actor_kind: Option<ActorKind>,
    /// Case-insensitive substring of `action`.
    pub action: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub before: Option<DateTime<Utc>>,
}

/// Repository trait for activity log storage.
///
/// Use `MockActivityLogRepository` in tests to mock the behavior.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    /// Appends one entry and returns its database-assigned id.
    async fn insert(&self, record: &ActivityLogRecord) -> Result<ActivityLogId, sqlx::Error>;

    async fn fetch(&self, id: ActivityLogId) -> Result<Option<ActivityLog>, sqlx::Error>;

    /// One page of enriched entries, most recent first.
    async fn list(
        &self,
        filters: &ActivityLogFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityLogView>, sqlx::Error>;

    /// Every matching enriched entry, most recent first.
    async fn export(&self, filters: &ActivityLogFilters)
        -> Result<Vec<ActivityLogView>, sqlx::Error>;

    async fn count(&self, filters: &ActivityLogFilters) -> Result<i64, sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct PgActivityLogRepository {
    pool: DbPool,
}

impl PgActivityLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLogRepository for PgActivityLogRepository {
    async fn insert(&self, record: &ActivityLogRecord) -> Result<ActivityLogId, sqlx::Error> {
        insert_activity_log(&self.pool, record).await
    }

    async fn fetch(&self, id: ActivityLogId) -> Result<Option<ActivityLog>, sqlx::Error> {
        fetch_activity_log(&self.pool, id).await
    }

    async fn list(
        &self,
        filters: &ActivityLogFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityLogView>, sqlx::Error> {
        query_activity_logs(&self.pool, filters, Some((limit, offset))).await
    }

    async fn export(
        &self,
        filters: &ActivityLogFilters,
    ) -> Result<Vec<ActivityLogView>, sqlx::Error> {
        query_activity_logs(&self.pool, filters, None).await
    }

    async fn count(&self, filters: &ActivityLogFilters) -> Result<i64, sqlx::Error> {
        count_activity_logs(&self.pool, filters).await
    }
}

pub async fn insert_activity_log(
    pool: &PgPool,
    record: &ActivityLogRecord,
) -> Result<ActivityLogId, sqlx::Error> {
    let (admin_id, staff_id, user_id) = record.actor.columns();
    let query = format!(
        "INSERT INTO {} (admin_id, staff_id, user_id, action, details, ip_address, user_agent, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) \
         RETURNING id",
        TABLE_NAME
    );
    sqlx::query_scalar::<_, ActivityLogId>(&query)
        .bind(admin_id)
        .bind(staff_id)
        .bind(user_id)
        .bind(&record.action)
        .bind(&record.details)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .fetch_one(pool)
        .await
}

pub async fn fetch_activity_log(
    pool: &PgPool,
    id: ActivityLogId,
) -> Result<Option<ActivityLog>, sqlx::Error> {
    let query = format!("SELECT {} FROM {} WHERE id = $1", SELECT_COLUMNS, TABLE_NAME);
    sqlx::query_as::<_, ActivityLog>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn count_activity_logs(
    pool: &PgPool,
    filters: &ActivityLogFilters,
) -> Result<i64, sqlx::Error> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT COUNT(*) FROM {} l", TABLE_NAME));
    let mut has_clause = false;
    apply_activity_log_filters(&mut builder, &mut has_clause, filters);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

async fn query_activity_logs(
    pool: &PgPool,
    filters: &ActivityLogFilters,
    pagination: Option<(i64, i64)>,
) -> Result<Vec<ActivityLogView>, sqlx::Error> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(enriched_select());
    let mut has_clause = false;
    apply_activity_log_filters(&mut builder, &mut has_clause, filters);
    builder.push(" ORDER BY l.created_at DESC, l.id DESC");

    if let Some((limit, offset)) = pagination {
        builder
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
    }

    builder
        .build_query_as::<ActivityLogView>()
        .fetch_all(pool)
        .await
}

/// `SELECT ... FROM activity_logs l LEFT JOIN <actor tables>` producing the
/// columns of [`ActivityLogView`].
fn enriched_select() -> String {
    let tables: Vec<_> = ActorKind::ALL
        .into_iter()
        .map(|kind| (kind, kind.table()))
        .collect();

    let mut kind_case = String::from("CASE");
    for (kind, table) in &tables {
        kind_case.push_str(&format!(
            " WHEN {}.id IS NOT NULL THEN '{}'",
            table.alias,
            kind.as_str()
        ));
    }
    kind_case.push_str(" ELSE 'unknown' END");

    let actor_id = coalesce(&tables, |t| format!("l.{}", t.reference_column));
    let actor_name = coalesce(&tables, |t| format!("{}.{}", t.alias, t.name_column));
    let actor_email = coalesce(&tables, |t| format!("{}.email", t.alias));

    let joins: String = tables
        .iter()
        .map(|(_, table)| {
            format!(
                " LEFT JOIN {} {} ON l.{} = {}.id",
                table.table, table.alias, table.reference_column, table.alias
            )
        })
        .collect();

    format!(
        "SELECT l.id, {} AS actor_kind, {} AS actor_id, {} AS actor_name, {} AS actor_email, \
         l.action, l.details, l.ip_address, l.user_agent, l.created_at \
         FROM {} l{}",
        kind_case, actor_id, actor_name, actor_email, TABLE_NAME, joins
    )
}

fn coalesce(
    tables: &[(ActorKind, &'static ActorTable)],
    column: impl Fn(&ActorTable) -> String,
) -> String {
    let parts: Vec<String> = tables.iter().map(|(_, table)| column(table)).collect();
    format!("COALESCE({})", parts.join(", "))
}

fn apply_activity_log_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    has_clause: &mut bool,
    filters: &ActivityLogFilters,
) {
    if let Some(kind) = filters.actor_kind {
        push_clause(builder, has_clause);
        builder.push(format!("l.{} IS NOT NULL", kind.table().reference_column));
    }
    if let Some(action) = filters.action.as_ref() {
        push_clause(builder, has_clause);
        builder
            .push("l.action ILIKE ")
            .push_bind(substring_pattern(action));
    }
    if let Some(from) = filters.from {
        push_clause(builder, has_clause);
        builder.push("l.created_at >= ").push_bind(from);
    }
    if let Some(before) = filters.before {
        push_clause(builder, has_clause);
        builder.push("l.created_at < ").push_bind(before);
    }
}

fn push_clause(builder: &mut QueryBuilder<'_, Postgres>, has_clause: &mut bool) {
    if *has_clause {
        builder.push(" AND ");
    } else {
        builder.push(" WHERE ");
        *has_clause = true;
    }
}

/// Wraps `value` in `%...%`, escaping LIKE metacharacters so they match
/// literally.
fn substring_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
