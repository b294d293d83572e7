//! Read-only lookups against the three actor tables.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::connection::DbPool;
use crate::models::actor::ActorRef;

/// Repository trait for actor existence checks.
///
/// Use `MockActorRepository` in tests to mock the behavior.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActorRepository: Send + Sync {
    /// Number of rows matching the actor's id that are active according to
    /// that actor table's own status convention.
    async fn count_active(&self, actor: ActorRef) -> Result<i64, sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct PgActorRepository {
    pool: DbPool,
}

impl PgActorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActorRepository for PgActorRepository {
    async fn count_active(&self, actor: ActorRef) -> Result<i64, sqlx::Error> {
        count_active_actor(&self.pool, actor).await
    }
}

pub async fn count_active_actor(pool: &PgPool, actor: ActorRef) -> Result<i64, sqlx::Error> {
    let query = active_actor_count_query(actor);
    sqlx::query_scalar::<_, i64>(&query)
        .bind(actor.id())
        .fetch_one(pool)
        .await
}

fn active_actor_count_query(actor: ActorRef) -> String {
    let table = actor.kind().table();
    format!(
        "SELECT COUNT(*) FROM {} WHERE id = $1 AND {}",
        table.table, table.active_predicate
    )
}
