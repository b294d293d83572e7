use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;

use crate::config::Config;

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(config: &Config) -> anyhow::Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(Arc::new(pool))
}
