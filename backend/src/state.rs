use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    services::{ActivityLogService, OtpStore},
};

/// Shared services handed to request handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    pub activity_logs: ActivityLogService,
    pub otp: Arc<OtpStore>,
}

impl AppState {
    /// Wires the services over `pool`. Starts the OTP sweeper, so call this
    /// from inside the tokio runtime.
    pub fn new(pool: DbPool, config: Config) -> Self {
        let activity_logs = ActivityLogService::new(pool.clone(), &config);
        let otp = OtpStore::from_config(&config);
        Self {
            pool,
            config,
            activity_logs,
            otp,
        }
    }
}
