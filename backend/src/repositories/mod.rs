pub mod activity_log;
pub mod actor;

pub use activity_log::{ActivityLogFilters, ActivityLogRepository, PgActivityLogRepository};
pub use actor::{ActorRepository, PgActorRepository};
