use thiserror::Error;

use crate::models::actor::ActorKind;

/// Failures reported by the activity-log subsystem.
///
/// None of these are fatal: callers log them and carry on with the operation
/// they were auditing.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("unknown actor kind: {0}")]
    UnknownActorKind(String),
    #[error("{kind} {id} does not exist or is not active")]
    ActorUnavailable { kind: ActorKind, id: i64 },
    #[error("activity log storage failed: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl AuditError {
    /// Stable code suitable for structured logs and API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuditError::Validation(_) => "VALIDATION_ERROR",
            AuditError::UnknownActorKind(_) => "UNKNOWN_ACTOR_KIND",
            AuditError::ActorUnavailable { .. } => "ACTOR_UNAVAILABLE",
            AuditError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for AuditError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let code = e.code.as_ref();
                    format!("{}: {}", field, code)
                })
            })
            .collect();
        messages.sort();
        AuditError::Validation(messages)
    }
}
