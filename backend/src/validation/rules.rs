//! Common validation rules shared across request payloads.

use validator::ValidationError;

use crate::models::actor::ActorKind;

/// Accepts only the boundary spellings `admin`, `staff` and `user`.
pub fn validate_actor_kind(kind: &str) -> Result<(), ValidationError> {
    kind.parse::<ActorKind>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("actor_kind_unknown"))
}

/// Rejects empty and whitespace-only strings.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
