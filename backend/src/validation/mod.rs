//! Validation rules for activity log payloads.

pub mod rules;
