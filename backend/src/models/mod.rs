//! Data models for the activity log and its actors.

pub mod activity_log;
pub mod actor;
