//! Restaurant Closure Model

use super::text_enum;
use serde::{Deserialize, Serialize};

/// Why ordering is currently blocked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClosureReason {
    Manual,
    Scheduled,
    None,
}

text_enum!(ClosureReason, "closure reason", {
    Manual => "manual",
    Scheduled => "scheduled",
    None => "none",
});

/// Evaluated open/closed state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClosureStatus {
    pub is_closed: bool,
    pub reason: ClosureReason,
    pub message: Option<String>,
    /// RFC 3339 end of the active scheduled closure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_end: Option<String>,
}

impl ClosureStatus {
    pub fn open() -> Self {
        Self {
            is_closed: false,
            reason: ClosureReason::None,
            message: None,
            scheduled_end: None,
        }
    }
}

/// Raw closure flags as stored, plus the evaluated status (admin view)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClosureSettings {
    pub manually_closed: bool,
    pub scheduled_start: Option<String>,
    pub scheduled_end: Option<String>,
    pub status: ClosureStatus,
}

/// Toggle manual closure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualClosureUpdate {
    pub is_closed: bool,
}

/// Set a scheduled closure window (RFC 3339 bounds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledClosureUpdate {
    pub start: String,
    pub end: String,
}
