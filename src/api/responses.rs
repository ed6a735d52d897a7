//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::TimerError,
    timer::{Scope, TimerStatus, WorkingSchedule},
};

/// Body of POST /scopes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScopeRequest {
    pub name: String,
    pub timer_total_hours: f64,
}

/// Body of PUT /scopes/:id/timer/duration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationRequest {
    pub timer_total_hours: f64,
}

/// A scope as seen at `server_time`.
///
/// `server_time` lets a client measure its clock offset; `remaining_seconds`
/// is the countdown value at that instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeView {
    #[serde(flatten)]
    pub scope: Scope,
    pub status: TimerStatus,
    pub remaining_seconds: u64,
    pub working_now: bool,
    pub server_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_fault: Option<String>,
}

impl ScopeView {
    /// Evaluate `scope` at `server_time`. A corrupted running timer is shown
    /// frozen, with the fault attached.
    pub fn observe(scope: Scope, schedule: &WorkingSchedule, server_time: DateTime<Utc>) -> Self {
        let (remaining_seconds, timer_fault) = match scope.current_remaining(schedule, server_time) {
            Ok(remaining) => (remaining, None),
            Err(e) => {
                tracing::warn!("Scope {}: {}", scope.id, e);
                let frozen = match e {
                    TimerError::StateCorrupted { frozen_seconds } => frozen_seconds,
                    _ => scope.current_remaining_seconds,
                };
                (frozen, Some(e.to_string()))
            }
        };

        Self {
            status: scope.status(),
            working_now: schedule.is_working_moment(server_time),
            scope,
            remaining_seconds,
            server_time,
            timer_fault,
        }
    }
}

/// API response structure for mutating endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub scope: ScopeView,
}

impl ApiResponse {
    pub fn ok(message: String, scope: ScopeView) -> Self {
        Self {
            status: "ok".to_string(),
            message,
            timestamp: scope.server_time,
            scope,
        }
    }
}

/// GET /scopes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeListResponse {
    pub server_time: DateTime<Utc>,
    pub scopes: Vec<ScopeView>,
}

/// Server status with schedule information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub scope_count: usize,
    pub running_count: usize,
    pub schedule: String,
    pub working_now: bool,
    pub server_time: DateTime<Utc>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
    /// Set while the data file is behind the in-memory table
    pub persistence_error: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
