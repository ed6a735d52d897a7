//! Scope record and countdown state transitions

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WorkingSchedule;
use crate::error::TimerError;

/// Timer actions an administrator can apply to a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerAction {
    Start,
    Pause,
    Reset,
    SetDuration,
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimerAction::Start => "start",
            TimerAction::Pause => "pause",
            TimerAction::Reset => "reset",
            TimerAction::SetDuration => "set duration",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Running,
    Paused,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
        })
    }
}

/// A timer action together with its argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerCommand {
    Start,
    Pause,
    Reset,
    SetDuration(f64),
}

impl TimerCommand {
    pub fn action(&self) -> TimerAction {
        match self {
            TimerCommand::Start => TimerAction::Start,
            TimerCommand::Pause => TimerAction::Pause,
            TimerCommand::Reset => TimerAction::Reset,
            TimerCommand::SetDuration(_) => TimerAction::SetDuration,
        }
    }
}

/// Convert a configured duration in hours to whole seconds
pub fn duration_seconds(hours: f64) -> Result<u64, TimerError> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(TimerError::InvalidDuration(hours));
    }
    Ok((hours * 3600.0).round() as u64)
}

/// A batch and its countdown snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub id: u64,
    pub name: String,
    pub timer_total_hours: f64,
    pub current_remaining_seconds: u64,
    pub is_timer_running: bool,
    #[serde(default)]
    pub timer_last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Scope {
    /// New scope, paused at its full duration
    pub fn new(
        id: u64,
        name: impl Into<String>,
        timer_total_hours: f64,
        now: DateTime<Utc>,
    ) -> Result<Self, TimerError> {
        let full = duration_seconds(timer_total_hours)?;
        Ok(Self {
            id,
            name: name.into(),
            timer_total_hours,
            current_remaining_seconds: full,
            is_timer_running: false,
            timer_last_updated: Some(now),
            created_at: now,
        })
    }

    pub fn status(&self) -> TimerStatus {
        if self.is_timer_running {
            TimerStatus::Running
        } else {
            TimerStatus::Paused
        }
    }

    /// Remaining seconds as observed at `at`.
    ///
    /// A paused timer, or an observation outside working hours, reports the
    /// stored snapshot unchanged. Otherwise the working seconds elapsed since
    /// the last snapshot are subtracted, clamped at zero.
    pub fn current_remaining(
        &self,
        schedule: &WorkingSchedule,
        at: DateTime<Utc>,
    ) -> Result<u64, TimerError> {
        if !self.is_timer_running || !schedule.is_working_moment(at) {
            return Ok(self.current_remaining_seconds);
        }
        self.accrued_remaining(schedule, at)
    }

    /// Snapshot minus every working second since `timer_last_updated`
    fn accrued_remaining(
        &self,
        schedule: &WorkingSchedule,
        at: DateTime<Utc>,
    ) -> Result<u64, TimerError> {
        if !self.is_timer_running {
            return Ok(self.current_remaining_seconds);
        }
        let last_updated = self.timer_last_updated.ok_or(TimerError::StateCorrupted {
            frozen_seconds: self.current_remaining_seconds,
        })?;
        let elapsed = schedule.working_seconds_between(last_updated, at);
        Ok(self.current_remaining_seconds.saturating_sub(elapsed))
    }

    /// Resume from the frozen value
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        self.require(TimerAction::Start, TimerStatus::Paused)?;
        self.is_timer_running = true;
        self.timer_last_updated = Some(now);
        Ok(())
    }

    /// Freeze the countdown, folding in all working time accrued so far
    pub fn pause(&mut self, schedule: &WorkingSchedule, now: DateTime<Utc>) -> Result<(), TimerError> {
        self.require(TimerAction::Pause, TimerStatus::Running)?;
        let remaining = self.accrued_remaining(schedule, now)?;
        self.current_remaining_seconds = remaining;
        self.timer_last_updated = Some(now);
        self.is_timer_running = false;
        Ok(())
    }

    /// Back to the full configured duration, paused
    pub fn reset(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        let full = duration_seconds(self.timer_total_hours)?;
        self.current_remaining_seconds = full;
        self.timer_last_updated = Some(now);
        self.is_timer_running = false;
        Ok(())
    }

    /// Change the configured total. Takes effect on the next reset.
    pub fn set_duration(&mut self, timer_total_hours: f64) -> Result<(), TimerError> {
        duration_seconds(timer_total_hours)?;
        self.timer_total_hours = timer_total_hours;
        Ok(())
    }

    pub fn apply(
        &mut self,
        command: TimerCommand,
        schedule: &WorkingSchedule,
        now: DateTime<Utc>,
    ) -> Result<(), TimerError> {
        match command {
            TimerCommand::Start => self.start(now),
            TimerCommand::Pause => self.pause(schedule, now),
            TimerCommand::Reset => self.reset(now),
            TimerCommand::SetDuration(hours) => self.set_duration(hours),
        }
    }

    fn require(&self, action: TimerAction, expected: TimerStatus) -> Result<(), TimerError> {
        let state = self.status();
        if state != expected {
            return Err(TimerError::InvalidTransition { action, state });
        }
        Ok(())
    }
}
