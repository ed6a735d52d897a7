//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

use super::{CountdownBoard, ScopeStore};
use crate::{
    error::{AppError, AppResult},
    services::ScopeFile,
    timer::{Scope, TimerAction, TimerCommand, WorkingSchedule},
};

/// Source of authoritative "now"
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What happened to a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeChange {
    Created,
    Deleted,
    Timer(TimerAction),
}

/// Notification sent after every committed mutation
#[derive(Debug, Clone)]
pub struct ScopeEvent {
    pub scope_id: u64,
    pub change: ScopeChange,
}

/// Main application state: scope records, schedule, and notification channels
pub struct AppState {
    pub scopes: ScopeStore,
    pub schedule: WorkingSchedule,
    clock: Clock,
    /// Optional on-disk snapshot of `scopes`
    pub data_file: Option<ScopeFile>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Mutex<Option<String>>,
    pub last_action_time: Mutex<Option<DateTime<Utc>>>,
    /// Most recent data file write failure, cleared by the next good write
    pub persist_error: Mutex<Option<String>>,
    /// Channel for scope change notifications
    pub scope_event_tx: broadcast::Sender<ScopeEvent>,
    /// Channel for live countdown updates
    pub countdown_tx: watch::Sender<CountdownBoard>,
    /// Keep the receiver alive to prevent channel closure
    pub _countdown_rx: watch::Receiver<CountdownBoard>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("scopes", &self.scopes)
            .field("schedule", &self.schedule)
            .field("data_file", &self.data_file)
            .field("port", &self.port)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create a new AppState with an empty scope table and the system clock
    pub fn new(port: u16, host: String, schedule: WorkingSchedule) -> Self {
        Self::with_scopes(port, host, schedule, ScopeStore::new())
    }

    pub fn with_scopes(port: u16, host: String, schedule: WorkingSchedule, scopes: ScopeStore) -> Self {
        let (scope_event_tx, _) = broadcast::channel(100);
        let (countdown_tx, countdown_rx) = watch::channel(CountdownBoard::new());

        Self {
            scopes,
            schedule,
            clock: Arc::new(Utc::now),
            data_file: None,
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
            persist_error: Mutex::new(None),
            scope_event_tx,
            countdown_tx,
            _countdown_rx: countdown_rx,
        }
    }

    /// Replace the authoritative clock
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_data_file(mut self, data_file: ScopeFile) -> Self {
        self.data_file = Some(data_file);
        self
    }

    /// Current authoritative instant
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Create a scope paused at its full duration
    pub async fn create_scope(&self, name: &str, timer_total_hours: f64) -> AppResult<Scope> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("scope name must not be empty".to_string()));
        }

        let scope = self.scopes.create(name, timer_total_hours, self.now())?;
        info!("Created scope {} '{}' with {}h", scope.id, scope.name, scope.timer_total_hours);

        self.committed("create", scope.id, ScopeChange::Created).await;
        Ok(scope)
    }

    pub async fn delete_scope(&self, id: u64) -> AppResult<Scope> {
        let scope = self.scopes.remove(id)?;
        info!("Deleted scope {} '{}'", scope.id, scope.name);

        self.committed("delete", id, ScopeChange::Deleted).await;
        Ok(scope)
    }

    /// Apply a timer action atomically and persist the result
    pub async fn apply_timer(&self, id: u64, command: TimerCommand) -> AppResult<Scope> {
        let action = command.action();
        let scope = match self.scopes.apply(id, command, &self.schedule, || self.now()) {
            Ok(scope) => scope,
            Err(e) => {
                warn!("Timer {} rejected for scope {}: {}", action, id, e);
                return Err(e);
            }
        };

        info!(
            "Timer {} applied to scope {}: remaining={}s running={}",
            action, id, scope.current_remaining_seconds, scope.is_timer_running
        );

        self.committed(&action.to_string(), id, ScopeChange::Timer(action)).await;
        Ok(scope)
    }

    /// Record, notify, and persist a committed mutation.
    ///
    /// The in-memory table is authoritative once a mutation is applied. A
    /// failed file write is logged and kept for `/status`; the next
    /// successful write carries the whole table and clears it.
    async fn committed(&self, action: &str, scope_id: u64, change: ScopeChange) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(format!("{} scope {}", action, scope_id));
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(self.now());
        }

        // No subscribers is fine; the display task may not be running.
        if self.scope_event_tx.send(ScopeEvent { scope_id, change }).is_err() {
            tracing::debug!("No listeners for scope event on {}", scope_id);
        }

        let result = self.persist().await;
        if let Err(e) = &result {
            error!("Scope {} {} applied but not persisted: {}", scope_id, action, e);
        }
        if let Ok(mut persist_error) = self.persist_error.lock() {
            *persist_error = result.err().map(|e| e.to_string());
        }
    }

    /// Write all scopes to the data file, if one is configured
    pub async fn persist(&self) -> AppResult<()> {
        let Some(file) = &self.data_file else {
            return Ok(());
        };
        file.save_with(|| self.scopes.list()).await
    }

    /// Last data file write failure, if the file is behind memory
    pub fn get_persist_error(&self) -> Option<String> {
        self.persist_error.lock().ok().and_then(|e| e.clone())
    }

    /// Publish a new countdown board
    pub fn publish_countdowns(&self, board: CountdownBoard) {
        self.countdown_tx.send_replace(board);
    }

    pub fn get_countdowns(&self) -> CountdownBoard {
        self.countdown_tx.borrow().clone()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
