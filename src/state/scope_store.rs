//! Authoritative scope records with per-scope serialized writes

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, RwLock,
    },
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    timer::{duration_seconds, Scope, TimerCommand, WorkingSchedule},
};

/// In-memory scope table.
///
/// The outer lock only guards membership. Each scope has its own mutex, so
/// timer actions on one scope are serialized without blocking the others.
#[derive(Debug)]
pub struct ScopeStore {
    scopes: RwLock<BTreeMap<u64, Arc<Mutex<Scope>>>>,
    next_id: AtomicU64,
}

impl ScopeStore {
    pub fn new() -> Self {
        Self::from_scopes(Vec::new())
    }

    /// Seed the store with previously persisted records
    pub fn from_scopes(scopes: Vec<Scope>) -> Self {
        let next_id = scopes.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let table = scopes
            .into_iter()
            .map(|scope| (scope.id, Arc::new(Mutex::new(scope))))
            .collect();

        Self {
            scopes: RwLock::new(table),
            next_id: AtomicU64::new(next_id),
        }
    }

    pub fn create(&self, name: &str, timer_total_hours: f64, now: DateTime<Utc>) -> AppResult<Scope> {
        // Rejected creates must not consume an id.
        duration_seconds(timer_total_hours)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let scope = Scope::new(id, name, timer_total_hours, now)?;

        let mut scopes = self.scopes.write()
            .map_err(|e| AppError::Internal(format!("Failed to lock scope table: {}", e)))?;
        scopes.insert(id, Arc::new(Mutex::new(scope.clone())));

        debug!("Created scope {} ({})", id, scope.name);
        Ok(scope)
    }

    /// Snapshot of one scope
    pub fn get(&self, id: u64) -> AppResult<Scope> {
        let entry = self.entry(id)?;
        let scope = entry.lock()
            .map_err(|e| AppError::Internal(format!("Failed to lock scope {}: {}", id, e)))?;
        Ok(scope.clone())
    }

    /// Snapshots of every scope, ordered by id
    pub fn list(&self) -> AppResult<Vec<Scope>> {
        let entries: Vec<Arc<Mutex<Scope>>> = {
            let scopes = self.scopes.read()
                .map_err(|e| AppError::Internal(format!("Failed to lock scope table: {}", e)))?;
            scopes.values().cloned().collect()
        };

        entries
            .iter()
            .map(|entry| {
                entry.lock()
                    .map(|scope| scope.clone())
                    .map_err(|e| AppError::Internal(format!("Failed to lock scope: {}", e)))
            })
            .collect()
    }

    pub fn remove(&self, id: u64) -> AppResult<Scope> {
        let entry = {
            let mut scopes = self.scopes.write()
                .map_err(|e| AppError::Internal(format!("Failed to lock scope table: {}", e)))?;
            scopes.remove(&id).ok_or(AppError::NotFound(id))?
        };

        let scope = entry.lock()
            .map_err(|e| AppError::Internal(format!("Failed to lock scope {}: {}", id, e)))?;
        Ok(scope.clone())
    }

    /// Apply a timer command as one read-modify-write.
    ///
    /// `clock` is read only after the scope lock is held, so the stamps of
    /// successive actions on a scope are ordered the same way the actions are.
    pub fn apply<C>(
        &self,
        id: u64,
        command: TimerCommand,
        schedule: &WorkingSchedule,
        clock: C,
    ) -> AppResult<Scope>
    where
        C: FnOnce() -> DateTime<Utc>,
    {
        let entry = self.entry(id)?;
        let mut scope = entry.lock()
            .map_err(|e| AppError::Internal(format!("Failed to lock scope {}: {}", id, e)))?;

        let now = clock();
        scope.apply(command, schedule, now)?;
        Ok(scope.clone())
    }

    pub fn len(&self) -> AppResult<usize> {
        self.scopes.read()
            .map(|scopes| scopes.len())
            .map_err(|e| AppError::Internal(format!("Failed to lock scope table: {}", e)))
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len()? == 0)
    }

    fn entry(&self, id: u64) -> AppResult<Arc<Mutex<Scope>>> {
        let scopes = self.scopes.read()
            .map_err(|e| AppError::Internal(format!("Failed to lock scope table: {}", e)))?;
        scopes.get(&id).cloned().ok_or(AppError::NotFound(id))
    }
}

impl Default for ScopeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::TimerError, timer::TimerStatus};
    use chrono::{Duration, TimeZone};
    use std::thread;

    fn monday_9am() -> DateTime<Utc> {
        WorkingSchedule::default()
            .offset()
            .with_ymd_and_hms(2026, 10, 12, 9, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn ids_continue_after_seeded_records() {
        let seeded = Scope::new(41, "Old batch", 1.0, monday_9am()).unwrap();
        let store = ScopeStore::from_scopes(vec![seeded]);

        let created = store.create("New batch", 2.0, monday_9am()).unwrap();
        assert_eq!(created.id, 42);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn create_rejects_invalid_duration() {
        let store = ScopeStore::new();
        let err = store.create("Broken", -3.0, monday_9am()).unwrap_err();
        assert!(matches!(err, AppError::Timer(TimerError::InvalidDuration(_))));
        assert!(store.is_empty().unwrap());

        let created = store.create("Fixed", 3.0, monday_9am()).unwrap();
        assert_eq!(created.id, 1);
    }

    #[test]
    fn poisoned_table_is_an_error_not_an_empty_store() {
        let store = Arc::new(ScopeStore::new());
        store.create("Batch", 1.0, monday_9am()).unwrap();

        let poisoner = Arc::clone(&store);
        let _ = thread::spawn(move || {
            let _guard = poisoner.scopes.write().unwrap();
            panic!("poison the scope table");
        })
        .join();

        assert!(matches!(store.len(), Err(AppError::Internal(_))));
        assert!(store.is_empty().is_err());
    }

    #[test]
    fn unknown_scope_is_not_found() {
        let store = ScopeStore::new();
        assert!(matches!(store.get(9), Err(AppError::NotFound(9))));
        assert!(matches!(
            store.apply(9, TimerCommand::Start, &WorkingSchedule::default(), monday_9am),
            Err(AppError::NotFound(9))
        ));
        assert!(matches!(store.remove(9), Err(AppError::NotFound(9))));
    }

    #[test]
    fn apply_stamps_with_the_clock_value() {
        let store = ScopeStore::new();
        let scope = store.create("Batch", 2.0, monday_9am()).unwrap();
        let schedule = WorkingSchedule::default();

        let started = store
            .apply(scope.id, TimerCommand::Start, &schedule, monday_9am)
            .unwrap();
        assert_eq!(started.status(), TimerStatus::Running);

        let paused = store
            .apply(scope.id, TimerCommand::Pause, &schedule, || {
                monday_9am() + Duration::minutes(15)
            })
            .unwrap();
        assert_eq!(paused.current_remaining_seconds, 7_200 - 900);
        assert_eq!(store.get(scope.id).unwrap(), paused);
    }

    #[test]
    fn concurrent_pauses_freeze_exactly_once() {
        let store = Arc::new(ScopeStore::new());
        let schedule = WorkingSchedule::default();
        let scope = store.create("Batch", 2.0, monday_9am()).unwrap();
        store
            .apply(scope.id, TimerCommand::Start, &schedule, monday_9am)
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .apply(scope.id, TimerCommand::Pause, &schedule, || {
                            monday_9am() + Duration::minutes(10 + i)
                        })
                        .is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);

        let frozen = store.get(scope.id).unwrap();
        assert!(!frozen.is_timer_running);
        assert!(frozen.current_remaining_seconds <= 7_200 - 600);
        assert!(frozen.current_remaining_seconds >= 7_200 - 17 * 60);
    }

    #[test]
    fn remove_returns_the_last_snapshot() {
        let store = ScopeStore::new();
        let scope = store.create("Batch", 1.0, monday_9am()).unwrap();
        assert_eq!(store.remove(scope.id).unwrap(), scope);
        assert!(store.list().unwrap().is_empty());
    }
}
