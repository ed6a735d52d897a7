//! Live countdown background task
//!
//! Refreshes scope snapshots on a slow poll (or when a scope changes) and
//! recomputes every countdown once a second against the offset-adjusted
//! local clock. The result is published on the state's countdown channel.

use std::{collections::BTreeMap, sync::Arc, time::Duration};
use chrono::{DateTime, Utc};
use tokio::{
    sync::{broadcast::error::RecvError, watch},
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    error::TimerError,
    state::{AppState, CountdownBoard, CountdownEntry},
    timer::{LiveCountdown, WorkingSchedule},
};

/// Live views keyed by scope id
pub type LiveViews = BTreeMap<u64, LiveCountdown>;

/// Background task that keeps the countdown board current.
///
/// Runs until `shutdown` changes or its sender is dropped.
pub async fn countdown_display_task(
    state: Arc<AppState>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Starting countdown display task (poll every {}s)", poll_interval.as_secs());

    let mut events = state.scope_event_tx.subscribe();
    let mut poll = interval(poll_interval);
    let mut tick = interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut views = LiveViews::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("Shutdown requested, stopping countdown display task");
                break;
            }

            _ = poll.tick() => {
                refresh_views(&state, &mut views, Utc::now());
            }

            event = events.recv() => match event {
                Ok(event) => {
                    debug!("Scope {} changed ({:?}), refreshing snapshots", event.scope_id, event.change);
                    refresh_views(&state, &mut views, Utc::now());
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Countdown display lagged by {} events, refreshing snapshots", skipped);
                    refresh_views(&state, &mut views, Utc::now());
                }
                Err(RecvError::Closed) => {
                    info!("Scope event channel closed, stopping countdown display task");
                    break;
                }
            },

            _ = tick.tick() => {
                let previous = state.get_countdowns();
                let board = build_board(&views, &state.schedule, Utc::now());
                for id in board.newly_expired(&previous) {
                    if let Some(entry) = board.entries.get(&id) {
                        info!("Scope {} '{}' countdown reached zero", id, entry.name);
                    }
                }
                state.publish_countdowns(board);
            }
        }
    }
}

/// Re-fetch every scope snapshot and re-measure the clock offset
pub fn refresh_views(state: &AppState, views: &mut LiveViews, local_time: DateTime<Utc>) {
    let scopes = match state.scopes.list() {
        Ok(scopes) => scopes,
        Err(e) => {
            error!("Failed to fetch scope snapshots: {}", e);
            return;
        }
    };
    let server_time = state.now();

    views.retain(|id, _| scopes.iter().any(|scope| scope.id == *id));
    for scope in scopes {
        match views.get_mut(&scope.id) {
            Some(view) => view.refresh(scope, server_time, local_time),
            None => {
                views.insert(scope.id, LiveCountdown::new(scope, server_time, local_time));
            }
        }
    }
}

/// Compute one tick of the board from the current views
pub fn build_board(views: &LiveViews, schedule: &WorkingSchedule, local_now: DateTime<Utc>) -> CountdownBoard {
    let mut board = CountdownBoard::new();

    for (id, view) in views {
        let snapshot = view.snapshot();
        let (remaining_seconds, fault) = match view.tick(schedule, local_now) {
            Ok(remaining) => (remaining, None),
            Err(e @ TimerError::StateCorrupted { frozen_seconds }) => {
                debug!("Scope {} countdown frozen: {}", id, e);
                (frozen_seconds, Some(e.to_string()))
            }
            Err(e) => {
                debug!("Scope {} countdown unavailable: {}", id, e);
                (snapshot.current_remaining_seconds, Some(e.to_string()))
            }
        };

        board.entries.insert(*id, CountdownEntry {
            name: snapshot.name.clone(),
            remaining_seconds,
            running: snapshot.is_timer_running,
            fault,
        });
    }

    // Any view carries the same offset; without views the local clock stands in.
    let adjusted = views
        .values()
        .next()
        .map_or(local_now, |view| view.clock().adjusted_now(local_now));
    board.working_now = schedule.is_working_moment(adjusted);
    board.updated_at = Some(adjusted);
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{state::Clock, timer::TimerCommand};
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn monday_10am() -> DateTime<Utc> {
        WorkingSchedule::default()
            .offset()
            .with_ymd_and_hms(2026, 10, 12, 10, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn pinned_state() -> AppState {
        let clock: Clock = Arc::new(monday_10am);
        AppState::new(0, "127.0.0.1".to_string(), WorkingSchedule::default()).with_clock(clock)
    }

    #[tokio::test]
    async fn board_extrapolates_from_server_time() {
        let state = pinned_state();
        let scope = state.create_scope("Mini Project 2026", 1.0).await.unwrap();
        state.apply_timer(scope.id, TimerCommand::Start).await.unwrap();

        // The observer's own clock is a day behind the server.
        let local = monday_10am() - ChronoDuration::days(1);
        let mut views = LiveViews::new();
        refresh_views(&state, &mut views, local);

        let board = build_board(&views, &state.schedule, local + ChronoDuration::seconds(90));
        let entry = &board.entries[&scope.id];
        assert_eq!(entry.remaining_seconds, 3_600 - 90);
        assert!(entry.running);
        assert!(board.working_now);
        assert_eq!(board.updated_at, Some(monday_10am() + ChronoDuration::seconds(90)));
    }

    #[tokio::test]
    async fn deleted_scopes_leave_the_board() {
        let state = pinned_state();
        let keep = state.create_scope("Keep", 1.0).await.unwrap();
        let gone = state.create_scope("Gone", 1.0).await.unwrap();

        let mut views = LiveViews::new();
        refresh_views(&state, &mut views, monday_10am());
        assert_eq!(views.len(), 2);

        state.delete_scope(gone.id).await.unwrap();
        refresh_views(&state, &mut views, monday_10am());

        let board = build_board(&views, &state.schedule, monday_10am());
        assert!(board.entries.contains_key(&keep.id));
        assert!(!board.entries.contains_key(&gone.id));
    }

    #[tokio::test]
    async fn corrupted_snapshot_is_frozen_and_flagged() {
        let mut scope = crate::timer::Scope::new(5, "Broken", 1.0, monday_10am()).unwrap();
        scope.is_timer_running = true;
        scope.timer_last_updated = None;

        let mut views = LiveViews::new();
        views.insert(5, LiveCountdown::new(scope, monday_10am(), monday_10am()));

        let board = build_board(&views, &WorkingSchedule::default(), monday_10am());
        let entry = &board.entries[&5];
        assert_eq!(entry.remaining_seconds, 3_600);
        assert!(entry.fault.is_some());
    }

    #[tokio::test]
    async fn task_publishes_a_board() {
        let state = Arc::new(pinned_state());
        let scope = state.create_scope("Batch", 2.0).await.unwrap();

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(countdown_display_task(Arc::clone(&state), Duration::from_secs(60), shutdown_rx));
        let mut board_rx = state.countdown_tx.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                board_rx.changed().await.unwrap();
                if board_rx.borrow().entries.contains_key(&scope.id) {
                    break;
                }
            }
        })
        .await
        .unwrap();
        handle.abort();

        let board = state.get_countdowns();
        assert_eq!(board.entries[&scope.id].remaining_seconds, 7_200);
    }

    #[tokio::test]
    async fn task_stops_on_shutdown() {
        let state = Arc::new(pinned_state());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(countdown_display_task(Arc::clone(&state), Duration::from_secs(60), shutdown_rx));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("display task did not stop")
            .unwrap();
    }
}
