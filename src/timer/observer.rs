//! Observer-side clock-offset compensation
//!
//! A display that refreshes its snapshot rarely but ticks every second must
//! not compare its own clock against the server's `timer_last_updated`. The
//! offset between the two is measured once per snapshot and reapplied on
//! every tick.

use chrono::{DateTime, Duration, Utc};

use super::{Scope, WorkingSchedule};
use crate::error::TimerError;

/// Offset between the authoritative clock and the local one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverClock {
    offset: Duration,
}

impl ObserverClock {
    /// Measure `server_time - local_time` at the moment of a fetch
    pub fn measure(server_time: DateTime<Utc>, local_time: DateTime<Utc>) -> Self {
        Self {
            offset: server_time - local_time,
        }
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn adjusted_now(&self, local_now: DateTime<Utc>) -> DateTime<Utc> {
        local_now + self.offset
    }
}

/// Latest snapshot of one scope plus the clock it was fetched against
#[derive(Debug, Clone)]
pub struct LiveCountdown {
    snapshot: Scope,
    clock: ObserverClock,
}

impl LiveCountdown {
    pub fn new(snapshot: Scope, server_time: DateTime<Utc>, local_time: DateTime<Utc>) -> Self {
        Self {
            snapshot,
            clock: ObserverClock::measure(server_time, local_time),
        }
    }

    /// Replace the snapshot and re-measure the offset
    pub fn refresh(&mut self, snapshot: Scope, server_time: DateTime<Utc>, local_time: DateTime<Utc>) {
        self.snapshot = snapshot;
        self.clock = ObserverClock::measure(server_time, local_time);
    }

    pub fn snapshot(&self) -> &Scope {
        &self.snapshot
    }

    pub fn clock(&self) -> ObserverClock {
        self.clock
    }

    /// Remaining seconds for a local tick at `local_now`
    pub fn tick(&self, schedule: &WorkingSchedule, local_now: DateTime<Utc>) -> Result<u64, TimerError> {
        self.snapshot
            .current_remaining(schedule, self.clock.adjusted_now(local_now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule() -> WorkingSchedule {
        WorkingSchedule::default()
    }

    fn server_monday_9am() -> DateTime<Utc> {
        schedule()
            .offset()
            .with_ymd_and_hms(2026, 10, 12, 9, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn running_scope(started: DateTime<Utc>) -> Scope {
        let mut scope = Scope::new(7, "Final Year 2026", 1.0, started).unwrap();
        scope.start(started).unwrap();
        scope
    }

    #[test]
    fn offset_is_server_minus_local() {
        let server = server_monday_9am();
        let local = server - Duration::seconds(90);
        let clock = ObserverClock::measure(server, local);

        assert_eq!(clock.offset(), Duration::seconds(90));
        assert_eq!(clock.adjusted_now(local), server);
    }

    #[test]
    fn ticks_use_server_time_even_when_local_clock_lags() {
        let server = server_monday_9am();
        let scope = running_scope(server);
        // Local clock is five minutes behind the server.
        let local = server - Duration::minutes(5);
        let live = LiveCountdown::new(scope, server, local);

        assert_eq!(live.tick(&schedule(), local).unwrap(), 3_600);
        assert_eq!(
            live.tick(&schedule(), local + Duration::seconds(60)).unwrap(),
            3_540
        );
    }

    #[test]
    fn offset_is_only_remeasured_on_refresh() {
        let server = server_monday_9am();
        let scope = running_scope(server);
        let mut live = LiveCountdown::new(scope.clone(), server, server + Duration::seconds(30));
        let first = live.clock();

        let _ = live.tick(&schedule(), server + Duration::minutes(2));
        assert_eq!(live.clock(), first);

        let refetch = server + Duration::minutes(1);
        live.refresh(scope, refetch, refetch);
        assert_eq!(live.clock().offset(), Duration::zero());
    }
}
