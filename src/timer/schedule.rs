//! Weekly working-hours schedule
//!
//! Time only accrues Monday through Saturday between 08:45 and 16:20 in a
//! single institution-wide UTC offset. There are no holidays.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, Timelike, Utc,
    Weekday,
};

/// Window opening time, seconds after local midnight (08:45:00)
pub const WINDOW_OPEN_SECS: u32 = 8 * 3600 + 45 * 60;
/// Window closing time, seconds after local midnight (16:20:00, exclusive)
pub const WINDOW_CLOSE_SECS: u32 = 16 * 3600 + 20 * 60;
/// Length of one day's working window (7h35m)
pub const WINDOW_SECS: u32 = WINDOW_CLOSE_SECS - WINDOW_OPEN_SECS;

const WORKING_DAYS_PER_WEEK: i64 = 6;
const WINDOW_MILLIS: i64 = WINDOW_SECS as i64 * 1000;

/// Default institution offset, UTC+05:30
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Fixed weekly working-hours window evaluated in one local offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingSchedule {
    offset: FixedOffset,
}

impl WorkingSchedule {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// True when `instant` falls on Mon-Sat inside [08:45:00, 16:20:00) local time
    pub fn is_working_moment(&self, instant: DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&self.offset);
        if local.weekday() == Weekday::Sun {
            return false;
        }
        (WINDOW_OPEN_SECS..WINDOW_CLOSE_SECS).contains(&local.num_seconds_from_midnight())
    }

    /// Whole working seconds inside `[start, end)`, floored
    pub fn working_seconds_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
        if end <= start {
            return 0;
        }

        let start_local = start.with_timezone(&self.offset).naive_local();
        let end_local = end.with_timezone(&self.offset).naive_local();
        let first = start_local.date();
        let last = end_local.date();

        let mut total_millis: i64 = 0;
        let mut day = first;
        while day <= last {
            // Interior days are fully covered, so whole weeks collapse to a product.
            if day > first && day < last {
                let whole_weeks = (last - day).num_days() / 7;
                if whole_weeks > 0 {
                    total_millis += whole_weeks * WORKING_DAYS_PER_WEEK * WINDOW_MILLIS;
                    day += Duration::days(whole_weeks * 7);
                    continue;
                }
            }

            total_millis += day_overlap_millis(day, start_local, end_local);
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        (total_millis.max(0) / 1000) as u64
    }

    /// Human-readable form used by the status endpoint
    pub fn describe(&self) -> String {
        format!(
            "Mon-Sat {:02}:{:02}-{:02}:{:02} (UTC{})",
            WINDOW_OPEN_SECS / 3600,
            WINDOW_OPEN_SECS % 3600 / 60,
            WINDOW_CLOSE_SECS / 3600,
            WINDOW_CLOSE_SECS % 3600 / 60,
            self.offset,
        )
    }
}

impl Default for WorkingSchedule {
    fn default() -> Self {
        Self::new(FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or(Utc.fix()))
    }
}

/// Milliseconds of `[start, end)` that land inside `day`'s working window
fn day_overlap_millis(day: NaiveDate, start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    if day.weekday() == Weekday::Sun {
        return 0;
    }
    let (Some(open), Some(close)) = (
        day.and_hms_opt(WINDOW_OPEN_SECS / 3600, WINDOW_OPEN_SECS % 3600 / 60, 0),
        day.and_hms_opt(WINDOW_CLOSE_SECS / 3600, WINDOW_CLOSE_SECS % 3600 / 60, 0),
    ) else {
        return 0;
    };

    let lo = open.max(start);
    let hi = close.min(end);
    if hi > lo {
        (hi - lo).num_milliseconds()
    } else {
        0
    }
}
