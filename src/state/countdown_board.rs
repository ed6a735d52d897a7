//! Live countdown values published by the display task

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scope's line on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownEntry {
    pub name: String,
    pub remaining_seconds: u64,
    pub running: bool,
    /// Set when the snapshot could not be extrapolated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl CountdownEntry {
    /// `HH:MM:SS`, hours unbounded
    pub fn formatted(&self) -> String {
        let secs = self.remaining_seconds;
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }

    pub fn expired(&self) -> bool {
        self.remaining_seconds == 0
    }
}

/// Countdown values for every scope as of `updated_at`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownBoard {
    pub updated_at: Option<DateTime<Utc>>,
    pub working_now: bool,
    pub entries: BTreeMap<u64, CountdownEntry>,
}

impl CountdownBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running scopes that hit zero since `previous`
    pub fn newly_expired(&self, previous: &CountdownBoard) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.running && entry.expired())
            .filter(|(id, _)| {
                previous
                    .entries
                    .get(id)
                    .map_or(true, |before| !before.expired())
            })
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(remaining_seconds: u64, running: bool) -> CountdownEntry {
        CountdownEntry {
            name: "Batch".to_string(),
            remaining_seconds,
            running,
            fault: None,
        }
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(entry(0, false).formatted(), "00:00:00");
        assert_eq!(entry(5_400, true).formatted(), "01:30:00");
        assert_eq!(entry(360_061, true).formatted(), "100:01:01");
    }

    #[test]
    fn expiry_is_reported_once() {
        let mut before = CountdownBoard::new();
        before.entries.insert(1, entry(1, true));
        before.entries.insert(2, entry(0, false));

        let mut now = CountdownBoard::new();
        now.entries.insert(1, entry(0, true));
        now.entries.insert(2, entry(0, false));
        assert_eq!(now.newly_expired(&before), vec![1]);
        assert!(now.newly_expired(&now).is_empty());
    }
}
