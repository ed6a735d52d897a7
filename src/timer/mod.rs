//! Working-hours countdown core
//!
//! Pure functions over a scope snapshot and an instant. Persistence,
//! locking, and display scheduling live outside this module.

pub mod observer;
pub mod schedule;
pub mod scope;

pub use observer::{LiveCountdown, ObserverClock};
pub use schedule::WorkingSchedule;
pub use scope::{duration_seconds, Scope, TimerAction, TimerCommand, TimerStatus};
