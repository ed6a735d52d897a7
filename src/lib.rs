//! Batch Timer - A state-managed HTTP server for working-hours countdowns
//!
//! Each scope (batch) carries a countdown that only runs Monday through
//! Saturday between 08:45 and 16:20 institution time. This library provides
//! the timer core, the scope store, and the HTTP surface around them.

pub mod config;
pub mod error;
pub mod state;
pub mod api;
pub mod services;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, TimerError};
pub use state::AppState;
pub use api::create_router;
pub use timer::{Scope, WorkingSchedule};
pub use utils::signals::shutdown_signal;
