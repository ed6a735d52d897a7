//! State management module
//!
//! This module contains the scope table, the shared application state, and
//! the countdown board published to readers.

pub mod app_state;
pub mod countdown_board;
pub mod scope_store;

// Re-export main types
pub use app_state::{AppState, Clock, ScopeChange, ScopeEvent};
pub use countdown_board::{CountdownBoard, CountdownEntry};
pub use scope_store::ScopeStore;
