//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod countdown_display;

// Re-export main functions
pub use countdown_display::countdown_display_task;
