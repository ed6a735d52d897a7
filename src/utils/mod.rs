//! Utility functions module
//!
//! Shutdown handling shared by the server binary.

pub mod signals;

// Re-export main functions
pub use signals::shutdown_signal;
