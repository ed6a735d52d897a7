//! External collaborators
//!
//! Storage for scope records lives here, outside the timer core.

pub mod persistence;

// Re-export main types
pub use persistence::ScopeFile;
