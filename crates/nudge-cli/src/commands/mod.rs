//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (engine construction, transaction loading)
//! - `analyze` - Full analysis report
//! - `compare` - Historical comparison of two exports
//! - `chat` - Keyword chat assistant
//! - `config` - Configuration inspection

pub mod analyze;
pub mod chat;
pub mod compare;
pub mod config;
pub mod core;

// Re-export command functions for main.rs
pub use analyze::*;
pub use chat::*;
pub use compare::*;
pub use config::*;
pub use core::*;

/// Format a signed change with an explicit sign
pub fn signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{:.1}", value)
    } else {
        format!("{:.1}", value)
    }
}
