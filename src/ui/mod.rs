//! Operator output.
//!
//! - `formatter` - styled status lines, the release summary and push
//!   instructions
//!
//! Every pipeline step announces itself through these helpers; nothing in
//! the crate prints directly.

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_error, display_failure_hint, display_release_summary, display_status,
    display_success, display_warning, push_commands,
};
