pub mod backmerge;
pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod git;
pub mod guard;
pub mod hooks;
pub mod interrupt;
pub mod lock;
pub mod metadata;
pub mod preconditions;
pub mod sequencer;
pub mod ui;

pub use error::{GitReleaseError, Result};
