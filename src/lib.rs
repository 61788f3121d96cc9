//! metadata-scripts library
//!
//! Fetches the startup, shutdown and specialize scripts an operator placed in
//! instance metadata, resolves remote pointers, and runs each script in turn.
//!
//! # Design Principles
//!
//! - **Safety First**: No unsafe code (`#![forbid(unsafe_code)]`)
//! - **One Pass**: a single metadata snapshot per invocation, scripts run sequentially
//! - **Degrade Per Script**: only a bad argument or an unreachable metadata
//!   service fails the run; anything else costs just the affected script

pub mod config;
pub mod metadata;
pub mod orchestrator;
pub mod scripts;
pub mod storage;

mod error;

pub use config::Config;
pub use error::ScriptError;
pub use orchestrator::{Outcome, RunSummary, run_phase};

use clap::ValueEnum;

/// Lifecycle phase selecting which metadata keys are queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Phase {
    /// Sysprep specialize pass
    Specialize,
    /// Instance boot
    Startup,
    /// Instance shutdown
    Shutdown,
}

impl Phase {
    /// All phases in the order they are listed to users
    pub const ALL: [Phase; 3] = [Phase::Specialize, Phase::Startup, Phase::Shutdown];

    /// Attribute name prefix for this phase
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Phase::Specialize => "sysprep-specialize",
            Phase::Startup => "windows-startup",
            Phase::Shutdown => "windows-shutdown",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Specialize => write!(f, "specialize"),
            Phase::Startup => write!(f, "startup"),
            Phase::Shutdown => write!(f, "shutdown"),
        }
    }
}
