//! A local developer-orchestration layer for iterating on source-control
//! changes with background AI agents and verification hooks.
//!
//! `gai` reads and writes a line-oriented ChangeSpec/ProjectSpec text
//! format, claims numbered workspaces for background runs, schedules hook
//! and workflow agents against them, and aggregates the result into a flat
//! agent list a TUI (or `gai work`) can render.
//!
//! The library API is not stable — it exists to back the `gai` binary and
//! its own test suite, not as a published integration surface.

pub mod agent;
pub mod changespec;
pub mod cl_status;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod fold;
pub mod hooks;
pub mod leaf_commands;
pub mod loop_driver;
pub mod path;
pub mod paths;
pub mod persist;
pub mod process;
pub mod project_spec;
pub mod styling;
pub mod suffix;
pub mod sync_cache;
pub mod timestamp;
pub mod trace;
pub mod validation;
pub mod workflow;
pub mod workspace;

pub use agent::{Agent, AgentType};
pub use suffix::SuffixType;
