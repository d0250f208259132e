//! C7: the hook scheduler.

pub mod scheduler;
pub mod state;

pub use scheduler::{run_hook_cycle, HookSchedulerConfig};
