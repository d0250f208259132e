//! The `gai` CLI surface: `gai loop` runs the hook/status cadences in the
//! foreground; `gai work` prints the current agent list as JSON for a TUI
//! or script to consume.

use clap::builder::styling::{AnsiColor, Color, Styles};
use clap::{Parser, Subcommand};

/// Custom styles matching the dim/bold palette used elsewhere in the crate.
fn help_styles() -> Styles {
    Styles::styled()
        .header(anstyle::Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .usage(anstyle::Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .literal(anstyle::Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
        .placeholder(anstyle::Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
        .error(anstyle::Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
}

#[derive(Parser)]
#[command(name = "gai")]
#[command(about = "Background agent orchestration over ChangeSpec/ProjectSpec files", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(disable_help_subcommand = true)]
#[command(styles = help_styles())]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// User config file path (default: `~/.gai/config.toml`)
    #[arg(long, global = true, value_name = "path", help_heading = "Global Options")]
    pub config: Option<std::path::PathBuf>,

    /// Show debug logging (equivalent to `RUST_LOG=debug`)
    #[arg(long, short = 'v', global = true, help_heading = "Global Options")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the hook scheduler and status poller until interrupted
    Loop {
        /// Seconds between status-cycle polls (review-tool submission state)
        #[arg(long, value_name = "seconds")]
        interval: Option<u64>,

        /// Seconds between hook-cycle ticks (hook/workflow sweeps)
        #[arg(long, value_name = "seconds")]
        hook_interval: Option<u64>,
    },

    /// Print the current agent list as JSON
    Work {
        /// Only include agents whose status matches (repeatable)
        #[arg(long = "status", value_name = "name")]
        statuses: Vec<String>,

        /// Only include agents from this project (repeatable)
        #[arg(long = "project", value_name = "name")]
        projects: Vec<String>,
    },
}
