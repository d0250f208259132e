use std::process;

use anyhow::Context;
use clap::Parser;

use gai::cli::{Cli, Commands};
use gai::config::GaiConfig;
use gai::leaf_commands::SystemLeafCommands;
use gai::loop_driver::{self, NeverStop};
use gai::styling::{eprintln, println};

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "off" }),
    )
    .format(|buf, record| {
        use std::io::Write;
        writeln!(buf, "[{}] {}", record.level(), record.args())
    })
    .init();

    let result = run(cli);

    if let Err(err) = result {
        eprintln!("{}", gai::styling::format_error(&format!("{err:#}")));
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().or_else(gai::config::config_path);
    let config =
        GaiConfig::load_from(config_path.as_deref()).context("failed to load gai configuration")?;
    let leaf = SystemLeafCommands;

    match cli.command {
        Commands::Loop { interval, hook_interval } => {
            let status_interval = std::time::Duration::from_secs(
                interval.unwrap_or(config.status_check_interval_seconds),
            );
            let hook_interval = std::time::Duration::from_secs(
                hook_interval.unwrap_or(config.hook_check_interval_seconds),
            );
            let projects_dir = gai::paths::projects_dir().context("failed to resolve ~/.gai/projects")?;
            gai::trace::progress(&format!(
                "starting loop over {} (hook every {}s, status every {}s)",
                gai::path::format_path_for_display(&projects_dir),
                hook_interval.as_secs(),
                status_interval.as_secs()
            ));
            loop_driver::run_loop(&config, &leaf, &NeverStop, hook_interval, status_interval)
        }
        Commands::Work { statuses, projects } => {
            let mut agents = gai::agent::load_all_agents().context("failed to load agents")?;
            agents = gai::agent::apply_dismissals(agents)?;

            if !statuses.is_empty() {
                agents.retain(|a| statuses.iter().any(|s| s.eq_ignore_ascii_case(&a.status)));
            }
            if !projects.is_empty() {
                agents.retain(|a| {
                    projects.iter().any(|p| a.project_file.contains(p.as_str()))
                });
            }

            let json = serde_json::to_string_pretty(&agents).context("failed to serialize agents")?;
            println!("{json}");
            Ok(())
        }
    }
}
