use clap::Parser;
use color_eyre::Result;
use daybook::cli::{self, Cli, Commands, Context};
use daybook::{Config, Database, Profile};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    color_eyre::install()?;

    // Quiet by default so log lines do not tear through the TUI.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };
    let config = Config::load_with_profile(profile, cli.config.as_deref().map(Path::new))?;
    let clock = config.clock()?;

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let app = daybook::tui::App::new(config, db, Box::new(clock))?;
            daybook::tui::run_event_loop(app)?;
        }
        command => {
            let ctx = Context {
                db: &db,
                clock: &clock,
                labels: config.labels(),
                config: &config,
            };
            cli::run(command, &ctx)?;
        }
    }

    Ok(())
}
