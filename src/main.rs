use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use logkeep::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Commands report config errors themselves; logging falls back to defaults
    let (level, format) = match config::load_config(&args.config) {
        Ok(cfg) => (cfg.server.log_level, cfg.server.log_format),
        Err(_) => ("info".to_string(), "text".to_string()),
    };
    init_tracing(&level, &format);

    match args.get_command() {
        cli::Commands::Start => {
            commands::start::execute(&args.config).await?;
        }
        cli::Commands::Test => {
            commands::test::execute(&args.config)?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Search(search_args) => {
            commands::search::execute(&args.config, search_args).await?;
        }
        cli::Commands::Version => {
            println!("logkeep v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
