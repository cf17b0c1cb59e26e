use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "logkeep", version, about = "Log entry store with a read-through cache")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server (default)
    Start,

    /// Test configuration file validity
    Test,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Search stored log entries
    Search(crate::commands::search::SearchArgs),

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display current configuration (with secrets masked)
    Show,

    /// Validate configuration file
    Validate,
}

impl Cli {
    /// Get the command to execute, defaulting to Start if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_start() {
        let cli = Cli::try_parse_from(["logkeep"]).unwrap();
        assert!(matches!(cli.get_command(), Commands::Start));
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }

    #[test]
    fn test_cli_parsing_config_path_is_global() {
        let cli = Cli::try_parse_from(["logkeep", "test", "--config", "/etc/logkeep.toml"]).unwrap();
        assert!(matches!(cli.get_command(), Commands::Test));
        assert_eq!(cli.config, PathBuf::from("/etc/logkeep.toml"));
    }

    #[test]
    fn test_cli_parsing_config_show() {
        let cli = Cli::try_parse_from(["logkeep", "config", "show"]).unwrap();
        match cli.get_command() {
            Commands::Config { action } => assert!(matches!(action, ConfigCommands::Show)),
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_cli_parsing_search() {
        let cli = Cli::try_parse_from([
            "logkeep", "search", "--level", "error", "--grep", "disk", "--limit", "5",
        ])
        .unwrap();

        match cli.get_command() {
            Commands::Search(args) => {
                assert_eq!(args.level.as_deref(), Some("error"));
                assert_eq!(args.grep.as_deref(), Some("disk"));
                assert_eq!(args.limit, 5);
                assert_eq!(args.offset, 0);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["logkeep", "reload"]).is_err());
    }
}
