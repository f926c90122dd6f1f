use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod config;
pub mod query;
pub mod resolve;
pub mod run;
pub mod version;

use config::{default_config_path, WardenConfig};
use query::Direction;

#[derive(Parser)]
#[command(name = "modwarden")]
#[command(author = "Mod Warden Project")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Community-voted mod management for game servers", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.local/share/modwarden/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot service
    Run,

    /// Resolve a catalog item and its requirements without a vote
    Resolve {
        /// Numeric catalog id
        catalog_id: String,

        /// Merge the result into the persisted dependency graph
        #[arg(long)]
        save: bool,
    },

    /// List the mods a mod requires
    Dependencies {
        /// Mod name or catalog id
        identifier: String,
    },

    /// List the mods that require a mod
    Dependents {
        /// Mod name or catalog id
        identifier: String,
    },

    /// Remove a mod from the dependency graph
    Remove {
        /// Mod name or catalog id
        identifier: String,

        /// Remove even if other mods still require it
        #[arg(long)]
        force: bool,
    },

    /// Print every mod with its direct requirements
    Tree,

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Version => {
            version::execute();
            return Ok(());
        }
        Commands::InitConfig { force } => {
            crate::init_tracing(None);
            return config::execute_init(&config_path, force);
        }
        _ => {}
    }

    let config = WardenConfig::load_or_create(&config_path)?;
    crate::init_tracing(Some(&config.logging.level));

    match cli.command {
        Commands::Run => run::execute(config).await,
        Commands::Resolve { catalog_id, save } => {
            resolve::execute(&config, &catalog_id, save).await
        }
        Commands::Dependencies { identifier } => {
            query::execute_relation(&config, &identifier, Direction::Dependencies)
        }
        Commands::Dependents { identifier } => {
            query::execute_relation(&config, &identifier, Direction::Dependents)
        }
        Commands::Remove { identifier, force } => {
            query::execute_remove(&config, &identifier, force)
        }
        Commands::Tree => query::execute_tree(&config),
        Commands::Version | Commands::InitConfig { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["modwarden", "run", "--config", "/etc/modwarden/config.toml"]);

        assert!(matches!(cli.command, Commands::Run));
        assert_eq!(cli.config, Some("/etc/modwarden/config.toml".to_string()));
    }

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::parse_from(["modwarden", "run"]);

        assert!(matches!(cli.command, Commands::Run));
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_cli_parse_resolve() {
        let cli = Cli::parse_from(["modwarden", "resolve", "2894412760", "--save"]);

        match cli.command {
            Commands::Resolve { catalog_id, save } => {
                assert_eq!(catalog_id, "2894412760");
                assert!(save);
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_cli_parse_queries() {
        let cli = Cli::parse_from(["modwarden", "dependencies", "Brita's Weapon Pack"]);
        match cli.command {
            Commands::Dependencies { identifier } => {
                assert_eq!(identifier, "Brita's Weapon Pack")
            }
            _ => panic!("Expected Dependencies command"),
        }

        let cli = Cli::parse_from(["modwarden", "dependents", "2200148440"]);
        match cli.command {
            Commands::Dependents { identifier } => assert_eq!(identifier, "2200148440"),
            _ => panic!("Expected Dependents command"),
        }
    }

    #[test]
    fn test_cli_parse_remove() {
        let cli = Cli::parse_from(["modwarden", "remove", "123"]);
        match cli.command {
            Commands::Remove { identifier, force } => {
                assert_eq!(identifier, "123");
                assert!(!force);
            }
            _ => panic!("Expected Remove command"),
        }

        let cli = Cli::parse_from(["modwarden", "remove", "123", "--force"]);
        assert!(matches!(cli.command, Commands::Remove { force: true, .. }));
    }

    #[test]
    fn test_cli_parse_misc() {
        let cli = Cli::parse_from(["modwarden", "tree"]);
        assert!(matches!(cli.command, Commands::Tree));

        let cli = Cli::parse_from(["modwarden", "init-config", "--force"]);
        assert!(matches!(cli.command, Commands::InitConfig { force: true }));

        let cli = Cli::parse_from(["modwarden", "version"]);
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_rejects_missing_argument() {
        assert!(Cli::try_parse_from(["modwarden", "resolve"]).is_err());
    }
}
