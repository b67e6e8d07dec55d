//! hostd-config
//!
//! Command-line front end for the host daemon's configuration loader.
//!
//! ```text
//! hostd-config [--config PATH] default
//! hostd-config [--config PATH] dump [--format toml|json]
//! hostd-config [--config PATH] plugin <NAME>
//! hostd-config [--config PATH] keys
//! ```
//!
//! A missing configuration file is not an error: the defaults are used, as the
//! daemon itself does on first start.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use hostd_config::observability::logging;
use hostd_config::{Config, ConfigError};

const DEFAULT_CONFIG_PATH: &str = "/etc/hostd/config.toml";

#[derive(Parser)]
#[command(name = "hostd-config")]
#[command(about = "Inspect the host daemon configuration", long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration
    Default,
    /// Load the configuration and print the effective result
    Dump {
        #[arg(short, long, value_enum, default_value_t = Format::Toml)]
        format: Format,
    },
    /// Print the raw table configured for one plugin
    Plugin { name: String },
    /// List the keys defined by the configuration file
    Keys,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Toml,
    Json,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Default => Config::default(),
        _ => {
            let config = load(&cli.config)?;
            logging::init(&config.debug.level)?;
            tracing::info!(
                path = %cli.config.display(),
                state = %config.state,
                root = %config.root,
                snapshotter = %config.snapshotter,
                plugins = config.plugins.len(),
                "Configuration loaded"
            );
            config
        }
    };

    run(&config, cli.command)
}

fn load(path: &Path) -> Result<Config, ConfigError> {
    match Config::load(path) {
        Err(err) if err.is_not_found() => Ok(Config::default()),
        other => other,
    }
}

fn run(config: &Config, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = io::stdout().lock();
    match command {
        Commands::Default | Commands::Dump { format: Format::Toml } => {
            config.write_to(&mut out)?;
        }
        Commands::Dump { format: Format::Json } => {
            serde_json::to_writer_pretty(&mut out, config)?;
            writeln!(out)?;
        }
        Commands::Plugin { name } => match config.plugins.get(&name) {
            Some(fragment) => {
                writeln!(out, "# {}", fragment.key())?;
                match fragment.value() {
                    toml::Value::Table(table) => out.write_all(toml::to_string_pretty(table)?.as_bytes())?,
                    other => writeln!(out, "{other}")?,
                }
            }
            None => {
                eprintln!("plugin {name:?} has no configuration; its defaults apply");
            }
        },
        Commands::Keys => {
            let meta = config.plugins.metadata();
            for key in meta.keys() {
                writeln!(out, "{key}")?;
            }
            for key in meta.undecoded() {
                eprintln!("undecoded: {key}");
            }
        }
    }
    Ok(())
}
