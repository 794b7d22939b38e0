mod config;

use std::fmt;
use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::AppState;
use services::seed::seed_demo;
use services::{AppServices, Clock};

use crate::config::{AppConfig, normalize_sqlite_url};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidAddr { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidAddr { raw } => write!(f, "invalid --addr value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

/// Command line: a subcommand plus flags that override the environment.
#[derive(Debug, PartialEq, Eq)]
struct Args {
    command: Command,
    db_url: Option<String>,
    http_addr: Option<SocketAddr>,
    help: bool,
}

impl Args {
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter().peekable();
        let named = args.peek().is_some_and(|first| !first.starts_with('-'));
        let command = if named {
            let name = args.next().unwrap_or_default();
            Command::from_arg(&name).ok_or(ArgsError::UnknownCommand(name))?
        } else {
            Command::Serve
        };

        let mut parsed = Self {
            command,
            db_url: None,
            http_addr: None,
            help: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--addr" => {
                    let value = require_value(&mut args, "--addr")?;
                    let addr = value
                        .parse::<SocketAddr>()
                        .map_err(|_| ArgsError::InvalidAddr { raw: value.clone() })?;
                    parsed.http_addr = Some(addr);
                }
                "--help" | "-h" => parsed.help = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }

    fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.db_url {
            config.db_url.clone_from(url);
        }
        if let Some(addr) = self.http_addr {
            config.http_addr = addr;
        }
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app [serve] [--db <sqlite_url>] [--addr <host:port>]");
    eprintln!("  app seed    [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://club.sqlite3");
    eprintln!("  --addr 127.0.0.1:8080");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CLUB_DB_URL, CLUB_HTTP_ADDR, CLUB_SESSION_TTL_HOURS,");
    eprintln!("  CLUB_IMAGE_HOST_URL, CLUB_IMAGE_HOST_KEY, CLUB_CORS_ORIGIN, RUST_LOG");
}

/// Create the database file and its directory so the pool can open it.
fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,api=debug,services=debug")),
        )
        .init();

    let args = Args::parse(std::env::args().skip(1)).inspect_err(|e| {
        eprintln!("{e}");
        print_usage();
    })?;
    if args.help {
        print_usage();
        return Ok(());
    }

    let mut config = AppConfig::from_env();
    args.apply(&mut config);
    config.db_url = normalize_sqlite_url(&config.db_url);
    info!(
        db = %config.db_url,
        addr = %config.http_addr,
        image_host = config.image_host.is_some(),
        "Loaded configuration"
    );

    prepare_sqlite_file(&config.db_url)?;
    let services =
        AppServices::new_sqlite(&config.db_url, Clock::system(), config.service_settings())
            .await
            .context("opening database")?;

    match args.command {
        Command::Seed => {
            let report = seed_demo(&services).await?;
            info!(
                admins = report.admins_created,
                resources = report.resources_created,
                pathways = report.pathways_created,
                "Seed complete"
            );
        }
        Command::Serve => {
            let state = AppState::new(services, config.api_config());
            tokio::select! {
                result = api::serve(state, config.http_addr) => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "HTTP server failed");
                        return Err(e.into());
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn serve_is_the_default_command() {
        let args = Args::parse(argv(&[])).unwrap();
        assert_eq!(args.command, Command::Serve);

        let args = Args::parse(argv(&["--addr", "0.0.0.0:3000"])).unwrap();
        assert_eq!(args.command, Command::Serve);
        assert_eq!(args.http_addr, Some(([0, 0, 0, 0], 3000).into()));
    }

    #[test]
    fn seed_takes_a_database_flag() {
        let args = Args::parse(argv(&["seed", "--db", "sqlite:demo.db"])).unwrap();
        assert_eq!(args.command, Command::Seed);
        assert_eq!(args.db_url.as_deref(), Some("sqlite:demo.db"));

        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.db_url, "sqlite:demo.db");
    }

    #[test]
    fn bad_arguments_are_reported() {
        assert!(matches!(
            Args::parse(argv(&["migrate"])),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert!(matches!(
            Args::parse(argv(&["serve", "--db"])),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(
            Args::parse(argv(&["serve", "--addr", "nowhere"])),
            Err(ArgsError::InvalidAddr { .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["--verbose"])),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn sqlite_file_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("club.sqlite3");
        let url = format!("sqlite://{}", path.display());

        prepare_sqlite_file(&url).unwrap();
        assert!(path.exists());
        prepare_sqlite_file("sqlite::memory:").unwrap();
    }
}
