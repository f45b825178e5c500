//! CLI command implementations
//!
//! `init` writes a default configuration file; `serve` boots the catalogue
//! server and blocks until it exits. All wiring of subsystems happens here
//! so `main` stays a thin dispatcher.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::http_server::{HttpServer, HttpServerConfig};
use crate::listing::{ListingKind, ListingRecord};
use crate::observability::Logger;
use crate::sync::StreamRegistry;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP bind and CORS settings
    #[serde(default)]
    pub http: HttpServerConfig,

    /// Optional JSON file of listings to load at startup, keyed by
    /// listing type
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.http.host.is_empty() {
            return Err(CliError::config_error("http.host must not be empty"));
        }
        if self.http.port == 0 {
            return Err(CliError::config_error("http.port must be > 0"));
        }
        Ok(())
    }
}

/// Parse arguments and dispatch to the selected command
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args().command)
}

/// Dispatch a parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Init { config } => init(&config),
        Command::Serve { config, host, port } => serve(&config, host, port),
    }
}

/// Write a default configuration file; refuses to overwrite
pub fn init(path: &Path) -> CliResult<()> {
    if path.exists() {
        return Err(CliError::already_initialized(path.display().to_string()));
    }

    let config = Config::default();
    let content = serde_json::to_string_pretty(&config)?;
    fs::write(path, content)?;

    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Boot the catalogue server and block until it exits
pub fn serve(config_path: &Path, host: Option<String>, port: Option<u16>) -> CliResult<()> {
    let mut config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        // Serving without a config file is fine for development.
        Config::default()
    };

    if let Some(host) = host {
        config.http.host = host;
    }
    if let Some(port) = port {
        config.http.port = port;
    }
    config.validate()?;

    let catalog = Arc::new(Catalog::new());
    if let Some(seed_file) = &config.seed_file {
        seed_catalog(&catalog, seed_file)?;
    }

    let streams = Arc::new(StreamRegistry::new());
    let server = HttpServer::with_parts(config.http, catalog, streams);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::serve_failed(format!("Failed to build runtime: {}", e)))?;

    runtime
        .block_on(server.start())
        .map_err(|e| CliError::serve_failed(e.to_string()))
}

/// Load listings from a seed file into the catalogue.
///
/// Invalid individual records are skipped with a warning; an unreadable or
/// malformed file is a startup error.
fn seed_catalog(catalog: &Catalog, path: &Path) -> CliResult<()> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::config_error(format!("Failed to read seed file: {}", e)))?;

    let sections: HashMap<String, Vec<ListingRecord>> = serde_json::from_str(&content)
        .map_err(|e| CliError::config_error(format!("Invalid seed JSON: {}", e)))?;

    for (section, records) in sections {
        let Some(kind) = ListingKind::parse(&section) else {
            Logger::warn("SEED_SECTION_SKIPPED", &[("section", &section)]);
            continue;
        };

        for record in records {
            if let Err(err) = catalog.create(kind, record) {
                Logger::warn(
                    "SEED_RECORD_SKIPPED",
                    &[("kind", kind.as_str()), ("error", &err.to_string())],
                );
            }
        }
        Logger::info(
            "SEED_SECTION_LOADED",
            &[
                ("kind", kind.as_str()),
                ("count", &catalog.count(kind).to_string()),
            ],
        );
    }

    Ok(())
}
