//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CHIME_DB_PATH`: Database file path
//! - `CHIME_DB_POOL_SIZE`: Connection pool size
//! - `CHIME_SYNC_CRON`: Synchronizer cadence (6-field cron)
//! - `CHIME_NOTIFY_CRON`: Notifier cadence (6-field cron)
//! - `CHIME_SCHEDULER_ENABLED`: Whether background passes run (true/false)
//! - `CHIME_ADMIN_BIND`: Bind address for the admin/trigger surface

use std::path::{Path, PathBuf};

use chime_domain::constants::{DEFAULT_NOTIFY_CRON, DEFAULT_SYNC_CRON};
use chime_domain::{AdminConfig, ChimeError, Config, DatabaseConfig, Result, SchedulerConfig};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `ChimeError::Config` if configuration cannot be loaded from
/// either source.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `CHIME_DB_PATH` is required; everything else has a default.
///
/// # Errors
/// Returns `ChimeError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<Config> {
    let db_path = env_var("CHIME_DB_PATH")?;
    let db_pool_size = match std::env::var("CHIME_DB_POOL_SIZE") {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|e| ChimeError::Config(format!("Invalid pool size: {e}")))?,
        Err(_) => 4,
    };

    let sync_cron =
        std::env::var("CHIME_SYNC_CRON").unwrap_or_else(|_| DEFAULT_SYNC_CRON.to_string());
    let notify_cron =
        std::env::var("CHIME_NOTIFY_CRON").unwrap_or_else(|_| DEFAULT_NOTIFY_CRON.to_string());
    let scheduler_enabled = env_bool("CHIME_SCHEDULER_ENABLED", true);

    let bind_addr =
        std::env::var("CHIME_ADMIN_BIND").unwrap_or_else(|_| "127.0.0.1:8090".to_string());

    Ok(Config {
        database: DatabaseConfig { path: db_path, pool_size: db_pool_size },
        scheduler: SchedulerConfig { sync_cron, notify_cron, enabled: scheduler_enabled },
        admin: AdminConfig { bind_addr },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ChimeError::Config` if the file is missing, unreadable, or has
/// an invalid format.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ChimeError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ChimeError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ChimeError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content. Format is detected by file
/// extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ChimeError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ChimeError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ChimeError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe standard locations for config files: the working directory, then
/// two parent levels, then relative to the executable.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("chime.json"),
            cwd.join("chime.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
            cwd.join("../../config.json"),
            cwd.join("../../config.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("chime.json"),
                exe_dir.join("chime.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| ChimeError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
