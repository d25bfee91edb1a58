use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

const DEFAULT_DATABASE_URL: &str = "sqlite://goal_tracker.db?mode=rwc";
const DEFAULT_SESSION_HOURS: i64 = 1;
const DEFAULT_SESSION_CLEANUP_SECS: u64 = 3600;
pub const MAX_SESSION_HOURS: i64 = 24 * 366;

pub fn load_environment() -> anyhow::Result<()> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> anyhow::Result<()> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)
        .with_context(|| format!("Failed to load environment file {}", path))?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

/// Settings outside Rocket's own `ROCKET_*` configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub session_hours: i64,
    pub session_cleanup_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            session_hours: DEFAULT_SESSION_HOURS,
            session_cleanup_secs: DEFAULT_SESSION_CLEANUP_SECS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let database_url = dotenvy::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.database_url);

        let session_hours = match dotenvy::var("SESSION_HOURS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|hours| (1..=MAX_SESSION_HOURS).contains(hours))
                .with_context(|| {
                    format!(
                        "SESSION_HOURS must be between 1 and {}, got '{}'",
                        MAX_SESSION_HOURS, raw
                    )
                })?,
            Err(_) => defaults.session_hours,
        };

        let session_cleanup_secs = match dotenvy::var("SESSION_CLEANUP_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .with_context(|| {
                    format!(
                        "SESSION_CLEANUP_SECS must be a positive number of seconds, got '{}'",
                        raw
                    )
                })?,
            Err(_) => defaults.session_cleanup_secs,
        };

        Ok(Self {
            database_url,
            session_hours,
            session_cleanup_secs,
        })
    }
}
