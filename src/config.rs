use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_API_URL: &str = "http://localhost:9000";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Runtime configuration, environment-driven with defaults
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the S2 geometry service
    pub api_url: String,
    /// Directory holding Natural Earth GeoJSON base-map files
    pub data_dir: PathBuf,
    pub request_timeout: Duration,
    /// Log file path; logging is disabled when unset (the TUI owns the screen)
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_url = env_string("S2SCOPE_API_URL", DEFAULT_API_URL);
        let data_dir = PathBuf::from(env_string("S2SCOPE_DATA_DIR", DEFAULT_DATA_DIR));
        let request_timeout = Duration::from_secs(env_u64(
            "S2SCOPE_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?);
        let log_file = std::env::var("S2SCOPE_LOG_FILE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            api_url,
            data_dir,
            request_timeout,
            log_file,
        })
    }
}

/// Set up file-backed tracing when configured; a TUI can't log to the screen
pub fn init_tracing(cfg: &Config) -> Result<()> {
    let Some(path) = &cfg.log_file else {
        return Ok(());
    };

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {}={} as u64", name, value)),
        Err(_) => Ok(default),
    }
}
