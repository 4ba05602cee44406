use crate::infrastructure::store::DEFAULT_MAX_RETRIES;
use problem_board_errors::AppError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_BASELINE_PATH: &str = "baseline.json";

/// Runtime settings, read from `PROBLEM_BOARD_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    /// Hosted database base URL; the in-memory tree is used when unset.
    pub database_url: Option<String>,
    pub database_auth: Option<String>,
    pub max_retries: u32,
    pub poll_interval: Duration,
    /// Directory whose files the integrity check covers.
    pub integrity_root: PathBuf,
    pub baseline_path: PathBuf,
    /// Reported when a submission carries no app version.
    pub app_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.parse().unwrap_or(SocketAddr::from(([127, 0, 0, 1], 3000))),
            database_url: None,
            database_auth: None,
            max_retries: DEFAULT_MAX_RETRIES,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            integrity_root: default_integrity_root(),
            baseline_path: PathBuf::from(DEFAULT_BASELINE_PATH),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = var("PROBLEM_BOARD_ADDR") {
            config.addr = parse("PROBLEM_BOARD_ADDR", &addr)?;
        }
        config.database_url = var("PROBLEM_BOARD_DATABASE_URL");
        config.database_auth = var("PROBLEM_BOARD_DATABASE_AUTH");
        if let Some(retries) = var("PROBLEM_BOARD_MAX_RETRIES") {
            config.max_retries = parse("PROBLEM_BOARD_MAX_RETRIES", &retries)?;
        }
        if let Some(ms) = var("PROBLEM_BOARD_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(parse("PROBLEM_BOARD_POLL_INTERVAL_MS", &ms)?);
        }
        if let Some(root) = var("PROBLEM_BOARD_INTEGRITY_ROOT") {
            config.integrity_root = PathBuf::from(root);
        }
        if let Some(path) = var("PROBLEM_BOARD_BASELINE_PATH") {
            config.baseline_path = PathBuf::from(path);
        }
        if let Some(version) = var("PROBLEM_BOARD_APP_VERSION") {
            config.app_version = version;
        }

        if config.max_retries == 0 {
            return Err(AppError::InvalidInput(
                "PROBLEM_BOARD_MAX_RETRIES must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("{} has an invalid value: {}", key, value)))
}

/// The directory holding the running binary, i.e. the installed files.
fn default_integrity_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr.to_string(), DEFAULT_ADDR);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert!(config.database_url.is_none());
        assert_eq!(config.baseline_path, PathBuf::from("baseline.json"));
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PROBLEM_BOARD_ADDR", "0.0.0.0:8080"),
            ("PROBLEM_BOARD_DATABASE_URL", "https://demo.firebaseio.com"),
            ("PROBLEM_BOARD_MAX_RETRIES", "5"),
            ("PROBLEM_BOARD_POLL_INTERVAL_MS", "250"),
            ("PROBLEM_BOARD_INTEGRITY_ROOT", "/opt/app"),
            ("PROBLEM_BOARD_APP_VERSION", "9.9.9"),
            ("PROBLEM_BOARD_DATABASE_AUTH", "  "),
        ]))
        .unwrap();

        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.database_url.as_deref(), Some("https://demo.firebaseio.com"));
        assert!(config.database_auth.is_none());
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.integrity_root, PathBuf::from("/opt/app"));
        assert_eq!(config.app_version, "9.9.9");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("PROBLEM_BOARD_ADDR", "nowhere")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PROBLEM_BOARD_MAX_RETRIES", "-1")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PROBLEM_BOARD_MAX_RETRIES", "0")])).is_err());
    }
}
