use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::crypto::PBKDF2_ITERATIONS;

/// Application-level constants
pub const APP_NAME: &str = "Hospital Admin";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;
/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 86_400;

const ENV_ADDR: &str = "HOSPITAL_ADDR";
const ENV_DB_PATH: &str = "HOSPITAL_DB_PATH";
const ENV_TOKEN_SECRET: &str = "HOSPITAL_TOKEN_SECRET";
const ENV_TOKEN_TTL: &str = "HOSPITAL_TOKEN_TTL_SECS";
const ENV_PBKDF2_ITERATIONS: &str = "HOSPITAL_PBKDF2_ITERATIONS";
const ENV_SEED_USERS: &str = "HOSPITAL_SEED_USERS";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "hospital_admin_lib=info,hospital_admin=info,tower_http=warn"
}

/// Get the application data directory
/// ~/HospitalAdmin/ on all platforms, falling back to the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("HospitalAdmin")
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join("hospital.db")
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not valid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from `HOSPITAL_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    /// `None` means a random per-process secret.
    pub token_secret: Option<String>,
    pub token_ttl_secs: i64,
    pub password_iterations: u32,
    pub seed_users: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let addr_raw = get(ENV_ADDR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_raw.parse().map_err(|_| ConfigError::Invalid {
            name: ENV_ADDR,
            value: addr_raw.clone(),
        })?;

        let token_ttl_secs = match get(ENV_TOKEN_TTL) {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|v| (1..=MAX_TOKEN_TTL_SECS).contains(v))
                .ok_or(ConfigError::Invalid { name: ENV_TOKEN_TTL, value: raw })?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };

        let password_iterations = match get(ENV_PBKDF2_ITERATIONS) {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or(ConfigError::Invalid { name: ENV_PBKDF2_ITERATIONS, value: raw })?,
            None => PBKDF2_ITERATIONS,
        };

        let seed_users = match get(ENV_SEED_USERS).as_deref() {
            None => true,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: ENV_SEED_USERS,
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            addr,
            db_path: get(ENV_DB_PATH).map(PathBuf::from).unwrap_or_else(default_db_path),
            token_secret: get(ENV_TOKEN_SECRET),
            token_ttl_secs,
            password_iterations,
            seed_users,
        })
    }
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
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
        assert_eq!(config.password_iterations, PBKDF2_ITERATIONS);
        assert!(config.token_secret.is_none());
        assert!(config.seed_users);
        assert!(config.db_path.ends_with("hospital.db"));
    }

    #[test]
    fn explicit_values_override() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HOSPITAL_ADDR", "127.0.0.1:9000"),
            ("HOSPITAL_DB_PATH", "/tmp/h.db"),
            ("HOSPITAL_TOKEN_SECRET", "s3cret"),
            ("HOSPITAL_TOKEN_TTL_SECS", "60"),
            ("HOSPITAL_SEED_USERS", "false"),
        ]))
        .unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.db_path, PathBuf::from("/tmp/h.db"));
        assert_eq!(config.token_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.token_ttl_secs, 60);
        assert!(!config.seed_users);
    }

    #[test]
    fn bad_values_are_reported() {
        let err = AppConfig::from_lookup(lookup(&[("HOSPITAL_TOKEN_TTL_SECS", "-5")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid { name: "HOSPITAL_TOKEN_TTL_SECS", value: "-5".into() }
        );
        assert!(AppConfig::from_lookup(lookup(&[("HOSPITAL_ADDR", "nowhere")])).is_err());
    }

    #[test]
    fn token_ttl_is_capped() {
        let huge = i64::MAX.to_string();
        assert!(AppConfig::from_lookup(lookup(&[("HOSPITAL_TOKEN_TTL_SECS", huge.as_str())])).is_err());

        let year = MAX_TOKEN_TTL_SECS.to_string();
        let config = AppConfig::from_lookup(lookup(&[("HOSPITAL_TOKEN_TTL_SECS", year.as_str())])).unwrap();
        assert_eq!(config.token_ttl_secs, MAX_TOKEN_TTL_SECS);
    }

    #[test]
    fn app_data_dir_is_named_after_app() {
        assert!(app_data_dir().ends_with("HospitalAdmin"));
    }
}
