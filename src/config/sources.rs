use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "COURTFETCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/courtfetch.toml";
const ENV_PREFIX: &str = "COURTFETCH";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Read .env first so it can name the config file
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_resolved(config_path)
}

/// Like [`load`], with an explicit file instead of the default lookup
pub fn load_file(config_path: PathBuf) -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();
    load_resolved(config_path)
}

fn load_resolved(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut config = load_from_sources(config_path)?;

    load_secrets(&mut config);

    Ok(config)
}

/// Account secrets are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config) {
    let read = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

    let credentials = &mut config.pacer.credentials;
    credentials.username = read("PACER_USERNAME");
    credentials.password = read("PACER_PASSWORD");
    credentials.client_code = read("PACER_CLIENT_CODE");
    credentials.otp_code = read("PACER_OTP_CODE");
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // COURTFETCH__DISCOVERY__DAILY_BUDGET -> discovery.daily_budget
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("discovery.allowed_courts")
            .with_list_parse_key("discovery.excluded_courts")
            .with_list_parse_key("pacer.session_domains"),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
