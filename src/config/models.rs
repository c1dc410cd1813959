use crate::backoff::BackoffConfig;
use crate::ledger::CostModel;
use crate::money::Usd;
use crate::triggers::Trigger;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub pacer: PacerConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub billing: CostModel,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Root for the ledger, session file and (by default) cached documents
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_dir: default_data_dir(),
        }
    }
}

impl ServerConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Which items to buy and how much to spend on them
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_daily_budget")]
    pub daily_budget: Usd,
    #[serde(default = "default_monthly_budget")]
    pub monthly_budget: Usd,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub allowed_courts: Vec<String>,
    #[serde(default)]
    pub excluded_courts: Vec<String>,
    /// Pre-download estimate for a queued document
    #[serde(default = "default_estimate")]
    pub default_estimate: Usd,
    /// How long finished items are remembered for deduplication after restart
    #[serde(default = "default_terminal_retention_hours")]
    pub terminal_retention_hours: u32,
    #[serde(default = "default_true")]
    pub use_default_triggers: bool,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            daily_budget: default_daily_budget(),
            monthly_budget: default_monthly_budget(),
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval_secs(),
            allowed_courts: Vec::new(),
            excluded_courts: Vec::new(),
            default_estimate: default_estimate(),
            terminal_retention_hours: default_terminal_retention_hours(),
            use_default_triggers: true,
            triggers: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_daily_budget() -> Usd {
    Usd::from_cents(1_000)
}

fn default_monthly_budget() -> Usd {
    Usd::from_cents(3_000)
}

fn default_batch_size() -> usize {
    10
}

fn default_poll_interval_secs() -> u64 {
    15 * 60
}

fn default_estimate() -> Usd {
    Usd::from_cents(10)
}

fn default_terminal_retention_hours() -> u32 {
    24
}

fn default_true() -> bool {
    true
}

/// Account credentials, only ever read from the environment
#[derive(Debug, Clone, Default)]
pub struct PacerCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_code: Option<String>,
    pub otp_code: Option<String>,
}

impl PacerCredentials {
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.username) && present(&self.password)
    }
}

/// External document system endpoints and session handling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacerConfig {
    #[serde(default = "default_login_base_url")]
    pub login_base_url: String,
    /// Token endpoints host, when it differs from the login host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_base_url: Option<String>,
    /// Court site template; `{court}` is replaced by the court code
    #[serde(default = "default_ecf_base_url")]
    pub ecf_base_url: String,
    /// Cookie domains accepted as belonging to a session
    #[serde(default = "default_session_domains")]
    pub session_domains: Vec<String>,
    /// Domain the session token cookie is scoped to
    #[serde(default = "default_cookie_domain")]
    pub cookie_domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_validation_ttl_secs")]
    pub validation_ttl_secs: u64,
    /// Court used for validation when the caller does not name one
    #[serde(default = "default_validation_court")]
    pub validation_court: String,
    #[serde(default = "default_true")]
    pub use_token_api: bool,
    #[serde(default)]
    pub browser_login: bool,
    /// Chromium binary for browser login; auto-detected when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_executable: Option<PathBuf>,
    #[serde(default = "default_login_attempts")]
    pub login_attempts: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_fetch_retries")]
    pub max_fetch_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(skip)]
    pub credentials: PacerCredentials,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            login_base_url: default_login_base_url(),
            token_base_url: None,
            ecf_base_url: default_ecf_base_url(),
            session_domains: default_session_domains(),
            cookie_domain: default_cookie_domain(),
            session_file: None,
            token_ttl_secs: default_token_ttl_secs(),
            validation_ttl_secs: default_validation_ttl_secs(),
            validation_court: default_validation_court(),
            use_token_api: true,
            browser_login: false,
            browser_executable: None,
            login_attempts: default_login_attempts(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_fetch_retries: default_max_fetch_retries(),
            user_agent: default_user_agent(),
            credentials: PacerCredentials::default(),
        }
    }
}

impl PacerConfig {
    /// Base url of a court's site, without trailing slash
    pub fn ecf_base(&self, court: &str) -> String {
        self.ecf_base_url
            .replace("{court}", &court.trim().to_lowercase())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn login_base(&self) -> &str {
        self.login_base_url.trim_end_matches('/')
    }

    pub fn token_base(&self) -> &str {
        self.token_base_url
            .as_deref()
            .unwrap_or(&self.login_base_url)
            .trim_end_matches('/')
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn validation_ttl(&self) -> Duration {
        Duration::from_secs(self.validation_ttl_secs)
    }

    pub fn session_path(&self, data_dir: &std::path::Path) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| data_dir.join("pacer_session.json"))
    }
}

fn default_login_base_url() -> String {
    "https://pacer.login.uscourts.gov".to_string()
}

fn default_ecf_base_url() -> String {
    "https://ecf.{court}.uscourts.gov".to_string()
}

fn default_session_domains() -> Vec<String> {
    vec![".uscourts.gov".to_string(), "pacer.uscourts.gov".to_string()]
}

fn default_cookie_domain() -> String {
    ".uscourts.gov".to_string()
}

fn default_token_ttl_secs() -> u64 {
    30 * 60
}

fn default_validation_ttl_secs() -> u64 {
    5 * 60
}

fn default_validation_court() -> String {
    "nysd".to_string()
}

fn default_login_attempts() -> u32 {
    3
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_fetch_retries() -> u32 {
    3
}

fn default_user_agent() -> String {
    format!("courtfetch/{}", env!("CARGO_PKG_VERSION"))
}

/// Storage provider type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    Local,
    Memory,
}

/// Document storage configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    /// Defaults to `{data_dir}/docs`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl StorageConfig {
    pub fn root_dir(&self, data_dir: &std::path::Path) -> PathBuf {
        self.root.clone().unwrap_or_else(|| data_dir.join("docs"))
    }
}
