use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::info;

use super::Result;
use crate::auth::{AuthContext, Authenticator, CredentialStore, SessionHandle};
use crate::config::{Config, StorageProvider};
use crate::fetch::{DocketFetcher, DocumentFetcher, HttpConfig, PacerHttp};
use crate::ledger::{FjallStore, SpendLedger, SpendLimits};
use crate::observability::Metrics;
use crate::queue::DownloadQueue;
use crate::storage::DocumentStore;
use crate::triggers::{TriggerEngine, default_triggers};

/// Everything the acquisition pipeline shares, built once at startup.
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: FjallStore,
    pub ledger: SpendLedger,
    pub queue: DownloadQueue,
    pub authenticator: Authenticator,
    pub documents: DocumentFetcher,
    pub dockets: DocketFetcher,
    pub metrics: Metrics,
    engine: RwLock<TriggerEngine>,
}

impl AppContext {
    /// Open the ledger, restore the queue and the saved session, and wire the
    /// strategy chain from `config`.
    pub fn build(config: Config) -> Result<Self> {
        let data_dir = config.server.data_dir.clone();
        let store = FjallStore::open(config.server.ledger_path())?;

        let ledger = SpendLedger::new(
            store.clone(),
            SpendLimits {
                daily: config.discovery.daily_budget,
                monthly: config.discovery.monthly_budget,
            },
            config.billing.clone(),
        );

        let documents = match config.storage.provider {
            StorageProvider::Local => DocumentStore::local(&config.storage.root_dir(&data_dir))?,
            StorageProvider::Memory => DocumentStore::in_memory(),
        };

        let credentials = CredentialStore::new(
            config.pacer.session_path(&data_dir),
            config.pacer.session_domains.clone(),
        );
        let session = SessionHandle::new(credentials.load());
        let http = PacerHttp::new(
            HttpConfig::from_pacer(&config.pacer),
            config.backoff.clone(),
            session,
        )?;

        let auth_ctx = Arc::new(AuthContext {
            http: http.clone(),
            pacer: config.pacer.clone(),
            store: credentials,
        });
        let authenticator = Authenticator::new(auth_ctx, config.backoff.clone());

        let queue = DownloadQueue::new(
            config.discovery.daily_budget,
            config.discovery.default_estimate,
            chrono::Duration::hours(i64::from(config.discovery.terminal_retention_hours)),
        );
        queue.load_from_db(&store)?;

        let engine = build_engine(&config);
        info!(
            triggers = engine.triggers().len(),
            enabled = config.discovery.enabled,
            configured = authenticator.is_configured(),
            "Acquisition context ready"
        );

        Ok(Self {
            documents: DocumentFetcher::new(http.clone(), documents, config.billing.clone()),
            dockets: DocketFetcher::new(http, config.billing.clone()),
            config: Arc::new(config),
            store,
            ledger,
            queue,
            authenticator,
            metrics: Metrics::new(),
            engine: RwLock::new(engine),
        })
    }

    pub fn engine(&self) -> RwLockReadGuard<'_, TriggerEngine> {
        self.engine.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in a new engine value.
    pub fn update_engine<F>(&self, change: F) -> bool
    where
        F: FnOnce(&TriggerEngine) -> (TriggerEngine, bool),
    {
        let mut engine = self.engine.write().unwrap_or_else(PoisonError::into_inner);
        let (next, changed) = change(&engine);
        *engine = next;
        changed
    }
}

/// Built-in triggers (unless disabled), then configured ones. A configured
/// trigger replaces a built-in of the same name.
fn build_engine(config: &Config) -> TriggerEngine {
    let discovery = &config.discovery;
    let base = if discovery.use_default_triggers {
        TriggerEngine::new(default_triggers())
    } else {
        TriggerEngine::default()
    };
    discovery
        .triggers
        .iter()
        .cloned()
        .fold(base, |engine, trigger| engine.add_trigger(trigger))
        .with_court_filters(
            discovery.allowed_courts.clone(),
            discovery.excluded_courts.clone(),
        )
}
