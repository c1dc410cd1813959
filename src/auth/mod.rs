//! Session acquisition for the external document system.
//!
//! The [`Authenticator`] walks an ordered chain of [`AuthStrategy`]
//! implementations and stops at the first one whose session passes
//! validation. Every failure is kept as an [`AuthDiagnostic`].

mod browser;
mod cached;
mod error;
pub mod session;
mod store;
mod strategy;
mod token;
mod validator;
pub mod web_login;

pub use error::{AuthError, Result};
pub use session::{Session, SessionHandle};
pub use store::CredentialStore;
pub use strategy::{AuthContext, AuthStrategy, StrategyRegistry, UnavailableStrategy};
pub use token::token_from_body;
pub use validator::{PageVerdict, SessionValidator, classify_page, is_login_wall};

use crate::backoff::{Backoff, BackoffConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One failed strategy.
#[derive(Debug, Clone, Serialize)]
pub struct AuthDiagnostic {
    pub strategy: String,
    pub error_kind: String,
    pub message: String,
    pub attempts: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub strategy_used: Option<String>,
    pub message: String,
    pub strategies_tried: Vec<String>,
    pub errors: Vec<AuthDiagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub configured: bool,
    pub recently_validated: bool,
    pub has_token: bool,
    pub cookie_count: usize,
    pub strategies: Vec<&'static str>,
    pub unavailable: Vec<UnavailableStrategy>,
}

pub struct Authenticator {
    ctx: Arc<AuthContext>,
    registry: StrategyRegistry,
    validator: SessionValidator,
    backoff: BackoffConfig,
    lock: tokio::sync::Mutex<()>,
}

impl Authenticator {
    pub fn new(ctx: Arc<AuthContext>, backoff: BackoffConfig) -> Self {
        let registry = StrategyRegistry::from_config(ctx.clone());
        Self::with_registry(ctx, registry, backoff)
    }

    pub fn with_registry(ctx: Arc<AuthContext>, registry: StrategyRegistry, backoff: BackoffConfig) -> Self {
        let validator = SessionValidator::new(ctx.pacer.validation_ttl());
        Self {
            ctx,
            registry,
            validator,
            backoff,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.ctx.pacer.credentials.is_complete()
    }

    /// Forget the cached validation; the next call walks the chain again.
    pub fn invalidate(&self) {
        self.validator.invalidate();
    }

    pub fn status(&self) -> AuthStatus {
        let session = self.ctx.http.session();
        AuthStatus {
            configured: self.is_configured(),
            recently_validated: self.validator.is_recently_validated(),
            has_token: session.has_token(),
            cookie_count: session.cookie_count(),
            strategies: self.registry.names(),
            unavailable: self.registry.unavailable().to_vec(),
        }
    }

    /// Obtain a validated session for `court`.
    pub async fn authenticate(&self, court: &str) -> AuthOutcome {
        let _guard = self.lock.lock().await;

        if self.validator.is_recently_validated() {
            return AuthOutcome {
                success: true,
                strategy_used: Some("cached_validation".to_string()),
                message: "Session validated recently".to_string(),
                strategies_tried: Vec::new(),
                errors: Vec::new(),
            };
        }

        let mut tried = Vec::new();
        let mut errors = Vec::new();

        for strategy in self.registry.strategies() {
            let name = strategy.name();
            tried.push(name.to_string());

            let (attempts, result) = self.run_strategy(strategy.as_ref(), court).await;
            match result {
                Ok(()) => {
                    info!(court, strategy = name, attempts, "Authenticated");
                    if let Err(e) = self.ctx.store.save(&self.ctx.http.session().snapshot()) {
                        warn!(error = %e, "Failed to persist session");
                    }
                    return AuthOutcome {
                        success: true,
                        strategy_used: Some(name.to_string()),
                        message: format!("Authenticated via {name}"),
                        strategies_tried: tried,
                        errors,
                    };
                }
                Err(e) => {
                    warn!(court, strategy = name, attempts, error_kind = e.kind(), error = %e, "Strategy failed");
                    errors.push(AuthDiagnostic {
                        strategy: name.to_string(),
                        error_kind: e.kind().to_string(),
                        message: e.to_string(),
                        attempts,
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        warn!(court, tried = tried.len(), "All authentication strategies failed");
        AuthOutcome {
            success: false,
            strategy_used: None,
            message: format!("All {} strategies failed", tried.len()),
            strategies_tried: tried,
            errors,
        }
    }

    /// Attempt then validate, retrying with backoff up to the strategy's
    /// limit. Only the last error is reported.
    async fn run_strategy(&self, strategy: &dyn AuthStrategy, court: &str) -> (u32, Result<()>) {
        let max_attempts = strategy.max_attempts().max(1);
        let mut backoff = Backoff::new(self.backoff.clone());
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = match strategy.attempt(court).await {
                Ok(()) => {
                    let validated = self
                        .validator
                        .validate(&self.ctx.http, &self.ctx.pacer.ecf_base(court))
                        .await;
                    // A token the court rejects must not be reused or persisted.
                    if validated.is_err() && strategy.name() == token::NAME {
                        debug!(court, "Dropping rejected session token");
                        self.ctx.http.session().clear_token();
                    }
                    validated
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => return (attempt, Ok(())),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = backoff.wait().await;
                    warn!(strategy = strategy.name(), attempt, ?delay, error = %e, "Retrying strategy");
                }
                Err(e) => return (attempt, Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PacerConfig;
    use crate::fetch::{HttpConfig, PacerHttp};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    struct Failing {
        name: &'static str,
        error: fn() -> AuthError,
        max: u32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl AuthStrategy for Failing {
        fn name(&self) -> &'static str {
            self.name
        }

        fn max_attempts(&self) -> u32 {
            self.max
        }

        async fn attempt(&self, _court: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err((self.error)())
        }
    }

    fn create_test_context(dir: &TempDir) -> Arc<AuthContext> {
        let pacer = PacerConfig::default();
        let http = PacerHttp::new(HttpConfig::default(), BackoffConfig::default(), SessionHandle::default()).unwrap();
        Arc::new(AuthContext {
            http,
            store: CredentialStore::new(dir.path().join("s.json"), pacer.session_domains.clone()),
            pacer,
        })
    }

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            initial_secs: 0.0,
            max_secs: 0.0,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    #[tokio::test]
    async fn test_all_fail_one_error_per_strategy() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let mut registry = StrategyRegistry::empty();
        registry.register(Box::new(Failing {
            name: "first",
            error: || AuthError::Network("down".into()),
            max: 3,
            calls: calls.clone(),
        }));
        registry.register(Box::new(Failing {
            name: "second",
            error: || AuthError::NoSessionCookies,
            max: 3,
            calls: calls.clone(),
        }));

        let auth = Authenticator::with_registry(create_test_context(&dir), registry, fast_backoff());
        let outcome = auth.authenticate("cacd").await;

        assert!(!outcome.success);
        assert_eq!(outcome.strategies_tried, vec!["first", "second"]);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].error_kind, "network");
        assert_eq!(outcome.errors[0].attempts, 3);
        // Not retryable, so tried once.
        assert_eq!(outcome.errors[1].attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_recent_validation_short_circuits() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let mut registry = StrategyRegistry::empty();
        registry.register(Box::new(Failing {
            name: "first",
            error: || AuthError::NoSessionCookies,
            max: 1,
            calls: calls.clone(),
        }));

        let auth = Authenticator::with_registry(create_test_context(&dir), registry, fast_backoff());
        auth.validator.record_success();

        let outcome = auth.authenticate("cacd").await;
        assert!(outcome.success);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        auth.invalidate();
        assert!(!auth.authenticate("cacd").await.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_status_without_credentials() {
        let dir = TempDir::new().unwrap();
        let auth = Authenticator::new(create_test_context(&dir), fast_backoff());
        let status = auth.status();
        assert!(!status.configured);
        assert_eq!(status.strategies, vec!["cso_token", "stored_cookies", "web_login"]);
        assert_eq!(status.cookie_count, 0);
    }
}
