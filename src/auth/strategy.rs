use super::error::Result;
use super::store::CredentialStore;
use super::{browser, cached, token, web_login};
use crate::config::PacerConfig;
use crate::fetch::PacerHttp;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Everything a strategy needs to talk to the login service.
pub struct AuthContext {
    pub http: PacerHttp,
    pub pacer: PacerConfig,
    pub store: CredentialStore,
}

/// One way of obtaining a session. Returning `Ok` only claims success; the
/// authenticator still validates the session afterwards.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Attempts made before moving on to the next strategy.
    fn max_attempts(&self) -> u32 {
        1
    }

    async fn attempt(&self, court: &str) -> Result<()>;
}

/// A strategy that was left out of the chain, and why.
#[derive(Debug, Clone, Serialize)]
pub struct UnavailableStrategy {
    pub name: &'static str,
    pub reason: String,
}

/// Ordered strategy chain built from configuration.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn AuthStrategy>>,
    unavailable: Vec<UnavailableStrategy>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
            unavailable: Vec::new(),
        }
    }

    /// Chain order: token exchange, stored cookies, web login, browser.
    pub fn from_config(ctx: Arc<AuthContext>) -> Self {
        let mut registry = Self::empty();

        if ctx.pacer.use_token_api {
            registry.register(Box::new(token::TokenExchange::new(ctx.clone())));
        } else {
            registry.mark_unavailable(token::NAME, "disabled by pacer.use_token_api");
        }

        registry.register(Box::new(cached::StoredCookies::new(ctx.clone())));
        registry.register(Box::new(web_login::WebLogin::new(ctx.clone())));

        if ctx.pacer.browser_login {
            match browser::strategy(ctx) {
                Some(strategy) => registry.register(strategy),
                None => registry.mark_unavailable(browser::NAME, "built without the `browser` feature"),
            }
        } else {
            registry.mark_unavailable(browser::NAME, "disabled by pacer.browser_login");
        }

        registry
    }

    pub fn register(&mut self, strategy: Box<dyn AuthStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn mark_unavailable(&mut self, name: &'static str, reason: impl Into<String>) {
        self.unavailable.push(UnavailableStrategy {
            name,
            reason: reason.into(),
        });
    }

    pub fn strategies(&self) -> &[Box<dyn AuthStrategy>] {
        &self.strategies
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn unavailable(&self) -> &[UnavailableStrategy] {
        &self.unavailable
    }
}
