use super::error::{AuthError, Result};
use super::strategy::{AuthContext, AuthStrategy};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "stored_cookies";

/// Reuse cookies persisted by an earlier run.
pub struct StoredCookies {
    ctx: Arc<AuthContext>,
}

impl StoredCookies {
    pub fn new(ctx: Arc<AuthContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl AuthStrategy for StoredCookies {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn attempt(&self, court: &str) -> Result<()> {
        let session = self.ctx.http.session();
        session.restore(self.ctx.store.load());

        if session.has_session_cookie(&self.ctx.pacer.session_domains) {
            debug!(court, cookies = session.cookie_count(), "Found stored session cookies");
            Ok(())
        } else {
            Err(AuthError::NoSessionCookies)
        }
    }
}
