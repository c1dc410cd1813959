//! Bearer token exchange against the login service's JSON endpoints.

use super::error::{AuthError, Result};
use super::session::TOKEN_COOKIE;
use super::strategy::{AuthContext, AuthStrategy};
use crate::fetch::PageResponse;
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

pub const NAME: &str = "cso_token";

const TOKEN_HEADER: &str = "X-NEXT-GEN-CSO";

static XML_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<nextGenCSO>\s*([^<\s]+)\s*</nextGenCSO>").unwrap());

pub struct TokenExchange {
    ctx: Arc<AuthContext>,
}

impl TokenExchange {
    pub fn new(ctx: Arc<AuthContext>) -> Self {
        Self { ctx }
    }

    async fn exchange(&self) -> Result<String> {
        let creds = &self.ctx.pacer.credentials;
        let (Some(username), Some(password)) = (creds.username.as_deref(), creds.password.as_deref()) else {
            return Err(AuthError::MissingCredentials);
        };
        let base = self.ctx.pacer.token_base();
        let mut failures: Vec<AuthError> = Vec::new();

        let auth_url = format!("{base}/services/auth");
        match self
            .ctx
            .http
            .post_json(&auth_url, &json!({ "username": username, "password": password }))
            .await
        {
            Ok(page) => match token_from_response(&page) {
                Some(token) => return Ok(token),
                None => failures.push(AuthError::TokenExchange(format!(
                    "{auth_url} returned HTTP {} without a token",
                    page.status.as_u16()
                ))),
            },
            Err(e) => failures.push(e.into()),
        }

        let mut body = json!({
            "loginId": username,
            "password": password,
            "redactFlag": "1",
        });
        if let Some(client_code) = creds.client_code.as_deref() {
            body["clientCode"] = Value::from(client_code);
        }
        if let Some(otp) = creds.otp_code.as_deref() {
            body["otpCode"] = Value::from(otp);
        }

        let cso_url = format!("{base}/services/cso-auth");
        match self.ctx.http.post_json(&cso_url, &body).await {
            Ok(page) => match token_from_response(&page) {
                Some(token) => return Ok(token),
                None => failures.push(AuthError::TokenExchange(format!(
                    "{cso_url} returned HTTP {} without a token",
                    page.status.as_u16()
                ))),
            },
            Err(e) => failures.push(e.into()),
        }

        Err(combine(failures))
    }

    /// The token rides along as a cookie both on the shared domain and on
    /// the hosts actually being talked to.
    fn install_token(&self, court: &str, token: &str) {
        let pacer = &self.ctx.pacer;
        let mut domains = vec![pacer.cookie_domain.clone()];
        for base in [pacer.ecf_base(court), pacer.login_base().to_string()] {
            if let Some(host) = url::Url::parse(&base).ok().and_then(|u| u.host_str().map(str::to_string)) {
                domains.push(host);
            }
        }

        let session = self.ctx.http.session();
        session.set_token(token.to_string(), Utc::now());
        for domain in domains {
            session.insert_cookie(TOKEN_COOKIE, token, &domain);
        }
    }
}

#[async_trait]
impl AuthStrategy for TokenExchange {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn attempt(&self, court: &str) -> Result<()> {
        let ttl = chrono::Duration::seconds(self.ctx.pacer.token_ttl_secs as i64);
        let cached = self.ctx.http.session().fresh_token(ttl, Utc::now());

        if let Some(token) = cached {
            debug!(court, "Reusing cached token");
            self.install_token(court, &token);
            return Ok(());
        }

        let token = self.exchange().await?;
        self.install_token(court, &token);
        info!(court, "Obtained session token");
        Ok(())
    }
}

/// Network errors only when every endpoint failed at the network level.
fn combine(failures: Vec<AuthError>) -> AuthError {
    let all_network = !failures.is_empty() && failures.iter().all(|e| matches!(e, AuthError::Network(_)));
    let message = failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    warn!(message, "Token exchange failed");
    if all_network {
        AuthError::Network(message)
    } else {
        AuthError::TokenExchange(message)
    }
}

/// Look for a token in the response header, a JSON body, then an XML body.
pub fn token_from_response(page: &PageResponse) -> Option<String> {
    if let Some(token) = page.header(TOKEN_HEADER).filter(|t| !t.trim().is_empty()) {
        return Some(token.trim().to_string());
    }
    if !page.status.is_success() {
        return None;
    }
    token_from_body(&page.text())
}

pub fn token_from_body(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["nextGenCSO", "nextgencso"] {
            if let Some(token) = value.get(key).and_then(Value::as_str).filter(|t| !t.is_empty()) {
                return Some(token.to_string());
            }
        }
        return None;
    }
    XML_TOKEN
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
