use super::error::{AuthError, Result};
use super::strategy::{AuthContext, AuthStrategy};
use crate::fetch::html::parse_login_form;
use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, info};

pub const NAME: &str = "web_login";

const STILL_ON_LOGIN: [&str; 4] = ["pacer: login", "login.jsf", "loginform", "sign in"];
const LOGGED_IN: [&str; 6] = ["logout", "sign out", "logged in", "welcome", "case number", "docket"];

/// Court id the login service expects: `cacd` becomes `CACDC`.
pub fn court_login_id(court: &str) -> String {
    let upper = court.trim().to_uppercase();
    let base = upper.strip_suffix('D').unwrap_or(&upper);
    format!("{base}DC")
}

pub fn login_url(login_base: &str, ecf_base: &str, court: &str) -> String {
    let app_url = format!("{ecf_base}/cgi-bin/DktRpt.pl");
    let encoded: String = url::form_urlencoded::byte_serialize(app_url.as_bytes()).collect();
    format!(
        "{login_base}/csologin/login.jsf?pscCourtId={}&appurl={encoded}",
        court_login_id(court)
    )
}

/// After posting credentials: true only with signs of a session and no
/// sign of still sitting on the login page.
pub fn looks_logged_in(final_url: &str, body: &str) -> bool {
    let text = body.to_lowercase();
    let url = final_url.to_lowercase();
    let on_login = STILL_ON_LOGIN.iter().any(|m| text.contains(m) || url.contains(m));
    let authed = LOGGED_IN.iter().any(|m| text.contains(m));
    authed && !on_login
}

/// Fill and submit the login form.
pub struct WebLogin {
    ctx: Arc<AuthContext>,
}

impl WebLogin {
    pub fn new(ctx: Arc<AuthContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl AuthStrategy for WebLogin {
    fn name(&self) -> &'static str {
        NAME
    }

    fn max_attempts(&self) -> u32 {
        self.ctx.pacer.login_attempts.max(1)
    }

    async fn attempt(&self, court: &str) -> Result<()> {
        let pacer = &self.ctx.pacer;
        let creds = &pacer.credentials;
        let (Some(username), Some(password)) = (creds.username.as_deref(), creds.password.as_deref()) else {
            return Err(AuthError::MissingCredentials);
        };

        let url = login_url(pacer.login_base(), &pacer.ecf_base(court), court);
        let page = self.ctx.http.get(&url).await?;
        if !page.status.is_success() {
            return Err(AuthError::LoginRejected(format!(
                "login page returned HTTP {}",
                page.status.as_u16()
            )));
        }

        let form = parse_login_form(&page.text(), &page.final_url, username, password)
            .ok_or(AuthError::FormNotFound)?;
        debug!(court, action = %form.action, fields = form.fields.len(), "Submitting login form");

        let origin = Url::parse(&form.action)
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_else(|_| page.final_url.origin().ascii_serialization());
        let headers = [("Origin", origin), ("Referer", page.final_url.to_string())];

        let response = self.ctx.http.post_form(&form.action, &form.fields, &headers).await?;
        if looks_logged_in(response.final_url.as_str(), &response.text()) {
            info!(court, "Login form accepted");
            Ok(())
        } else {
            Err(AuthError::LoginRejected(format!(
                "still on the login page after submit (HTTP {}, {})",
                response.status.as_u16(),
                response.final_url
            )))
        }
    }
}
