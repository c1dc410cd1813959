//! Deciding whether the current session is actually logged in.
//!
//! Status codes are useless here: the login wall is served with 200. The
//! decision is made from the final url and the page content.

use super::error::{AuthError, Result};
use crate::fetch::PacerHttp;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const LOGIN_MARKERS: [&str; 8] = [
    "pacer: login",
    "login.jsf",
    "loginform",
    "jakarta.faces",
    "please log in",
    "sign in to continue",
    "session has expired",
    "not authorized",
];

const AUTHENTICATED_MARKERS: [&str; 6] = [
    "case number",
    "docket report",
    "search criteria",
    "case query",
    "welcome,",
    "my account",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageVerdict {
    Authenticated,
    LoginWall,
    Unclear,
}

/// Classify a fetched page. Authenticated markers win over login markers,
/// since docket pages often carry a logout link mentioning the login host.
pub fn classify_page(final_url: &str, body: &str) -> PageVerdict {
    let text = body.to_lowercase();
    let authenticated = AUTHENTICATED_MARKERS.iter().any(|m| text.contains(m));
    let login = LOGIN_MARKERS.iter().any(|m| text.contains(m));

    if authenticated {
        PageVerdict::Authenticated
    } else if login || final_url.to_lowercase().contains("login.jsf") {
        PageVerdict::LoginWall
    } else {
        PageVerdict::Unclear
    }
}

/// True when a response is the login page rather than the requested resource.
pub fn is_login_wall(final_url: &str, body: &str) -> bool {
    classify_page(final_url, body) == PageVerdict::LoginWall
}

/// Probes a court's docket query page and caches a positive result.
#[derive(Debug)]
pub struct SessionValidator {
    ttl: Duration,
    last_success: Mutex<Option<Instant>>,
}

impl SessionValidator {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            last_success: Mutex::new(None),
        }
    }

    pub fn is_recently_validated(&self) -> bool {
        let last = self.last_success.lock().unwrap_or_else(PoisonError::into_inner);
        last.is_some_and(|at| at.elapsed() < self.ttl)
    }

    pub fn record_success(&self) {
        *self.last_success.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    pub fn invalidate(&self) {
        *self.last_success.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Fetch `{ecf_base}/cgi-bin/DktRpt.pl` and judge the result.
    pub async fn validate(&self, http: &PacerHttp, ecf_base: &str) -> Result<()> {
        let url = format!("{ecf_base}/cgi-bin/DktRpt.pl");
        let page = http.get(&url).await?;
        let verdict = classify_page(page.final_url.as_str(), &page.text());

        debug!(url, status = page.status.as_u16(), ?verdict, "Session validation response");

        match verdict {
            PageVerdict::Authenticated => {
                self.record_success();
                info!(url, "Session validated");
                Ok(())
            }
            PageVerdict::LoginWall => {
                self.invalidate();
                Err(AuthError::ValidationFailed(format!("{url} returned the login page")))
            }
            PageVerdict::Unclear => {
                self.invalidate();
                Err(AuthError::ValidationFailed(format!(
                    "{url} returned no recognizable content (HTTP {})",
                    page.status.as_u16()
                )))
            }
        }
    }
}
