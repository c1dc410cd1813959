//! The process-wide authenticated session.
//!
//! Cookies live in a `cookie_store` jar that [`SessionHandle`] hands to the
//! HTTP client as its cookie provider, so cookies set anywhere (login
//! redirects, document fetches) land in the same place that gets persisted
//! to disk. The bearer token is kept beside the jar.

use chrono::{DateTime, Duration, Utc};
use cookie_store::{Cookie, CookieDomain, CookieStore};
use reqwest::Url;
use reqwest_cookie_store::CookieStoreRwLock;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Cookie names that indicate an authenticated session.
pub const SESSION_COOKIE_NAMES: [&str; 4] = ["NextGenCSO", "PacerSession", "JSESSIONID", "PacerUser"];

/// Name of the cookie carrying the bearer token.
pub const TOKEN_COOKIE: &str = "NextGenCSO";

/// Whether a cookie domain falls under one of the configured scopes.
pub fn domain_in_scope(domain: &str, scopes: &[String]) -> bool {
    let domain = domain.trim_start_matches('.').to_lowercase();
    scopes.iter().any(|scope| {
        let scope = scope.trim_start_matches('.').to_lowercase();
        domain == scope || domain.ends_with(&format!(".{scope}"))
    })
}

fn domain_of<'a>(cookie: &'a Cookie<'_>) -> Option<&'a str> {
    match &cookie.domain {
        CookieDomain::HostOnly(d) | CookieDomain::Suffix(d) => Some(d.as_str()),
        _ => None,
    }
}

fn jar_from<'a>(cookies: impl Iterator<Item = &'a Cookie<'static>>) -> CookieStore {
    match CookieStore::from_cookies(cookies.cloned().map(Ok::<_, Infallible>), false) {
        Ok(jar) => jar,
        Err(never) => match never {},
    }
}

/// Store a `Set-Cookie` line as though `domain` had sent it. A leading dot
/// on `domain` makes a domain cookie; anything else is host-only.
pub fn insert_cookie_line(jar: &mut CookieStore, line: &str, domain: &str, secure: bool) -> bool {
    let host = domain.trim_start_matches('.').to_lowercase();
    let scheme = if secure { "https" } else { "http" };
    let Ok(url) = Url::parse(&format!("{scheme}://{host}/")) else {
        return false;
    };

    let mut line = line.to_string();
    if domain.starts_with('.') {
        line.push_str(&format!("; Domain={host}"));
    }
    if secure {
        line.push_str("; Secure");
    }

    match jar.parse(&line, &url) {
        Ok(_) => true,
        Err(e) => {
            debug!(domain, error = ?e, "Cookie rejected");
            false
        }
    }
}

fn has_session_cookie(jar: &CookieStore, scopes: &[String]) -> bool {
    jar.iter_unexpired().any(|c| {
        SESSION_COOKIE_NAMES.contains(&c.name()) && domain_of(c).is_some_and(|d| domain_in_scope(d, scopes))
    })
}

/// Persisted jar: unexpired cookies only, session cookies included.
mod jar_serde {
    use super::{Cookie, CookieStore, jar_from};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(jar: &CookieStore, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(jar.iter_unexpired())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CookieStore, D::Error> {
        let cookies = Vec::<Cookie<'static>>::deserialize(deserializer)?;
        Ok(jar_from(cookies.iter()))
    }
}

/// The session as written to disk.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, with = "jar_serde")]
    pub cookies: CookieStore,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_acquired_at: Option<DateTime<Utc>>,
}

impl Session {
    /// `name=value` on path `/` of `domain`.
    pub fn insert_cookie(&mut self, name: &str, value: &str, domain: &str) -> bool {
        insert_cookie_line(&mut self.cookies, &format!("{name}={value}; Path=/"), domain, false)
    }

    pub fn cookie_count(&self) -> usize {
        self.cookies.iter_unexpired().count()
    }

    pub fn cookie_value(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter_unexpired()
            .find(|c| c.name() == name)
            .map(|c| c.value())
    }

    /// A known session cookie that is unexpired and inside `scopes`.
    pub fn has_session_cookie(&self, scopes: &[String]) -> bool {
        has_session_cookie(&self.cookies, scopes)
    }

    /// Drop every cookie outside `scopes`.
    pub fn retain_in_scope(&mut self, scopes: &[String]) {
        self.cookies = jar_from(
            self.cookies
                .iter_unexpired()
                .filter(|c| domain_of(c).is_some_and(|d| domain_in_scope(d, scopes))),
        );
    }

    pub fn set_token(&mut self, token: String, acquired_at: DateTime<Utc>) {
        self.token = Some(token);
        self.token_acquired_at = Some(acquired_at);
    }
}

#[derive(Debug, Clone, Default)]
struct TokenState {
    token: Option<String>,
    acquired_at: Option<DateTime<Utc>>,
}

/// Shared, lock-protected session. Cloning shares the same jar and token.
#[derive(Clone)]
pub struct SessionHandle {
    jar: Arc<CookieStoreRwLock>,
    token: Arc<RwLock<TokenState>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new(Session::default())
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("cookies", &self.cookie_count())
            .field("has_token", &self.has_token())
            .finish()
    }
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            jar: Arc::new(CookieStoreRwLock::new(session.cookies)),
            token: Arc::new(RwLock::new(TokenState {
                token: session.token,
                acquired_at: session.token_acquired_at,
            })),
        }
    }

    /// The jar, for use as the HTTP client's cookie provider.
    pub fn jar(&self) -> Arc<CookieStoreRwLock> {
        self.jar.clone()
    }

    fn cookies(&self) -> RwLockReadGuard<'_, CookieStore> {
        self.jar.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn cookies_mut(&self) -> RwLockWriteGuard<'_, CookieStore> {
        self.jar.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn token_state(&self) -> RwLockReadGuard<'_, TokenState> {
        self.token.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn token_state_mut(&self) -> RwLockWriteGuard<'_, TokenState> {
        self.token.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Session {
        let token = self.token_state().clone();
        Session {
            cookies: jar_from(self.cookies().iter_unexpired()),
            token: token.token,
            token_acquired_at: token.acquired_at,
        }
    }

    /// Merge a stored session in. Stored cookies replace live ones of the
    /// same name, domain and path; the stored token is only taken when none
    /// is held.
    pub fn restore(&self, stored: Session) {
        {
            let mut jar = self.cookies_mut();
            let merged = jar_from(jar.iter_unexpired().chain(stored.cookies.iter_unexpired()));
            *jar = merged;
        }
        let mut token = self.token_state_mut();
        if token.token.is_none() {
            if let (Some(value), Some(at)) = (stored.token, stored.token_acquired_at) {
                token.token = Some(value);
                token.acquired_at = Some(at);
            }
        }
    }

    pub fn insert_cookie(&self, name: &str, value: &str, domain: &str) -> bool {
        insert_cookie_line(&mut self.cookies_mut(), &format!("{name}={value}; Path=/"), domain, false)
    }

    pub fn insert_cookie_line(&self, line: &str, domain: &str, secure: bool) -> bool {
        insert_cookie_line(&mut self.cookies_mut(), line, domain, secure)
    }

    pub fn cookie_count(&self) -> usize {
        self.cookies().iter_unexpired().count()
    }

    pub fn has_session_cookie(&self, scopes: &[String]) -> bool {
        has_session_cookie(&self.cookies(), scopes)
    }

    pub fn set_token(&self, token: String, acquired_at: DateTime<Utc>) {
        let mut state = self.token_state_mut();
        state.token = Some(token);
        state.acquired_at = Some(acquired_at);
    }

    /// Forget the token along with every cookie carrying it.
    pub fn clear_token(&self) {
        *self.token_state_mut() = TokenState::default();
        let mut jar = self.cookies_mut();
        let kept = jar_from(jar.iter_unexpired().filter(|c| c.name() != TOKEN_COOKIE));
        *jar = kept;
    }

    pub fn has_token(&self) -> bool {
        self.token_state().token.is_some()
    }

    /// The token, if acquired less than `ttl` ago.
    pub fn fresh_token(&self, ttl: Duration, now: DateTime<Utc>) -> Option<String> {
        let state = self.token_state();
        match (&state.token, state.acquired_at) {
            (Some(token), Some(at)) if now - at < ttl => Some(token.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore as _;
    use reqwest::header::HeaderValue;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_domain_cookie_reaches_court_hosts() {
        let handle = SessionHandle::default();
        let headers = [HeaderValue::from_static(
            "NextGenCSO=abc123; Domain=.uscourts.gov; Path=/; Secure; HttpOnly; Max-Age=600",
        )];
        handle
            .jar()
            .set_cookies(&mut headers.iter(), &url("https://pacer.login.uscourts.gov/csologin/login.jsf"));

        let sent = handle.jar().cookies(&url("https://ecf.cacd.uscourts.gov/cgi-bin/DktRpt.pl"));
        assert_eq!(sent.unwrap().to_str().unwrap(), "NextGenCSO=abc123");
        assert!(handle.jar().cookies(&url("http://ecf.cacd.uscourts.gov/")).is_none());
        assert!(handle.has_session_cookie(&[".uscourts.gov".to_string()]));
    }

    #[test]
    fn test_foreign_domain_is_rejected() {
        let handle = SessionHandle::default();
        let headers = [HeaderValue::from_static("PacerSession=x; Domain=evil.com")];
        handle
            .jar()
            .set_cookies(&mut headers.iter(), &url("https://ecf.cacd.uscourts.gov/"));
        assert_eq!(handle.cookie_count(), 0);
    }

    #[test]
    fn test_host_only_cookie() {
        let mut session = Session::default();
        assert!(session.insert_cookie("JSESSIONID", "x", "127.0.0.1"));
        let handle = SessionHandle::new(session);

        assert!(handle.jar().cookies(&url("http://127.0.0.1:3000/cgi-bin/DktRpt.pl")).is_some());
        assert!(handle.jar().cookies(&url("http://localhost:3000/cgi-bin/x")).is_none());
    }

    #[test]
    fn test_has_session_cookie() {
        let scopes = vec![".uscourts.gov".to_string()];
        let mut session = Session::default();
        session.insert_cookie("tracking", "x", ".uscourts.gov");
        assert!(!session.has_session_cookie(&scopes));

        session.insert_cookie("PacerSession", "x", "example.com");
        assert!(!session.has_session_cookie(&scopes));

        session.insert_cookie("PacerSession", "x", "ecf.cacd.uscourts.gov");
        assert!(session.has_session_cookie(&scopes));

        session.retain_in_scope(&scopes);
        assert_eq!(session.cookie_count(), 2);
    }

    #[test]
    fn test_fresh_token() {
        let now = Utc::now();
        let handle = SessionHandle::default();
        assert!(handle.fresh_token(Duration::minutes(30), now).is_none());

        handle.set_token("tok".into(), now - Duration::minutes(10));
        assert_eq!(handle.fresh_token(Duration::minutes(30), now).as_deref(), Some("tok"));

        handle.set_token("tok".into(), now - Duration::minutes(31));
        assert!(handle.fresh_token(Duration::minutes(30), now).is_none());
    }

    #[test]
    fn test_clear_token_drops_token_cookies() {
        let handle = SessionHandle::default();
        handle.set_token("tok".into(), Utc::now());
        handle.insert_cookie(TOKEN_COOKIE, "tok", "127.0.0.1");
        handle.insert_cookie("PacerUser", "bob", "127.0.0.1");

        handle.clear_token();
        assert!(!handle.has_token());
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.cookie_value(TOKEN_COOKIE), None);
        assert_eq!(snapshot.cookie_value("PacerUser"), Some("bob"));
    }

    #[test]
    fn test_restore_prefers_stored_cookies() {
        let handle = SessionHandle::default();
        handle.insert_cookie("PacerSession", "live", "127.0.0.1");
        handle.set_token("live-token".into(), Utc::now());

        let mut stored = Session::default();
        stored.insert_cookie("PacerSession", "stored", "127.0.0.1");
        stored.set_token("stored-token".into(), Utc::now());
        handle.restore(stored);

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.cookie_count(), 1);
        assert_eq!(snapshot.cookie_value("PacerSession"), Some("stored"));
        assert_eq!(snapshot.token.as_deref(), Some("live-token"));
    }

    #[test]
    fn test_session_cookies_survive_serialization() {
        let mut session = Session::default();
        session.insert_cookie("PacerSession", "s1", "127.0.0.1");
        session.set_token("tok".into(), Utc::now());

        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cookie_value("PacerSession"), Some("s1"));
        assert_eq!(back.token.as_deref(), Some("tok"));
    }
}
