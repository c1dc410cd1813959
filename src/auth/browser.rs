//! Headless Chromium login, compiled only with the `browser` feature.

use super::strategy::{AuthContext, AuthStrategy};
use std::sync::Arc;

pub const NAME: &str = "browser_login";

#[cfg(feature = "browser")]
pub fn strategy(ctx: Arc<AuthContext>) -> Option<Box<dyn AuthStrategy>> {
    Some(Box::new(imp::BrowserLogin::new(ctx)))
}

#[cfg(not(feature = "browser"))]
pub fn strategy(_ctx: Arc<AuthContext>) -> Option<Box<dyn AuthStrategy>> {
    None
}

#[cfg(feature = "browser")]
mod imp {
    use super::NAME;
    use crate::auth::error::{AuthError, Result};
    use crate::auth::strategy::{AuthContext, AuthStrategy};
    use crate::auth::web_login::{login_url, looks_logged_in};
    use async_trait::async_trait;
    use chrono::Utc;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing::{debug, info};

    const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(45);

    pub struct BrowserLogin {
        ctx: Arc<AuthContext>,
    }

    impl BrowserLogin {
        pub fn new(ctx: Arc<AuthContext>) -> Self {
            Self { ctx }
        }

        async fn launch(&self) -> Result<Browser> {
            let mut builder = BrowserConfig::builder()
                .arg("--headless=new")
                .arg("--disable-gpu")
                .arg("--no-sandbox")
                .arg("--disable-dev-shm-usage");
            if let Some(path) = &self.ctx.pacer.browser_executable {
                builder = builder.chrome_executable(path);
            }
            let config = builder.build().map_err(AuthError::Browser)?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| AuthError::Browser(format!("failed to launch Chromium: {e}")))?;

            tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    let _ = event;
                }
            });
            Ok(browser)
        }

        async fn login(&self, browser: &Browser, court: &str, username: &str, password: &str) -> Result<()> {
            let pacer = &self.ctx.pacer;
            let url = login_url(pacer.login_base(), &pacer.ecf_base(court), court);
            let err = |e: chromiumoxide::error::CdpError| AuthError::Browser(e.to_string());

            let page = browser.new_page(url.as_str()).await.map_err(err)?;
            page.wait_for_navigation().await.map_err(err)?;

            let fill = format!(
                r#"(() => {{
                    const user = document.getElementById('loginForm:loginName');
                    const pass = document.getElementById('loginForm:password');
                    if (!user || !pass) return false;
                    user.value = {user};
                    pass.value = {pass};
                    const btn = document.querySelector("button[name='loginForm:fbtnLogin'], input[name='loginForm:fbtnLogin']");
                    if (btn) {{ btn.click(); }} else {{ user.form.submit(); }}
                    return true;
                }})()"#,
                user = serde_json::Value::from(username),
                pass = serde_json::Value::from(password),
            );
            let submitted: bool = page
                .evaluate(fill.as_str())
                .await
                .map_err(err)?
                .into_value()
                .map_err(|e| AuthError::Browser(format!("{e:?}")))?;
            if !submitted {
                return Err(AuthError::FormNotFound);
            }

            tokio::time::timeout(NAVIGATION_TIMEOUT, page.wait_for_navigation())
                .await
                .map_err(|_| AuthError::Browser("timed out waiting for login".into()))?
                .map_err(err)?;

            let final_url = page.url().await.map_err(err)?.unwrap_or_default();
            let html = page.content().await.map_err(err)?;
            if !looks_logged_in(&final_url, &html) {
                return Err(AuthError::LoginRejected(format!("browser still on login page at {final_url}")));
            }

            let cookies = page.get_cookies().await.map_err(err)?;
            let session = self.ctx.http.session();
            let now = Utc::now().timestamp();
            for c in cookies {
                let mut line = format!("{}={}; Path={}", c.name, c.value, c.path);
                // Chromium reports session cookies with a non-positive expiry.
                if c.expires > 0.0 {
                    line.push_str(&format!("; Max-Age={}", (c.expires as i64 - now).max(0)));
                }
                let stored = session.insert_cookie_line(&line, &c.domain, c.secure);
                debug!(name = %c.name, domain = %c.domain, stored, "Imported browser cookie");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl AuthStrategy for BrowserLogin {
        fn name(&self) -> &'static str {
            NAME
        }

        async fn attempt(&self, court: &str) -> Result<()> {
            let creds = &self.ctx.pacer.credentials;
            let (Some(username), Some(password)) = (creds.username.as_deref(), creds.password.as_deref()) else {
                return Err(AuthError::MissingCredentials);
            };

            let mut browser = self.launch().await?;
            let result = self.login(&browser, court, username, password).await;
            let _ = browser.close().await;
            if result.is_ok() {
                info!(court, "Browser login succeeded");
            }
            result
        }
    }
}
