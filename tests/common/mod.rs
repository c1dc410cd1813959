//! Shared fixtures: local mock court sites and a pipeline wired against them.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::http::HeaderMap;
use serde_json::json;

use courtfetch::backoff::BackoffConfig;
use courtfetch::config::{Config, PacerCredentials, StorageProvider};
use courtfetch::service::{AcquisitionService, AppContext};
use courtfetch::triggers::DiscoveredItem;

pub const DOCKET_PAGE: &str = "<html><head><title>Docket Report</title></head>\
    <body><h3>Case Number</h3><form action=\"../cgi-bin/DktRpt.pl?1-L_1_0-1\" method=\"post\"></form></body></html>";

pub const LOGIN_PAGE: &str = "<html><head><title>PACER: Login</title></head><body>\
    <form id=\"loginForm\" name=\"loginForm\" action=\"/csologin/login.jsf\" method=\"post\">\
    <input type=\"hidden\" name=\"javax.faces.ViewState\" value=\"state-1\"/>\
    <input type=\"text\" id=\"loginForm:loginName\" name=\"loginForm:loginName\"/>\
    <input type=\"password\" id=\"loginForm:password\" name=\"loginForm:password\"/>\
    </form></body></html>";

/// Serve `router` on an ephemeral port and return its base url.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn has_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(';').any(|pair| pair.trim().starts_with(&format!("{name}="))))
}

fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        initial_secs: 0.1,
        max_secs: 0.1,
        multiplier: 1.0,
        jitter: 0.0,
    }
}

/// Configuration pointing every external endpoint at `base`, with the token
/// service unreachable.
pub fn create_test_config(data_dir: &Path, base: &str) -> Config {
    let mut config = Config::default();
    config.server.data_dir = data_dir.to_path_buf();
    config.storage.provider = StorageProvider::Local;
    config.discovery.enabled = true;

    let pacer = &mut config.pacer;
    pacer.login_base_url = base.to_string();
    pacer.token_base_url = Some("http://127.0.0.1:1".to_string());
    pacer.ecf_base_url = base.to_string();
    pacer.session_domains = vec!["127.0.0.1".to_string()];
    pacer.cookie_domain = "127.0.0.1".to_string();
    pacer.max_fetch_retries = 1;
    pacer.login_attempts = 1;
    pacer.connect_timeout_secs = 2;
    pacer.request_timeout_secs = 5;
    pacer.credentials = PacerCredentials {
        username: Some("tester".into()),
        password: Some("secret".into()),
        ..Default::default()
    };

    config.backoff = fast_backoff();
    config
}

pub fn create_test_service(config: Config) -> AcquisitionService {
    let ctx = AppContext::build(config).unwrap();
    AcquisitionService::new(Arc::new(ctx))
}

/// An employment case (NOS 442) naming `doc_url` as its document.
pub fn employment_item(doc_url: &str) -> DiscoveredItem {
    serde_json::from_value(json!({
        "id": "rss-1",
        "court_code": "cacd",
        "case_number": "2:24-cv-00042",
        "title": "Doe v. Acme",
        "metadata": {"doc1_url": doc_url, "nos": {"code": "442"}},
    }))
    .unwrap()
}
