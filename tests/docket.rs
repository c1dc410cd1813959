mod common;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::{Router, http::HeaderMap, response::Html, routing::get};
use tempfile::TempDir;

use common::{DOCKET_PAGE, LOGIN_PAGE, create_test_config, create_test_service, has_cookie, spawn};
use courtfetch::auth::{CredentialStore, Session};
use courtfetch::config::Config;
use courtfetch::fetch::FetchError;
use courtfetch::ledger::{Charge, ResourceKind};
use courtfetch::money::Usd;
use courtfetch::service::{AcquisitionService, ServiceError};

const CASE_NUMBER: &str = "2:24-cv-00042";
const CASE_ID: &str = "901234";

/// What the docket query answers with once the form is posted.
#[derive(Clone, Copy)]
enum Report {
    Entries(usize),
    LoginWall,
}

fn report_page(entries: usize) -> String {
    let rows: String = (1..=entries)
        .map(|n| format!("<tr><td>01/{:02}/2024</td><td>{n}</td><td>Entry {n} filed</td></tr>", n % 28 + 1))
        .collect();
    format!(
        "<html><head><title>Docket Report</title></head><body>\
         <h3>Doe v. Acme Corp</h3><p>Assigned to: Judge Jane Smith</p>\
         <table><tr><td><b>Plaintiff</b></td></tr>\
         <tr><td>Jane Doe</td><td>represented by</td>\
         <td><b>Ann Counsel</b><br>Counsel Law Group LLP<br>Email: ann@example.com</td></tr></table>\
         <table><tr><th>Date Filed</th><th>#</th><th>Docket Text</th></tr>{rows}</table>\
         </body></html>"
    )
}

/// Docket query form behind the session cookie, and the report it posts to.
fn docket_site(report: Report, posts: Arc<AtomicU32>) -> Router {
    Router::new().route(
        "/cgi-bin/DktRpt.pl",
        get(|headers: HeaderMap| async move {
            if has_cookie(&headers, "PacerSession") {
                Html(DOCKET_PAGE)
            } else {
                Html(LOGIN_PAGE)
            }
        })
        .post(move |body: String| {
            let posts = posts.clone();
            async move {
                posts.fetch_add(1, Ordering::SeqCst);
                if !body.contains(&format!("all_case_ids={CASE_ID}")) {
                    return Html("<html><body><p>No case selected</p></body></html>".to_string());
                }
                match report {
                    Report::Entries(n) => Html(report_page(n)),
                    Report::LoginWall => Html(LOGIN_PAGE.to_string()),
                }
            }
        }),
    )
}

fn seed_session(data_dir: &Path) {
    let mut session = Session::default();
    session.insert_cookie("PacerSession", "s3ss10n", "127.0.0.1");
    CredentialStore::new(data_dir.join("pacer_session.json"), vec!["127.0.0.1".into()])
        .save(&session)
        .unwrap();
}

fn create_config(temp: &TempDir, base: &str) -> Config {
    seed_session(temp.path());
    let mut config = create_test_config(temp.path(), base);
    config.pacer.use_token_api = false;
    config
}

fn create_service(config: Config) -> AcquisitionService {
    let service = create_test_service(config);
    service
        .context()
        .store
        .remember_case_id("cacd", CASE_NUMBER, CASE_ID)
        .unwrap();
    service
}

#[tokio::test]
async fn test_docket_is_parsed_and_billed_by_entry_count() {
    let temp = TempDir::new().unwrap();
    let posts = Arc::new(AtomicU32::new(0));
    let base = spawn(docket_site(Report::Entries(45), posts.clone())).await;
    let service = create_service(create_config(&temp, &base));

    let sheet = service.fetch_docket("CACD", CASE_NUMBER).await.unwrap();
    assert_eq!(sheet.court, "cacd");
    assert_eq!(sheet.case_id, CASE_ID);
    assert_eq!(sheet.url, format!("{base}/cgi-bin/DktRpt.pl?{CASE_ID}"));
    assert_eq!(sheet.title.as_deref(), Some("Doe v. Acme Corp"));
    assert_eq!(sheet.judge.as_deref(), Some("Jane Smith"));
    assert_eq!(sheet.entry_count, 45);
    assert_eq!(sheet.entries[0].number.as_deref(), Some("1"));
    assert_eq!(sheet.entries[44].text, "Entry 45 filed");

    assert_eq!(sheet.attorneys.len(), 1);
    let attorney = &sheet.attorneys[0];
    assert_eq!(attorney.name, "Ann Counsel");
    assert_eq!(attorney.firm.as_deref(), Some("Counsel Law Group LLP"));
    assert_eq!(attorney.email.as_deref(), Some("ann@example.com"));
    assert_eq!(attorney.party_type.as_deref(), Some("Plaintiff"));

    // 45 entries at 20 per page.
    assert_eq!(sheet.pages, 3);
    assert_eq!(sheet.cost, Usd::from_cents(30));
    assert_eq!(posts.load(Ordering::SeqCst), 1);

    let charges = service.recent_charges(10).unwrap();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].resource_kind, ResourceKind::DocketSheet);
    assert_eq!(charges[0].court, "cacd");
    assert_eq!(charges[0].case_id.as_deref(), Some(CASE_ID));
    assert_eq!(charges[0].pages_billed, 3);
    assert_eq!(charges[0].amount_usd, Usd::from_cents(30));
    assert_eq!(service.total_spent_today().unwrap(), Usd::from_cents(30));
    assert_eq!(service.get_status().unwrap().metrics.dockets_fetched, 1);
}

#[tokio::test]
async fn test_long_docket_charge_is_capped() {
    let temp = TempDir::new().unwrap();
    let posts = Arc::new(AtomicU32::new(0));
    let base = spawn(docket_site(Report::Entries(650), posts.clone())).await;
    let service = create_service(create_config(&temp, &base));

    let sheet = service.fetch_docket("cacd", CASE_NUMBER).await.unwrap();
    assert_eq!(sheet.entry_count, 650);
    assert_eq!(sheet.pages, 30);
    assert_eq!(sheet.cost, Usd::from_cents(300));

    let charges = service.recent_charges(10).unwrap();
    assert_eq!(charges[0].pages_billed, 30);
    assert_eq!(charges[0].amount_usd, Usd::from_cents(300));
}

#[tokio::test]
async fn test_login_wall_on_report_is_not_charged() {
    let temp = TempDir::new().unwrap();
    let posts = Arc::new(AtomicU32::new(0));
    let base = spawn(docket_site(Report::LoginWall, posts.clone())).await;
    let service = create_service(create_config(&temp, &base));

    let result = service.fetch_docket("cacd", CASE_NUMBER).await;
    assert!(
        matches!(result, Err(ServiceError::Fetch(FetchError::LoginRequired(_)))),
        "{result:?}"
    );
    assert_eq!(posts.load(Ordering::SeqCst), 1);
    assert!(service.recent_charges(10).unwrap().is_empty());
    assert!(!service.get_status().unwrap().auth.recently_validated);
}

#[tokio::test]
async fn test_spent_budget_blocks_docket_before_any_request() {
    let temp = TempDir::new().unwrap();
    let posts = Arc::new(AtomicU32::new(0));
    let base = spawn(docket_site(Report::Entries(5), posts.clone())).await;
    let mut config = create_config(&temp, &base);
    config.discovery.daily_budget = Usd::from_cents(100);
    let service = create_service(config);

    let spent = Charge::new(ResourceKind::DocumentPdf, "cacd", 10, Usd::from_cents(100));
    service.context().ledger.record_charge(&spent).unwrap();

    let result = service.fetch_docket("cacd", CASE_NUMBER).await;
    assert!(matches!(result, Err(ServiceError::BudgetExhausted(_))), "{result:?}");
    assert_eq!(posts.load(Ordering::SeqCst), 0);
    assert_eq!(service.recent_charges(10).unwrap().len(), 1);
}
