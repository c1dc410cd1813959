use super::html::{Attorney, DocketEntry, form_action, parse_docket};
use super::{FetchError, PacerHttp, PageResponse, Result};
use crate::auth::is_login_wall;
use crate::ledger::CostModel;
use crate::money::Usd;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, info};

static CASE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"DktRpt\.pl\?(\d+)").unwrap());

/// Internal case id from a docket report link, e.g. `.../DktRpt.pl?428464`.
pub fn extract_case_id(link: &str) -> Option<String> {
    CASE_ID
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct DocketSheet {
    pub court: String,
    pub case_number: String,
    pub case_id: String,
    pub url: String,
    pub title: Option<String>,
    pub judge: Option<String>,
    pub entry_count: usize,
    pub entries: Vec<DocketEntry>,
    pub attorneys: Vec<Attorney>,
    pub pages: u32,
    pub cost: Usd,
}

fn query_fields(case_id: &str) -> Vec<(String, String)> {
    let on = || "on".to_string();
    vec![
        ("all_case_ids".to_string(), case_id.to_string()),
        (format!("CaseNum_{case_id}"), on()),
        ("list_of_parties_and_counsel".to_string(), on()),
        ("terminated_parties".to_string(), on()),
        ("output_format".to_string(), "html".to_string()),
        ("sort1".to_string(), "oldest date first".to_string()),
    ]
}

fn ensure_page(page: &PageResponse, url: &str) -> Result<()> {
    if is_login_wall(page.final_url.as_str(), &page.text()) {
        return Err(FetchError::LoginRequired(url.to_string()));
    }
    if !page.status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: page.status.as_u16(),
        });
    }
    Ok(())
}

/// Runs the two-step docket report query: load the form, then post it with
/// parties and counsel included.
#[derive(Clone)]
pub struct DocketFetcher {
    http: PacerHttp,
    costs: CostModel,
}

impl DocketFetcher {
    pub fn new(http: PacerHttp, costs: CostModel) -> Self {
        Self { http, costs }
    }

    pub async fn fetch(&self, ecf_base: &str, court: &str, case_number: &str, case_id: &str) -> Result<DocketSheet> {
        let form_url = format!("{ecf_base}/cgi-bin/DktRpt.pl?{case_id}");
        let form_page = self.http.get(&form_url).await?;
        ensure_page(&form_page, &form_url)?;

        let action = form_action(&form_page.text(), &form_page.final_url)
            .ok_or_else(|| FetchError::DocketFormNotFound(form_url.clone()))?;
        debug!(court, case_number, action, "Submitting docket query");

        let headers = [("Referer", form_page.final_url.to_string())];
        let report = self
            .http
            .post_form(&action, &query_fields(case_id), &headers)
            .await?;
        ensure_page(&report, &action)?;

        let parsed = parse_docket(&report.text());
        let pages = self.costs.docket_pages(parsed.entries.len());
        let cost = self.costs.cost_for_pages(pages);

        info!(
            court,
            case_number,
            entries = parsed.entries.len(),
            attorneys = parsed.attorneys.len(),
            pages,
            %cost,
            "Docket retrieved"
        );

        Ok(DocketSheet {
            court: court.to_string(),
            case_number: case_number.to_string(),
            case_id: case_id.to_string(),
            url: form_url,
            title: parsed.title,
            judge: parsed.judge,
            entry_count: parsed.entries.len(),
            entries: parsed.entries,
            attorneys: parsed.attorneys,
            pages,
            cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_case_id() {
        assert_eq!(
            extract_case_id("https://ecf.cand.uscourts.gov/cgi-bin/DktRpt.pl?428464").as_deref(),
            Some("428464")
        );
        assert_eq!(extract_case_id("https://ecf.cand.uscourts.gov/doc1/123"), None);
    }

    #[test]
    fn test_query_fields() {
        let fields = query_fields("77");
        assert!(fields.contains(&("all_case_ids".to_string(), "77".to_string())));
        assert!(fields.contains(&("CaseNum_77".to_string(), "on".to_string())));
        assert!(fields.contains(&("list_of_parties_and_counsel".to_string(), "on".to_string())));
        assert_eq!(fields.len(), 6);
    }
}
