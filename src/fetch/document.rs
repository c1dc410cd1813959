use super::html::find_document_link;
use super::{FetchError, PacerHttp, PageResponse, Result};
use crate::auth::is_login_wall;
use crate::ledger::CostModel;
use crate::money::Usd;
use crate::storage::{DocumentStore, is_pdf};
use bytes::Bytes;
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, info, warn};

const PDF_ACCEPT: &str = "application/pdf,application/octet-stream;q=0.9,*/*;q=0.8";

#[derive(Debug, Clone, Serialize)]
pub struct FetchedDocument {
    pub doc_id: String,
    pub court: String,
    pub storage_key: String,
    pub case_id: Option<String>,
    pub bytes: u64,
    pub pages: u32,
    pub cost: Usd,
    pub cached: bool,
}

/// Identifiers carried by a `/doc1/` url.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocUrlParts {
    pub doc_id: Option<String>,
    pub case_id: Option<String>,
    pub de_seq_num: Option<String>,
}

pub fn parse_doc_url(url: &Url) -> DocUrlParts {
    let mut segments = url.path_segments().into_iter().flatten();
    let doc_id = segments
        .by_ref()
        .find(|s| *s == "doc1")
        .and_then(|_| segments.next())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let query = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    };

    DocUrlParts {
        doc_id,
        case_id: query("caseid"),
        de_seq_num: query("de_seq_num"),
    }
}

/// The `/doc1/{id}` segment, else a stable hash of the url.
pub fn document_id(url: &Url) -> String {
    parse_doc_url(url).doc_id.unwrap_or_else(|| {
        let hash = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, url.as_str().as_bytes());
        hash.simple().to_string()[..16].to_string()
    })
}

/// Court codes are letters only; anything else is replaced by the court in
/// an `ecf.{court}.` host.
pub fn resolve_court(court: &str, url: &Url) -> String {
    let court = court.trim().to_lowercase();
    if !court.is_empty() && court.chars().all(|c| c.is_ascii_alphabetic()) {
        return court;
    }
    url.host_str()
        .and_then(|h| h.strip_prefix("ecf."))
        .and_then(|rest| rest.split('.').next())
        .filter(|c| !c.is_empty())
        .map(str::to_lowercase)
        .unwrap_or(court)
}

fn with_param(url: &Url, key: &str, value: &str) -> Url {
    if url.query_pairs().any(|(k, _)| k == key) {
        return url.clone();
    }
    let mut url = url.clone();
    url.query_pairs_mut().append_pair(key, value);
    url
}

/// Urls tried in order until one answers 200.
pub fn candidate_urls(url: &Url) -> Vec<String> {
    let mut candidates = vec![
        url.to_string(),
        with_param(url, "download", "1").to_string(),
        with_param(url, "pdf_header", "1").to_string(),
        with_param(&with_param(url, "download", "1"), "pdf_header", "1").to_string(),
    ];

    let parts = parse_doc_url(url);
    if let (Some(case_id), Some(seq)) = (&parts.case_id, &parts.de_seq_num) {
        let origin = url.origin().ascii_serialization();
        candidates.push(format!("{origin}/show_temp.pl?caseid={case_id}&de_seq_num={seq}&pdf_header=1"));
        if let Some(doc_id) = &parts.doc_id {
            candidates.push(format!(
                "{origin}/doc1/{doc_id}?caseid={case_id}&de_seq_num={seq}&download=1&pdf_header=1"
            ));
        }
    }

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}

fn check_login_wall(page: &PageResponse) -> Result<()> {
    if !is_pdf(&page.body) && is_login_wall(page.final_url.as_str(), &page.text()) {
        return Err(FetchError::LoginRequired(page.final_url.to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct DocumentFetcher {
    http: PacerHttp,
    documents: DocumentStore,
    costs: CostModel,
}

impl DocumentFetcher {
    pub fn new(http: PacerHttp, documents: DocumentStore, costs: CostModel) -> Self {
        Self { http, documents, costs }
    }

    /// A previously stored document, at no cost.
    pub async fn lookup_cached(&self, court: &str, doc_url: &str) -> Result<Option<FetchedDocument>> {
        let url = Url::parse(doc_url).map_err(|e| FetchError::InvalidUrl(format!("{doc_url}: {e}")))?;
        let court = resolve_court(court, &url);
        let doc_id = document_id(&url);

        let Some(bytes) = self.documents.cached_pdf(&court, &doc_id).await? else {
            return Ok(None);
        };
        debug!(court, doc_id, "Serving document from cache");
        Ok(Some(FetchedDocument {
            storage_key: crate::storage::pdf_key(&court, &doc_id),
            case_id: parse_doc_url(&url).case_id,
            bytes: bytes.len() as u64,
            pages: 0,
            cost: Usd::ZERO,
            cached: true,
            doc_id,
            court,
        }))
    }

    /// Download and store a document. Responses that are not a PDF, even
    /// after one follow-up link, are stored as debug files and rejected.
    pub async fn download(&self, court: &str, doc_url: &str) -> Result<FetchedDocument> {
        let url = Url::parse(doc_url).map_err(|e| FetchError::InvalidUrl(format!("{doc_url}: {e}")))?;
        let court = resolve_court(court, &url);
        let doc_id = document_id(&url);
        let headers = [("Accept", PDF_ACCEPT.to_string())];

        let mut chosen: Option<PageResponse> = None;
        let mut last_failure: Option<FetchError> = None;
        for candidate in candidate_urls(&url) {
            match self.http.get_with_headers(&candidate, &headers).await {
                Ok(page) => {
                    check_login_wall(&page)?;
                    if page.status.as_u16() == 200 {
                        chosen = Some(page);
                        break;
                    }
                    debug!(url = candidate, status = page.status.as_u16(), "Candidate rejected");
                    last_failure = Some(FetchError::Status {
                        url: candidate,
                        status: page.status.as_u16(),
                    });
                }
                Err(e) if e.is_transient() => {
                    warn!(url = candidate, error = %e, "Candidate unreachable");
                    last_failure = Some(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }

        let Some(page) = chosen else {
            return Err(last_failure.unwrap_or_else(|| FetchError::InvalidUrl(doc_url.to_string())));
        };

        let mut body: Bytes = page.body.clone();
        if !is_pdf(&body) {
            if let Some(link) = find_document_link(&page.text(), &page.final_url) {
                debug!(court, doc_id, link, "Following document link");
                let follow = match self.http.get_with_headers(&link, &headers).await {
                    Ok(follow) => follow,
                    Err(e) => {
                        let debug_key = self.documents.save_debug(&court, &doc_id, body).await?;
                        warn!(court, doc_id, link, debug_key, error = %e, "Document link unreachable");
                        return Err(e.into());
                    }
                };
                check_login_wall(&follow)?;
                if follow.status.is_success() {
                    body = follow.body;
                }
            }
        }

        if !is_pdf(&body) {
            let debug_key = self.documents.save_debug(&court, &doc_id, body).await?;
            warn!(court, doc_id, debug_key, "Response is not a PDF");
            return Err(FetchError::NotADocument {
                url: doc_url.to_string(),
                debug_key,
            });
        }

        let size = body.len() as u64;
        let storage_key = self.documents.save_pdf(&court, &doc_id, body).await?;
        let pages = self.costs.document_pages(size);
        let cost = self.costs.cost_for_pages(pages);

        info!(court, doc_id, bytes = size, pages, %cost, "Document downloaded");
        Ok(FetchedDocument {
            doc_id,
            court,
            storage_key,
            case_id: parse_doc_url(&url).case_id,
            bytes: size,
            pages,
            cost,
            cached: false,
        })
    }
}
