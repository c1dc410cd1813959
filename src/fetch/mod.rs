//! Retrieval of documents and docket sheets from court sites.

pub mod docket;
pub mod document;
pub mod html;
mod http;

pub use docket::{DocketFetcher, DocketSheet, extract_case_id};
pub use document::{DocumentFetcher, FetchedDocument};
pub use http::{HttpConfig, HttpError, PacerHttp, PageResponse};

use crate::ledger::LedgerError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Redirected to the login page while fetching {0}")]
    LoginRequired(String),

    #[error("Response for {url} is not a PDF (kept at {debug_key})")]
    NotADocument { url: String, debug_key: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("No case id known for {court} {case_number}")]
    CaseNotFound { court: String, case_number: String },

    #[error("Docket query form not found at {0}")]
    DocketFormNotFound(String),

    #[error("Invalid document URL: {0}")]
    InvalidUrl(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl FetchError {
    pub fn is_login_required(&self) -> bool {
        matches!(self, FetchError::LoginRequired(_))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
