//! Request and response bodies for the HTTP API.
//!
//! Discovered items are posted as a JSON array of [`DiscoveredItem`]:
//!
//! ```json
//! [
//!   {
//!     "id": "rss-8812",
//!     "court_code": "cacd",
//!     "case_number": "2:24-cv-01234",
//!     "title": "Doe v. Acme Corp",
//!     "summary": "COMPLAINT against Acme Corp",
//!     "link": "https://ecf.cacd.uscourts.gov/cgi-bin/DktRpt.pl?901234",
//!     "metadata": {"doc1_url": "https://ecf.cacd.uscourts.gov/doc1/031123456", "nos": {"code": "442"}}
//!   }
//! ]
//! ```
//!
//! [`DiscoveredItem`]: crate::triggers::DiscoveredItem

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub max_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ChargesQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DocketRequest {
    pub court: String,
    pub case_number: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TriggerRemoved {
    pub name: String,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}
