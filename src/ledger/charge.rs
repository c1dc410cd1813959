use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::money::Usd;

/// What a charge paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    DocumentPdf,
    DocketSheet,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::DocumentPdf => f.write_str("document_pdf"),
            ResourceKind::DocketSheet => f.write_str("docket_sheet"),
        }
    }
}

/// An immutable billing record. Spend totals are derived from these alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: Uuid,
    pub resource_kind: ResourceKind,
    pub court: String,
    pub case_id: Option<String>,
    pub doc_url: Option<String>,
    pub pages_billed: u32,
    pub amount_usd: Usd,
    pub triggered_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Charge {
    pub fn new(
        resource_kind: ResourceKind,
        court: impl Into<String>,
        pages_billed: u32,
        amount_usd: Usd,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            resource_kind,
            court: court.into(),
            case_id: None,
            doc_url: None,
            pages_billed,
            amount_usd,
            triggered_by: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_case(mut self, case_id: impl Into<String>) -> Self {
        self.case_id = Some(case_id.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.doc_url = Some(url.into());
        self
    }

    pub fn triggered_by(mut self, trigger: impl Into<String>) -> Self {
        self.triggered_by = Some(trigger.into());
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}
