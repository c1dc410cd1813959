use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::money::Usd;

/// Lifecycle of a queued document download.
///
/// `Pending -> InProgress -> {Completed | Failed}` and `Pending -> Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl QueueStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QueueStatus::Completed | QueueStatus::Failed | QueueStatus::Skipped
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::InProgress => "in_progress",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
            QueueStatus::Skipped => "skipped",
        }
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: QueueStatus) -> bool {
        matches!(
            (self, next),
            (QueueStatus::Pending, QueueStatus::InProgress)
                | (QueueStatus::Pending, QueueStatus::Skipped)
                | (QueueStatus::InProgress, QueueStatus::Completed)
                | (QueueStatus::InProgress, QueueStatus::Failed)
        )
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier for a document URL (first 16 hex chars of a UUIDv5).
pub fn item_id_for_url(doc_url: &str) -> String {
    let mut id = Uuid::new_v5(&Uuid::NAMESPACE_URL, doc_url.as_bytes())
        .simple()
        .to_string();
    id.truncate(16);
    id
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub court: String,
    pub case_number: String,
    pub doc_url: String,
    pub priority: u8,
    pub estimated_cost: Usd,
    pub trigger_name: Option<String>,
    pub origin_item_id: Option<String>,
    pub status: QueueStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub actual_cost: Option<Usd>,
}

#[bon::bon]
impl QueueItem {
    #[builder]
    pub fn new(
        #[builder(into)] court: String,
        #[builder(into)] case_number: String,
        #[builder(into)] doc_url: String,
        #[builder(default = 5)] priority: u8,
        #[builder(default = Usd::from_cents(10))] estimated_cost: Usd,
        #[builder(into)] trigger_name: Option<String>,
        #[builder(into)] origin_item_id: Option<String>,
        #[builder(default = Utc::now())] created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: item_id_for_url(&doc_url),
            court: court.to_lowercase(),
            case_number,
            doc_url,
            priority: priority.clamp(1, 10),
            estimated_cost,
            trigger_name,
            origin_item_id,
            status: QueueStatus::Pending,
            created_at,
            started_at: None,
            completed_at: None,
            error: None,
            actual_cost: None,
        }
    }
}

/// Dequeue order: higher priority first, then older items, then id for a
/// total order.
pub fn queue_order(a: &QueueItem, b: &QueueItem) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
