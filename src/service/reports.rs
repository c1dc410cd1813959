use serde::Serialize;

use crate::auth::AuthStatus;
use crate::fetch::FetchedDocument;
use crate::ledger::SpendWindow;
use crate::money::Usd;
use crate::observability::MetricsSnapshot;
use crate::queue::QueueStats;

/// Result of running a batch of discovered items through the triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationReport {
    pub enabled: bool,
    pub evaluated: usize,
    pub matched: usize,
    pub queued: usize,
    pub duplicates: usize,
    /// Matched, but carried no document url.
    pub unresolved: usize,
    pub pending_in_queue: usize,
}

/// Result of one `process_batch` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessReport {
    pub enabled: bool,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_cost: Usd,
    /// Why the batch stopped early or never started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub documents: Vec<FetchedDocument>,
}

impl ProcessReport {
    pub(crate) fn halted(enabled: bool, reason: impl Into<String>) -> Self {
        Self {
            enabled,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub enabled: bool,
    pub configured: bool,
    pub batch_size: usize,
    pub poll_interval_secs: u64,
    pub triggers: Vec<String>,
    pub queue: QueueStats,
    pub spend: SpendWindow,
    pub auth: AuthStatus,
    pub metrics: MetricsSnapshot,
}
