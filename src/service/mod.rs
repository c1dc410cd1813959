//! Orchestration of discovery, budgeting, authentication and retrieval.
//!
//! [`AcquisitionService`] owns no state of its own. Everything lives in an
//! [`AppContext`] built once at startup, so tests can stand up a complete
//! pipeline against a temporary directory and local mock servers.

mod context;
mod reports;

pub use context::AppContext;
pub use reports::{EvaluationReport, ProcessReport, ServiceStatus};

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::{AuthError, AuthOutcome};
use crate::fetch::{DocketSheet, FetchError, FetchedDocument, HttpError, extract_case_id};
use crate::ledger::{Charge, LedgerError, ResourceKind};
use crate::money::Usd;
use crate::queue::{EnqueueOutcome, QueueError, QueueItem, QueueStatus};
use crate::storage::StorageError;
use crate::triggers::{DiscoveredItem, Trigger};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("HTTP client error: {0}")]
    Http(#[from] HttpError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Authentication failed for {court}: {detail}")]
    AuthenticationFailed { court: String, detail: String },

    #[error("Account credentials are not configured")]
    NotConfigured,

    #[error("Spend limit reached: {0}")]
    BudgetExhausted(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// One line per failed strategy, for queue item errors.
fn describe_failure(outcome: &AuthOutcome) -> String {
    if outcome.errors.is_empty() {
        return outcome.message.clone();
    }
    outcome
        .errors
        .iter()
        .map(|e| format!("{} [{}]: {}", e.strategy, e.error_kind, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// How far one dequeued item got.
enum ItemStep {
    Settled,
    OverBudget,
}

/// The case links an item may carry, top-level first.
fn case_links(item: &DiscoveredItem) -> impl Iterator<Item = &str> {
    item.link
        .as_deref()
        .into_iter()
        .chain(item.metadata.link.as_deref())
}

#[derive(Clone)]
pub struct AcquisitionService {
    ctx: Arc<AppContext>,
}

impl AcquisitionService {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    fn enabled(&self) -> bool {
        self.ctx.config.discovery.enabled
    }

    /// Run discovered items through the triggers and queue every match that
    /// names a document.
    pub fn evaluate_batch(&self, items: &[DiscoveredItem]) -> Result<EvaluationReport> {
        let ctx = &self.ctx;
        if !self.enabled() {
            return Ok(EvaluationReport {
                pending_in_queue: ctx.queue.get_pending_count(),
                ..Default::default()
            });
        }

        for item in items {
            self.remember_case_link(item);
        }

        let evaluation = ctx.engine().evaluate_batch(items);
        ctx.metrics.items_evaluated(evaluation.evaluated);

        let mut report = EvaluationReport {
            enabled: true,
            evaluated: evaluation.evaluated,
            matched: evaluation.matched.len() + evaluation.unresolved.len(),
            unresolved: evaluation.unresolved.len(),
            ..Default::default()
        };

        for (item, matched) in &evaluation.matched {
            match ctx.queue.enqueue_from_item(item, matched) {
                EnqueueOutcome::Queued(queued) => {
                    ctx.queue.persist_item(&ctx.store, &queued.id)?;
                    ctx.metrics.item_queued();
                    report.queued += 1;
                }
                EnqueueOutcome::Duplicate(_) => report.duplicates += 1,
                EnqueueOutcome::NoDocument => report.unresolved += 1,
            }
        }

        report.pending_in_queue = ctx.queue.get_pending_count();
        info!(
            evaluated = report.evaluated,
            matched = report.matched,
            queued = report.queued,
            duplicates = report.duplicates,
            pending = report.pending_in_queue,
            "Evaluated discovered items"
        );
        Ok(report)
    }

    /// Evaluate a single item. `None` unless it ended up queued.
    pub fn queue_from_rss_item(&self, item: &DiscoveredItem) -> Result<Option<QueueItem>> {
        let ctx = &self.ctx;
        if !self.enabled() {
            return Ok(None);
        }
        self.remember_case_link(item);
        ctx.metrics.items_evaluated(1);

        let Some(matched) = ctx.engine().evaluate(item) else {
            return Ok(None);
        };
        match ctx.queue.enqueue_from_item(item, &matched) {
            EnqueueOutcome::Queued(queued) => {
                ctx.queue.persist_item(&ctx.store, &queued.id)?;
                ctx.metrics.item_queued();
                Ok(Some(queued))
            }
            EnqueueOutcome::Duplicate(_) | EnqueueOutcome::NoDocument => Ok(None),
        }
    }

    fn remember_case_link(&self, item: &DiscoveredItem) {
        let case_number = item.case_number.trim();
        if case_number.is_empty() {
            return;
        }
        if let Some(case_id) = case_links(item).find_map(extract_case_id) {
            if let Err(e) = self.ctx.store.remember_case_id(&item.court(), case_number, &case_id) {
                warn!(case_number, error = %e, "Failed to record case id");
            }
        }
    }

    /// Buy up to `max_count` queued documents within the remaining budget.
    /// Every dequeued item ends COMPLETED or FAILED.
    pub async fn process_batch(&self, max_count: usize) -> Result<ProcessReport> {
        let ctx = &self.ctx;
        if !self.enabled() {
            return Ok(ProcessReport::halted(false, "discovery is disabled"));
        }
        if !ctx.authenticator.is_configured() {
            return Ok(ProcessReport::halted(true, "account credentials are not configured"));
        }

        let window = ctx.ledger.check_limits()?;
        if !window.can_proceed {
            info!(
                daily_total = %window.daily_total,
                monthly_total = %window.monthly_total,
                "Spend limit reached, not processing"
            );
            return Ok(ProcessReport::halted(true, "spend limit reached"));
        }

        let budget = ctx.queue.get_remaining_budget().min(window.remaining());
        let batch = ctx.queue.dequeue_batch(max_count, Some(budget));
        if batch.is_empty() {
            return Ok(ProcessReport::halted(true, "nothing to process within budget"));
        }
        for item in &batch {
            ctx.queue.persist_item(&ctx.store, &item.id)?;
        }

        let mut report = ProcessReport {
            enabled: true,
            ..Default::default()
        };

        // Once an item cannot be settled, it and everything after it are
        // failed with the reason, so nothing is left in progress.
        let mut batch_error = None;
        let mut items = batch.into_iter();
        while let Some(item) = items.next() {
            let reason = match self.process_item(&item, &mut report).await {
                Ok(ItemStep::Settled) => continue,
                Ok(ItemStep::OverBudget) => {
                    report.reason = Some("spend limit reached".to_string());
                    format!("spend limit reached before purchase of {}", item.estimated_cost)
                }
                Err(e) => {
                    error!(item_id = %item.id, error = %e, "Batch interrupted, failing remaining items");
                    let reason = e.to_string();
                    batch_error = Some(e);
                    reason
                }
            };
            for halted in std::iter::once(item).chain(items.by_ref()) {
                let in_progress = ctx
                    .queue
                    .get(&halted.id)
                    .is_some_and(|q| q.status == QueueStatus::InProgress);
                if !in_progress {
                    continue;
                }
                if let Err(e) = self.fail(&halted, &reason, &mut report) {
                    warn!(item_id = %halted.id, error = %e, "Failed to record item failure");
                }
            }
            break;
        }

        let persisted = ctx.store.persist();
        if let Some(e) = batch_error {
            if let Err(persist_error) = persisted {
                warn!(error = %persist_error, "Failed to flush store after interrupted batch");
            }
            return Err(e);
        }
        persisted?;

        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            total_cost = %report.total_cost,
            "Processed download batch"
        );
        Ok(report)
    }

    /// Settle one dequeued item. A cached copy completes it without touching
    /// the budget; otherwise the purchase must still fit under the limits.
    async fn process_item(&self, item: &QueueItem, report: &mut ProcessReport) -> Result<ItemStep> {
        let ctx = &self.ctx;
        let acquired = match ctx.documents.lookup_cached(&item.court, &item.doc_url).await {
            Ok(Some(cached)) => {
                ctx.metrics.document_cached();
                Ok(cached)
            }
            Ok(None) => {
                if !ctx.ledger.can_afford(item.estimated_cost)? {
                    return Ok(ItemStep::OverBudget);
                }
                self.acquire(item).await
            }
            Err(e) => Err(e.into()),
        };

        match acquired {
            Ok(document) => {
                ctx.queue.mark_completed(&item.id, document.cost)?;
                report.processed += 1;
                report.succeeded += 1;
                report.total_cost += document.cost;
                report.documents.push(document);
                ctx.queue.persist_item(&ctx.store, &item.id)?;
            }
            Err(e) => self.fail(item, &e.to_string(), report)?,
        }
        Ok(ItemStep::Settled)
    }

    fn fail(&self, item: &QueueItem, reason: &str, report: &mut ProcessReport) -> Result<()> {
        self.ctx.queue.mark_failed(&item.id, reason)?;
        self.ctx.metrics.document_failed();
        report.processed += 1;
        report.failed += 1;
        self.ctx.queue.persist_item(&self.ctx.store, &item.id)?;
        Ok(())
    }

    async fn authenticate(&self, court: &str) -> Result<()> {
        let outcome = self.ctx.authenticator.authenticate(court).await;
        self.ctx.metrics.auth_result(outcome.success);
        if outcome.success {
            return Ok(());
        }
        Err(ServiceError::AuthenticationFailed {
            court: court.to_string(),
            detail: describe_failure(&outcome),
        })
    }

    /// A paid download recorded as a charge.
    async fn acquire(&self, item: &QueueItem) -> Result<FetchedDocument> {
        let ctx = &self.ctx;
        self.authenticate(&item.court).await?;

        let document = match ctx.documents.download(&item.court, &item.doc_url).await {
            Ok(document) => document,
            Err(e) => {
                if e.is_login_required() {
                    warn!(item_id = %item.id, "Session rejected mid-fetch, revalidating next time");
                    ctx.authenticator.invalidate();
                }
                return Err(e.into());
            }
        };

        let mut charge = Charge::new(ResourceKind::DocumentPdf, &document.court, document.pages, document.cost)
            .with_url(&item.doc_url);
        if let Some(case_id) = &document.case_id {
            charge = charge.with_case(case_id);
        }
        if let Some(trigger) = &item.trigger_name {
            charge = charge.triggered_by(trigger);
        }
        if let Err(e) = ctx.ledger.record_charge(&charge) {
            error!(item_id = %item.id, error = %e, "Document stored but charge not recorded");
            return Err(e.into());
        }
        ctx.metrics.document_fetched(document.cost.cents());
        Ok(document)
    }

    /// Look up the case's internal id, then pull and bill its docket sheet.
    pub async fn fetch_docket(&self, court: &str, case_number: &str) -> Result<DocketSheet> {
        let ctx = &self.ctx;
        let court = court.trim().to_lowercase();
        let case_number = case_number.trim();
        if !ctx.authenticator.is_configured() {
            return Err(ServiceError::NotConfigured);
        }

        let case_id = ctx.store.lookup_case_id(&court, case_number)?.ok_or_else(|| {
            FetchError::CaseNotFound {
                court: court.clone(),
                case_number: case_number.to_string(),
            }
        })?;

        let minimum = ctx.ledger.costs().minimum_charge();
        if !ctx.ledger.can_afford(minimum)? {
            return Err(ServiceError::BudgetExhausted(format!(
                "docket for {court} {case_number} needs at least {minimum}"
            )));
        }

        self.authenticate(&court).await?;

        let ecf_base = ctx.config.pacer.ecf_base(&court);
        let sheet = match ctx.dockets.fetch(&ecf_base, &court, case_number, &case_id).await {
            Ok(sheet) => sheet,
            Err(e) => {
                if e.is_login_required() {
                    ctx.authenticator.invalidate();
                }
                return Err(e.into());
            }
        };

        let charge = Charge::new(ResourceKind::DocketSheet, &court, sheet.pages, sheet.cost)
            .with_case(&case_id)
            .with_url(&sheet.url);
        ctx.ledger.record_charge(&charge)?;
        ctx.metrics.docket_fetched(sheet.cost.cents());
        Ok(sheet)
    }

    /// Run the strategy chain without fetching anything.
    pub async fn login(&self, court: &str) -> AuthOutcome {
        let outcome = self.ctx.authenticator.authenticate(court).await;
        self.ctx.metrics.auth_result(outcome.success);
        outcome
    }

    pub fn get_status(&self) -> Result<ServiceStatus> {
        let ctx = &self.ctx;
        let discovery = &ctx.config.discovery;
        Ok(ServiceStatus {
            enabled: discovery.enabled,
            configured: ctx.authenticator.is_configured(),
            batch_size: discovery.batch_size,
            poll_interval_secs: discovery.poll_interval_secs,
            triggers: ctx.engine().triggers().iter().map(|t| t.name.clone()).collect(),
            queue: ctx.queue.get_stats(),
            spend: ctx.ledger.check_limits()?,
            auth: ctx.authenticator.status(),
            metrics: ctx.metrics.snapshot(),
        })
    }

    pub fn add_trigger(&self, trigger: Trigger) {
        self.ctx.update_engine(|engine| (engine.add_trigger(trigger), true));
    }

    pub fn remove_trigger(&self, name: &str) -> bool {
        self.ctx.update_engine(|engine| engine.remove_trigger(name))
    }

    pub fn recent_charges(&self, limit: usize) -> Result<Vec<Charge>> {
        Ok(self.ctx.ledger.recent_charges(limit)?)
    }

    /// Flush the whole queue to the store, as on shutdown.
    pub fn persist_queue(&self) -> Result<usize> {
        Ok(self.ctx.queue.persist_to_db(&self.ctx.store)?)
    }

    pub fn total_spent_today(&self) -> Result<Usd> {
        Ok(self.ctx.ledger.check_limits()?.daily_total)
    }
}
