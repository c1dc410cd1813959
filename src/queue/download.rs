use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ledger::{FjallStore, LedgerError};
use crate::money::Usd;
use crate::triggers::{DiscoveredItem, TriggerMatch};

use super::item::{QueueItem, QueueStatus, queue_order};

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue item not found: {0}")]
    NotFound(String),

    #[error("Illegal transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: QueueStatus,
        to: QueueStatus,
    },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, QueueError>;

#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    Queued(QueueItem),
    Duplicate(String),
    NoDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total_items: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub daily_spent: Usd,
    pub daily_limit: Usd,
    pub remaining_budget: Usd,
}

struct QueueState {
    items: HashMap<String, QueueItem>,
    urls: HashSet<String>,
    day: NaiveDate,
    daily_spent: Usd,
}

impl QueueState {
    fn roll_over(&mut self, today: NaiveDate) {
        if today != self.day {
            info!(previous = %self.day, today = %today, spent = %self.daily_spent, "Resetting daily queue spend");
            self.day = today;
            self.daily_spent = Usd::ZERO;
        }
    }

    fn insert(&mut self, item: QueueItem) {
        self.urls.insert(item.doc_url.clone());
        self.items.insert(item.id.clone(), item);
    }

    fn transition(&mut self, id: &str, to: QueueStatus) -> Result<&mut QueueItem> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        if !item.status.can_transition_to(to) {
            return Err(QueueError::InvalidTransition {
                id: id.to_string(),
                from: item.status,
                to,
            });
        }
        item.status = to;
        Ok(item)
    }
}

/// In-memory priority queue of documents awaiting purchase.
///
/// All mutation happens under one short-held lock that is never held across
/// an `.await`.
pub struct DownloadQueue {
    state: Mutex<QueueState>,
    daily_limit: Usd,
    default_estimate: Usd,
    terminal_retention: Duration,
}

impl DownloadQueue {
    pub fn new(daily_limit: Usd, default_estimate: Usd, terminal_retention: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: HashMap::new(),
                urls: HashSet::new(),
                day: Utc::now().date_naive(),
                daily_spent: Usd::ZERO,
            }),
            daily_limit,
            default_estimate,
            terminal_retention,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.roll_over(Utc::now().date_naive());
        state
    }

    pub fn daily_limit(&self) -> Usd {
        self.daily_limit
    }

    pub fn default_estimate(&self) -> Usd {
        self.default_estimate
    }

    pub fn enqueue(&self, item: QueueItem) -> EnqueueOutcome {
        let mut state = self.lock();
        if state.urls.contains(&item.doc_url) {
            debug!(doc_url = %item.doc_url, "Duplicate document url, not queued");
            return EnqueueOutcome::Duplicate(item.id);
        }
        info!(
            item_id = %item.id,
            court = %item.court,
            case_number = %item.case_number,
            priority = item.priority,
            "Queued document"
        );
        state.insert(item.clone());
        EnqueueOutcome::Queued(item)
    }

    /// Build and enqueue an item for a trigger match.
    pub fn enqueue_from_item(
        &self,
        item: &DiscoveredItem,
        matched: &TriggerMatch,
    ) -> EnqueueOutcome {
        let Some(doc_url) = item.doc_url() else {
            return EnqueueOutcome::NoDocument;
        };
        let origin = (!item.id.is_empty()).then(|| item.id.clone());
        let queued = QueueItem::builder()
            .court(item.court())
            .case_number(item.case_number.trim())
            .doc_url(doc_url)
            .priority(matched.priority)
            .estimated_cost(self.default_estimate)
            .trigger_name(matched.trigger_name.clone())
            .maybe_origin_item_id(origin)
            .build();
        self.enqueue(queued)
    }

    /// Select up to `max_count` pending items whose summed estimate fits in
    /// `cost_budget` (default: what is left of today's limit) and mark them
    /// in progress.
    pub fn dequeue_batch(&self, max_count: usize, cost_budget: Option<Usd>) -> Vec<QueueItem> {
        let mut state = self.lock();
        let budget = cost_budget
            .unwrap_or_else(|| self.daily_limit.saturating_sub(state.daily_spent));

        let pending: Vec<(String, Usd)> = {
            let mut items: Vec<&QueueItem> = state
                .items
                .values()
                .filter(|i| i.status == QueueStatus::Pending)
                .collect();
            items.sort_by(|a, b| queue_order(a, b));
            items.iter().map(|i| (i.id.clone(), i.estimated_cost)).collect()
        };

        let mut batch = Vec::new();
        let mut committed = Usd::ZERO;
        let now = Utc::now();

        for (id, estimate) in pending {
            if batch.len() >= max_count {
                break;
            }
            if estimate > self.daily_limit {
                if let Some(item) = state.items.get_mut(&id) {
                    warn!(item_id = %id, estimate = %estimate, "Estimate exceeds daily limit, skipping");
                    item.status = QueueStatus::Skipped;
                    item.completed_at = Some(now);
                    item.error = Some(format!(
                        "estimated cost {} exceeds daily limit {}",
                        estimate, self.daily_limit
                    ));
                }
                continue;
            }
            if committed + estimate > budget {
                continue;
            }
            if let Ok(item) = state.transition(&id, QueueStatus::InProgress) {
                item.started_at = Some(now);
                committed += estimate;
                batch.push(item.clone());
            }
        }

        if !batch.is_empty() {
            info!(count = batch.len(), committed = %committed, budget = %budget, "Dequeued batch");
        }
        batch
    }

    pub fn mark_completed(&self, id: &str, actual_cost: Usd) -> Result<QueueItem> {
        let mut state = self.lock();
        let item = state.transition(id, QueueStatus::Completed)?;
        item.completed_at = Some(Utc::now());
        item.actual_cost = Some(actual_cost);
        let done = item.clone();
        state.daily_spent += actual_cost;
        info!(item_id = id, cost = %actual_cost, daily_spent = %state.daily_spent, "Download completed");
        Ok(done)
    }

    pub fn mark_failed(&self, id: &str, error: &str) -> Result<QueueItem> {
        let mut state = self.lock();
        let item = state.transition(id, QueueStatus::Failed)?;
        item.completed_at = Some(Utc::now());
        item.error = Some(error.to_string());
        warn!(item_id = id, error, "Download failed");
        Ok(item.clone())
    }

    /// Administrative skip of a pending item.
    pub fn skip(&self, id: &str, reason: &str) -> Result<QueueItem> {
        let mut state = self.lock();
        let item = state.transition(id, QueueStatus::Skipped)?;
        item.completed_at = Some(Utc::now());
        item.error = Some(reason.to_string());
        info!(item_id = id, reason, "Skipped queue item");
        Ok(item.clone())
    }

    pub fn get(&self, id: &str) -> Option<QueueItem> {
        self.lock().items.get(id).cloned()
    }

    /// All items in dequeue order.
    pub fn snapshot(&self) -> Vec<QueueItem> {
        let state = self.lock();
        let mut items: Vec<QueueItem> = state.items.values().cloned().collect();
        items.sort_by(queue_order);
        items
    }

    pub fn get_remaining_budget(&self) -> Usd {
        let state = self.lock();
        self.daily_limit.saturating_sub(state.daily_spent)
    }

    pub fn get_pending_count(&self) -> usize {
        self.lock()
            .items
            .values()
            .filter(|i| i.status == QueueStatus::Pending)
            .count()
    }

    pub fn get_stats(&self) -> QueueStats {
        let state = self.lock();
        let count = |s: QueueStatus| state.items.values().filter(|i| i.status == s).count();
        QueueStats {
            total_items: state.items.len(),
            pending: count(QueueStatus::Pending),
            in_progress: count(QueueStatus::InProgress),
            completed: count(QueueStatus::Completed),
            failed: count(QueueStatus::Failed),
            skipped: count(QueueStatus::Skipped),
            daily_spent: state.daily_spent,
            daily_limit: self.daily_limit,
            remaining_budget: self.daily_limit.saturating_sub(state.daily_spent),
        }
    }

    /// Drop terminal items and free their urls for re-queueing.
    pub fn clear_completed(&self) -> usize {
        let mut state = self.lock();
        let terminal: Vec<(String, String)> = state
            .items
            .values()
            .filter(|i| i.status.is_terminal())
            .map(|i| (i.id.clone(), i.doc_url.clone()))
            .collect();
        for (id, url) in &terminal {
            state.items.remove(id);
            state.urls.remove(url);
        }
        if !terminal.is_empty() {
            info!(cleared = terminal.len(), "Cleared terminal queue items");
        }
        terminal.len()
    }

    /// Upsert every in-memory item. Safe to repeat.
    pub fn persist_to_db(&self, store: &FjallStore) -> Result<usize> {
        let items = self.snapshot();
        for item in &items {
            store.upsert_queue_item(item)?;
        }
        store.persist()?;
        debug!(count = items.len(), "Persisted queue");
        Ok(items.len())
    }

    /// Upsert a single item, typically right after a transition.
    pub fn persist_item(&self, store: &FjallStore, id: &str) -> Result<()> {
        let item = self.get(id).ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        store.upsert_queue_item(&item)?;
        Ok(())
    }

    /// Restore live items from the store. Items left in progress by a crash
    /// come back as pending; recently finished items come back only to keep
    /// their urls deduplicated.
    pub fn load_from_db(&self, store: &FjallStore) -> Result<usize> {
        let persisted = store.queue_items_with_status(&[
            QueueStatus::Pending,
            QueueStatus::InProgress,
            QueueStatus::Completed,
            QueueStatus::Failed,
            QueueStatus::Skipped,
        ])?;
        let cutoff = Utc::now() - self.terminal_retention;

        let mut state = self.lock();
        let mut loaded = 0;
        for mut item in persisted {
            if state.items.contains_key(&item.id) {
                continue;
            }
            if item.status.is_terminal() {
                let recent = item.completed_at.is_some_and(|t| t >= cutoff);
                if !recent {
                    continue;
                }
            } else if item.status == QueueStatus::InProgress {
                warn!(item_id = %item.id, "Recovering interrupted download as pending");
                item.status = QueueStatus::Pending;
                item.started_at = None;
            }
            state.insert(item);
            loaded += 1;
        }
        info!(loaded, "Loaded queue from store");
        Ok(loaded)
    }

    #[cfg(test)]
    fn backdate_day(&self, days: i64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.day = state.day - Duration::days(days);
    }
}
