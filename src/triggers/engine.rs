use serde::Serialize;
use tracing::{debug, info};

use super::defaults::default_triggers;
use super::item::DiscoveredItem;
use super::trigger::Trigger;

/// The winning trigger for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerMatch {
    pub priority: u8,
    pub trigger_name: String,
}

/// Outcome of evaluating one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemClass<'a> {
    Unmatched,
    /// Matched and carries a purchasable document reference.
    Matched {
        trigger: TriggerMatch,
        doc_url: &'a str,
    },
    /// Matched, but there is nothing to buy yet.
    Unresolved { trigger: TriggerMatch },
}

#[derive(Debug, Default)]
pub struct BatchEvaluation<'a> {
    pub evaluated: usize,
    pub matched: Vec<(&'a DiscoveredItem, TriggerMatch)>,
    pub unresolved: Vec<(&'a DiscoveredItem, TriggerMatch)>,
}

/// Read-only trigger evaluation. Changing the trigger set produces a new
/// engine value.
#[derive(Debug, Clone, Default)]
pub struct TriggerEngine {
    triggers: Vec<Trigger>,
    allowed_courts: Vec<String>,
    excluded_courts: Vec<String>,
}

impl TriggerEngine {
    pub fn new(triggers: Vec<Trigger>) -> Self {
        let mut engine = Self {
            triggers,
            allowed_courts: Vec::new(),
            excluded_courts: Vec::new(),
        };
        engine.sort();
        engine
    }

    pub fn with_defaults() -> Self {
        Self::new(default_triggers())
    }

    /// Restrict every trigger to `allowed` (when non-empty) minus `excluded`.
    pub fn with_court_filters(mut self, allowed: Vec<String>, excluded: Vec<String>) -> Self {
        self.allowed_courts = allowed.into_iter().map(|c| c.trim().to_lowercase()).collect();
        self.excluded_courts = excluded.into_iter().map(|c| c.trim().to_lowercase()).collect();
        self
    }

    fn sort(&mut self) {
        self.triggers.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn add_trigger(&self, trigger: Trigger) -> Self {
        info!(trigger = %trigger, "Added trigger");
        let mut next = self.clone();
        next.triggers.retain(|t| t.name != trigger.name);
        next.triggers.push(trigger);
        next.sort();
        next
    }

    /// Returns the new engine and whether a trigger was removed.
    pub fn remove_trigger(&self, name: &str) -> (Self, bool) {
        let mut next = self.clone();
        next.triggers.retain(|t| t.name != name);
        let removed = next.triggers.len() < self.triggers.len();
        if removed {
            info!(trigger = name, "Removed trigger");
        }
        (next, removed)
    }

    fn court_allowed(&self, item: &DiscoveredItem) -> bool {
        let court = item.court();
        if !self.allowed_courts.is_empty() && !self.allowed_courts.contains(&court) {
            return false;
        }
        !self.excluded_courts.contains(&court)
    }

    pub fn matches(&self, item: &DiscoveredItem) -> bool {
        self.court_allowed(item) && self.triggers.iter().any(|t| t.matches(item))
    }

    /// Matching triggers, highest priority first.
    pub fn get_matching_triggers(&self, item: &DiscoveredItem) -> Vec<&Trigger> {
        if !self.court_allowed(item) {
            return Vec::new();
        }
        self.triggers.iter().filter(|t| t.matches(item)).collect()
    }

    pub fn get_highest_priority(&self, item: &DiscoveredItem) -> Option<u8> {
        self.evaluate(item).map(|m| m.priority)
    }

    pub fn evaluate(&self, item: &DiscoveredItem) -> Option<TriggerMatch> {
        if !self.court_allowed(item) {
            return None;
        }
        self.triggers
            .iter()
            .find(|t| t.matches(item))
            .map(|t| TriggerMatch {
                priority: t.priority,
                trigger_name: t.name.clone(),
            })
    }

    pub fn classify<'a>(&self, item: &'a DiscoveredItem) -> ItemClass<'a> {
        match self.evaluate(item) {
            None => ItemClass::Unmatched,
            Some(trigger) => match item.doc_url() {
                Some(doc_url) => ItemClass::Matched { trigger, doc_url },
                None => ItemClass::Unresolved { trigger },
            },
        }
    }

    pub fn evaluate_batch<'a>(&self, items: &'a [DiscoveredItem]) -> BatchEvaluation<'a> {
        let mut out = BatchEvaluation {
            evaluated: items.len(),
            ..Default::default()
        };
        for item in items {
            match self.classify(item) {
                ItemClass::Unmatched => {}
                ItemClass::Matched { trigger, .. } => out.matched.push((item, trigger)),
                ItemClass::Unresolved { trigger } => {
                    debug!(item_id = %item.id, trigger = %trigger.trigger_name, "Matched without document url");
                    out.unresolved.push((item, trigger));
                }
            }
        }
        out
    }
}
