use thiserror::Error;

use crate::triggers::{DiscoveredItem, MAX_PRIORITY, MIN_PRIORITY, Trigger};

pub const MAX_ITEMS_PER_REQUEST: usize = 1000;

#[derive(Debug, Error)]
pub enum PayloadValidationError {
    #[error("items must contain between 1 and {MAX_ITEMS_PER_REQUEST} entries")]
    InvalidItemCount,
    #[error("item '{0}' document url must be http or https")]
    InvalidDocumentUrl(String),
    #[error("trigger name must be 1 to 64 characters")]
    InvalidTriggerName,
    #[error("trigger '{0}' priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}")]
    InvalidTriggerPriority(String),
    #[error("trigger '{0}' has no match predicates")]
    EmptyTrigger(String),
    #[error("court and case_number are required")]
    MissingCase,
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub fn validate_items(items: &[DiscoveredItem]) -> Result<(), PayloadValidationError> {
    if !(1..=MAX_ITEMS_PER_REQUEST).contains(&items.len()) {
        return Err(PayloadValidationError::InvalidItemCount);
    }
    for item in items {
        if let Some(url) = item.doc_url() {
            if !is_http(url) {
                return Err(PayloadValidationError::InvalidDocumentUrl(item.id.clone()));
            }
        }
    }
    Ok(())
}

pub fn validate_trigger(trigger: &Trigger) -> Result<(), PayloadValidationError> {
    let name = trigger.name.trim();
    if name.is_empty() || name.len() > 64 {
        return Err(PayloadValidationError::InvalidTriggerName);
    }
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&trigger.priority) {
        return Err(PayloadValidationError::InvalidTriggerPriority(name.to_string()));
    }
    let has_predicate = !trigger.case_types.is_empty()
        || !trigger.nos_codes.is_empty()
        || !trigger.keywords.is_empty()
        || !trigger.doc_numbers.is_empty()
        || !trigger.motion_types.is_empty();
    if !has_predicate {
        return Err(PayloadValidationError::EmptyTrigger(name.to_string()));
    }
    Ok(())
}

pub fn validate_case(court: &str, case_number: &str) -> Result<(), PayloadValidationError> {
    if court.trim().is_empty() || case_number.trim().is_empty() {
        return Err(PayloadValidationError::MissingCase);
    }
    Ok(())
}
