use serde::{Deserialize, Serialize};
use std::fmt;

use super::item::DiscoveredItem;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;

/// A named rule deciding whether a discovered item is worth buying.
///
/// Predicate families are ORed: the first family that matches wins. Court
/// allow and deny lists are applied before any family is looked at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bon::Builder)]
pub struct Trigger {
    #[builder(into)]
    pub name: String,
    /// 1 (lowest) to 10 (highest).
    pub priority: u8,
    #[serde(default = "default_enabled")]
    #[builder(default = true)]
    pub enabled: bool,
    #[serde(default)]
    #[builder(default)]
    pub case_types: Vec<String>,
    #[serde(default)]
    #[builder(default)]
    pub nos_codes: Vec<String>,
    #[serde(default)]
    #[builder(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    #[builder(default)]
    pub doc_numbers: Vec<u32>,
    #[serde(default)]
    #[builder(default)]
    pub motion_types: Vec<String>,
    /// When non-empty, only these courts match.
    #[serde(default)]
    #[builder(default)]
    pub courts: Vec<String>,
    #[serde(default)]
    #[builder(default)]
    pub exclude_courts: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl Trigger {
    pub fn matches(&self, item: &DiscoveredItem) -> bool {
        if !self.enabled {
            return false;
        }

        let court = item.court();
        if !self.courts.is_empty() && !contains_ignore_case(&self.courts, &court) {
            return false;
        }
        if contains_ignore_case(&self.exclude_courts, &court) {
            return false;
        }

        if let Some(case_type) = item.case_type.as_deref() {
            if contains_ignore_case(&self.case_types, case_type.trim()) {
                return true;
            }
        }

        if !self.nos_codes.is_empty() {
            if let Some(code) = item.metadata.nos_code.as_deref() {
                if self.nos_codes.iter().any(|c| c == code) {
                    return true;
                }
            }
            let nos_text = item.nature_of_suit.as_deref().unwrap_or_default();
            if self.nos_codes.iter().any(|c| nos_text.contains(c.as_str())) {
                return true;
            }
        }

        let text = item.search_text();
        if self
            .keywords
            .iter()
            .any(|k| text.contains(&k.to_lowercase()))
        {
            return true;
        }

        if !self.doc_numbers.is_empty() {
            let numbers = [item.metadata.doc_number, item.metadata.docket_entry_number];
            if numbers
                .iter()
                .flatten()
                .any(|n| self.doc_numbers.contains(n))
            {
                return true;
            }
        }

        if !self.motion_types.is_empty() {
            let event = item
                .metadata
                .event_type
                .as_deref()
                .unwrap_or_default()
                .to_lowercase();
            return self.motion_types.iter().any(|m| {
                let m = m.to_lowercase();
                text.contains(&m) || event.contains(&m)
            });
        }

        false
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (priority {})", self.name, self.priority)
    }
}

fn contains_ignore_case(list: &[String], needle: &str) -> bool {
    list.iter().any(|c| c.trim().eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: serde_json::Value) -> DiscoveredItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_nos_code_from_metadata() {
        let trigger = Trigger::builder()
            .name("employment")
            .priority(7)
            .nos_codes(vec!["442".into()])
            .build();

        let hit = item(json!({"court_code": "cacd", "metadata": {"nos": {"code": "442"}}}));
        let miss = item(json!({"court_code": "cacd", "metadata": {"nos": {"code": "440"}}}));
        assert!(trigger.matches(&hit));
        assert!(!trigger.matches(&miss));
    }

    #[test]
    fn test_nos_code_substring_of_nature_of_suit() {
        let trigger = Trigger::builder()
            .name("securities")
            .priority(7)
            .nos_codes(vec!["850".into()])
            .build();
        let hit = item(json!({"nature_of_suit": "850 Securities/Commodities"}));
        assert!(trigger.matches(&hit));
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let trigger = Trigger::builder()
            .name("antitrust")
            .priority(6)
            .keywords(vec!["Sherman Act".into()])
            .build();
        let hit = item(json!({"title": "Complaint", "summary": "violations of the SHERMAN ACT"}));
        assert!(trigger.matches(&hit));
    }

    #[test]
    fn test_doc_numbers() {
        let trigger = Trigger::builder()
            .name("complaints")
            .priority(9)
            .doc_numbers(vec![1])
            .build();
        assert!(trigger.matches(&item(json!({"metadata": {"doc_number": 1}}))));
        assert!(trigger.matches(&item(json!({"metadata": {"docket_entry_number": "1"}}))));
        assert!(!trigger.matches(&item(json!({"metadata": {"doc_number": 2}}))));
    }

    #[test]
    fn test_motion_type_in_event_type() {
        let trigger = Trigger::builder()
            .name("pi")
            .priority(5)
            .motion_types(vec!["preliminary injunction".into()])
            .build();
        let hit = item(json!({"metadata": {"event_type": "Motion for Preliminary Injunction"}}));
        assert!(trigger.matches(&hit));
    }

    #[test]
    fn test_court_filters() {
        let trigger = Trigger::builder()
            .name("cv")
            .priority(5)
            .case_types(vec!["cv".into()])
            .courts(vec!["CACD".into(), "nysd".into()])
            .exclude_courts(vec!["nysd".into()])
            .build();

        assert!(trigger.matches(&item(json!({"court_code": "cacd", "case_type": "cv"}))));
        assert!(!trigger.matches(&item(json!({"court_code": "nysd", "case_type": "cv"}))));
        assert!(!trigger.matches(&item(json!({"court_code": "txnd", "case_type": "cv"}))));
    }

    #[test]
    fn test_disabled_never_matches() {
        let trigger = Trigger::builder()
            .name("off")
            .priority(5)
            .enabled(false)
            .keywords(vec!["complaint".into()])
            .build();
        assert!(!trigger.matches(&item(json!({"title": "complaint"}))));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let trigger: Trigger = serde_json::from_value(json!({
            "name": "custom",
            "priority": 4,
            "keywords": ["widget"]
        }))
        .unwrap();
        assert!(trigger.enabled);
        assert!(trigger.courts.is_empty());
        assert_eq!(trigger.to_string(), "custom (priority 4)");
    }
}
