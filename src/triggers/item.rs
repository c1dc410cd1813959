//! Discovered docket activity as handed over by the ingestion pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One item of new docket activity (typically an RSS entry).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredItem {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "court")]
    pub court_code: String,
    #[serde(default)]
    pub case_number: String,
    #[serde(default)]
    pub case_type: Option<String>,
    #[serde(default)]
    pub nature_of_suit: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, alias = "metadata_json", deserialize_with = "lenient_metadata")]
    pub metadata: ItemMetadata,
}

impl DiscoveredItem {
    /// URL of the purchasable document, if the feed carried one.
    pub fn doc_url(&self) -> Option<&str> {
        self.metadata
            .doc1_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// Lowercased `title + " " + summary`.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.summary).to_lowercase()
    }

    pub fn court(&self) -> String {
        self.court_code.trim().to_lowercase()
    }
}

/// Structured fields pulled out of the item's free-form metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub doc1_url: Option<String>,
    pub doc_number: Option<u32>,
    pub docket_entry_number: Option<u32>,
    pub event_type: Option<String>,
    pub nos_code: Option<String>,
    pub link: Option<String>,
}

impl ItemMetadata {
    /// Read from a JSON object; anything else yields empty metadata.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let nos_code = obj
            .get("nos")
            .and_then(|n| n.get("code"))
            .and_then(as_text);

        Self {
            doc1_url: obj.get("doc1_url").and_then(as_text),
            doc_number: obj.get("doc_number").and_then(as_number),
            docket_entry_number: obj.get("docket_entry_number").and_then(as_number),
            event_type: obj.get("event_type").and_then(as_text),
            nos_code,
            link: obj.get("link").and_then(as_text),
        }
    }
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_number(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Metadata arrives either as an object or as a JSON-encoded string. Typed
/// metadata (our own serialized form) is accepted too. Malformed input is
/// treated as empty rather than rejecting the item.
fn lenient_metadata<'de, D>(deserializer: D) -> Result<ItemMetadata, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let value = match value {
        Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::Null),
        other => other,
    };

    if value.get("nos_code").is_some() {
        if let Ok(typed) = serde_json::from_value::<ItemMetadata>(value.clone()) {
            return Ok(typed);
        }
    }
    Ok(ItemMetadata::from_value(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_as_object() {
        let item: DiscoveredItem = serde_json::from_value(json!({
            "court_code": "CACD",
            "case_number": "2:24-cv-1",
            "title": "Doe v. Acme",
            "metadata": {
                "doc1_url": "https://ecf.cacd.uscourts.gov/doc1/031",
                "doc_number": 1,
                "nos": {"code": "442", "desc": "Employment"}
            }
        }))
        .unwrap();

        assert_eq!(item.court(), "cacd");
        assert_eq!(item.doc_url(), Some("https://ecf.cacd.uscourts.gov/doc1/031"));
        assert_eq!(item.metadata.doc_number, Some(1));
        assert_eq!(item.metadata.nos_code.as_deref(), Some("442"));
    }

    #[test]
    fn test_metadata_as_json_string() {
        let item: DiscoveredItem = serde_json::from_value(json!({
            "court_code": "nysd",
            "metadata_json": "{\"docket_entry_number\": \"12\", \"nos\": {\"code\": 850}}"
        }))
        .unwrap();

        assert_eq!(item.metadata.docket_entry_number, Some(12));
        assert_eq!(item.metadata.nos_code.as_deref(), Some("850"));
        assert!(item.doc_url().is_none());
    }

    #[test]
    fn test_malformed_metadata_is_empty() {
        let item: DiscoveredItem = serde_json::from_value(json!({
            "court_code": "nysd",
            "metadata": "{not json"
        }))
        .unwrap();
        assert_eq!(item.metadata, ItemMetadata::default());
    }

    #[test]
    fn test_serialized_item_reloads() {
        let item: DiscoveredItem = serde_json::from_value(json!({
            "court_code": "cacd",
            "metadata": {"nos": {"code": "442"}, "doc1_url": "https://x/doc1/1"}
        }))
        .unwrap();
        let round: DiscoveredItem =
            serde_json::from_str(&serde_json::to_string(&item).unwrap()).unwrap();
        assert_eq!(round, item);
    }

    #[test]
    fn test_blank_doc_url_is_none() {
        let item: DiscoveredItem = serde_json::from_value(json!({
            "metadata": {"doc1_url": "   "}
        }))
        .unwrap();
        assert!(item.doc_url().is_none());
    }
}
