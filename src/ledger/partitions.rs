/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure:
/// - `charges`: charge:{created_at}:{charge_id} -> Charge (JSON)
/// - `queue`: queue:{item_id} -> QueueItem (JSON)
/// - `cases`: case:{court}:{case_number} -> internal case id (string)
///
/// Charge timestamps are fixed-width UTC so that `charge:{YYYY-MM-DD}` and
/// `charge:{YYYY-MM}` are valid prefix scans for a day or a month.
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

const CHARGE_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Encode a charge key: charge:{created_at}:{charge_id}
pub fn encode_charge_key(created_at: &DateTime<Utc>, id: &Uuid) -> Vec<u8> {
    format!("charge:{}:{}", created_at.format(CHARGE_TS_FORMAT), id).into_bytes()
}

/// Prefix covering every charge on a UTC calendar day
pub fn encode_charge_day_prefix(day: NaiveDate) -> Vec<u8> {
    format!("charge:{}", day.format("%Y-%m-%d")).into_bytes()
}

/// Prefix covering every charge in a UTC calendar month
pub fn encode_charge_month_prefix(day: NaiveDate) -> Vec<u8> {
    format!("charge:{:04}-{:02}", day.year(), day.month()).into_bytes()
}

/// Encode a queue item key: queue:{item_id}
pub fn encode_queue_key(item_id: &str) -> Vec<u8> {
    format!("queue:{}", item_id).into_bytes()
}

/// Decode a queue item key: queue:{item_id} -> item_id
pub fn decode_queue_key(key: &[u8]) -> Option<String> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("queue:").map(String::from)
}

/// Encode a case lookup key: case:{court}:{case_number}
pub fn encode_case_key(court: &str, case_number: &str) -> Vec<u8> {
    format!(
        "case:{}:{}",
        court.trim().to_lowercase(),
        normalize_case_number(case_number)
    )
    .into_bytes()
}

/// Case numbers arrive as `2:24-cv-01234`, `2:24-CV-01234-ABC` and so on.
/// Judge initials are dropped and the rest is lowercased.
pub fn normalize_case_number(case_number: &str) -> String {
    let trimmed = case_number.trim().to_lowercase();
    let parts: Vec<&str> = trimmed.split('-').collect();
    let judge_suffix = parts.len() > 3
        && parts[3..]
            .iter()
            .all(|p| p.chars().all(|c| c.is_ascii_alphabetic()));
    if judge_suffix {
        parts[..3].join("-")
    } else {
        trimmed
    }
}
