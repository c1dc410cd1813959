use std::path::Path;

use chrono::NaiveDate;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use crate::queue::{QueueItem, QueueStatus};

use super::charge::Charge;
use super::error::{LedgerError, Result};
use super::partitions::{
    decode_queue_key, encode_case_key, encode_charge_day_prefix, encode_charge_key,
    encode_charge_month_prefix, encode_queue_key,
};

/// Fjall-backed persistent storage for charges, queue items and case lookups
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    charges: PartitionHandle,
    queue: PartitionHandle,
    cases: PartitionHandle,
}

impl FjallStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let charges = keyspace.open_partition("charges", PartitionCreateOptions::default())?;
        let queue = keyspace.open_partition("queue", PartitionCreateOptions::default())?;
        let cases = keyspace.open_partition("cases", PartitionCreateOptions::default())?;

        info!("Fjall store opened successfully");
        Ok(Self {
            keyspace,
            charges,
            queue,
            cases,
        })
    }

    /// Append a charge. Charges are never updated or deleted.
    pub fn insert_charge(&self, charge: &Charge) -> Result<()> {
        if charge.amount_usd.cents() < 0 {
            return Err(LedgerError::NegativeCharge(charge.amount_usd.to_string()));
        }
        let key = encode_charge_key(&charge.created_at, &charge.id);
        let value = serde_json::to_vec(charge)?;
        self.charges.insert(key, value)?;
        debug!(charge_id = %charge.id, amount = %charge.amount_usd, "Recorded charge");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn insert_raw_charge(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.charges.insert(key, value)?;
        Ok(())
    }

    pub fn charges_on_day(&self, day: NaiveDate) -> Result<Vec<Charge>> {
        self.charges_with_prefix(&encode_charge_day_prefix(day))
    }

    pub fn charges_in_month(&self, day: NaiveDate) -> Result<Vec<Charge>> {
        self.charges_with_prefix(&encode_charge_month_prefix(day))
    }

    fn charges_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Charge>> {
        let mut out = Vec::new();
        for item in self.charges.prefix(prefix) {
            let (_, value) = item?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    /// Most recent charges first
    pub fn recent_charges(&self, limit: usize) -> Result<Vec<Charge>> {
        let mut out = Vec::with_capacity(limit.min(256));
        for item in self.charges.iter().rev().take(limit) {
            let (_, value) = item?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    /// Insert or replace a queue item by id
    pub fn upsert_queue_item(&self, item: &QueueItem) -> Result<()> {
        let key = encode_queue_key(&item.id);
        let value = serde_json::to_vec(item)?;
        self.queue.insert(key, value)?;
        debug!(item_id = %item.id, status = %item.status, "Upserted queue item");
        Ok(())
    }

    pub fn get_queue_item(&self, item_id: &str) -> Result<Option<QueueItem>> {
        match self.queue.get(encode_queue_key(item_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// All persisted queue items whose status is in `statuses`
    pub fn queue_items_with_status(&self, statuses: &[QueueStatus]) -> Result<Vec<QueueItem>> {
        let mut out = Vec::new();
        for item in self.queue.iter() {
            let (key, value) = item?;
            if decode_queue_key(&key).is_none() {
                return Err(LedgerError::InvalidKey(
                    String::from_utf8_lossy(&key).into_owned(),
                ));
            }
            let queued: QueueItem = serde_json::from_slice(&value)?;
            if statuses.contains(&queued.status) {
                out.push(queued);
            }
        }
        Ok(out)
    }

    pub fn remove_queue_item(&self, item_id: &str) -> Result<()> {
        self.queue.remove(encode_queue_key(item_id))?;
        Ok(())
    }

    /// Remember the external system's internal id for a case number
    pub fn remember_case_id(&self, court: &str, case_number: &str, case_id: &str) -> Result<()> {
        self.cases
            .insert(encode_case_key(court, case_number), case_id.as_bytes())?;
        debug!(court, case_number, case_id, "Remembered case id");
        Ok(())
    }

    pub fn lookup_case_id(&self, court: &str, case_number: &str) -> Result<Option<String>> {
        match self.cases.get(encode_case_key(court, case_number))? {
            Some(value) => Ok(Some(String::from_utf8_lossy(&value).into_owned())),
            None => Ok(None),
        }
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Get internal statistics (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut charge_count = 0;
        let mut queue_count = 0;
        let mut case_count = 0;

        for item in self.charges.iter() {
            item?;
            charge_count += 1;
        }

        for item in self.queue.iter() {
            item?;
            queue_count += 1;
        }

        for item in self.cases.iter() {
            item?;
            case_count += 1;
        }

        Ok(StoreStats {
            charge_count,
            queue_count,
            case_count,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub charge_count: usize,
    pub queue_count: usize,
    pub case_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ResourceKind;
    use crate::money::Usd;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_store() -> (FjallStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallStore::open(temp_dir.path().join("test_ledger")).unwrap();
        (store, temp_dir)
    }

    fn create_test_item(url: &str) -> QueueItem {
        QueueItem::builder()
            .court("cacd")
            .case_number("2:24-cv-00001")
            .doc_url(url)
            .build()
    }

    #[test]
    fn test_open_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallStore::open(temp_dir.path().join("test_ledger"));
        assert!(store.is_ok());
    }

    #[test]
    fn test_charges_by_day_and_month() {
        let (store, _temp) = create_test_store();
        let d1 = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2026, 5, 2, 8, 0, 0).unwrap();
        let other_month = Utc.with_ymd_and_hms(2026, 4, 30, 23, 59, 59).unwrap();

        for ts in [d1, d1, d2, other_month] {
            let charge = Charge::new(ResourceKind::DocumentPdf, "cacd", 1, Usd::from_cents(10)).at(ts);
            store.insert_charge(&charge).unwrap();
        }

        assert_eq!(store.charges_on_day(d1.date_naive()).unwrap().len(), 2);
        assert_eq!(store.charges_on_day(d2.date_naive()).unwrap().len(), 1);
        assert_eq!(store.charges_in_month(d1.date_naive()).unwrap().len(), 3);
        assert_eq!(store.charges_in_month(other_month.date_naive()).unwrap().len(), 1);
    }

    #[test]
    fn test_recent_charges_newest_first() {
        let (store, _temp) = create_test_store();
        let early = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        store
            .insert_charge(&Charge::new(ResourceKind::DocketSheet, "nysd", 2, Usd::from_cents(20)).at(early))
            .unwrap();
        store
            .insert_charge(&Charge::new(ResourceKind::DocumentPdf, "nysd", 1, Usd::from_cents(10)).at(late))
            .unwrap();

        let recent = store.recent_charges(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].created_at, late);
        assert_eq!(store.recent_charges(1).unwrap().len(), 1);
    }

    #[test]
    fn test_negative_charge_rejected() {
        let (store, _temp) = create_test_store();
        let charge = Charge::new(ResourceKind::DocumentPdf, "cacd", 1, Usd::from_cents(-5));
        assert!(matches!(
            store.insert_charge(&charge),
            Err(LedgerError::NegativeCharge(_))
        ));
    }

    #[test]
    fn test_queue_item_upsert_is_idempotent() {
        let (store, _temp) = create_test_store();
        let mut item = create_test_item("https://ecf.cacd.uscourts.gov/doc1/1");

        store.upsert_queue_item(&item).unwrap();
        store.upsert_queue_item(&item).unwrap();
        item.status = QueueStatus::InProgress;
        store.upsert_queue_item(&item).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.queue_count, 1);
        let loaded = store.get_queue_item(&item.id).unwrap().unwrap();
        assert_eq!(loaded.status, QueueStatus::InProgress);
    }

    #[test]
    fn test_queue_items_filtered_by_status() {
        let (store, _temp) = create_test_store();
        let pending = create_test_item("https://x/doc1/1");
        let mut failed = create_test_item("https://x/doc1/2");
        failed.status = QueueStatus::Failed;

        store.upsert_queue_item(&pending).unwrap();
        store.upsert_queue_item(&failed).unwrap();

        let items = store
            .queue_items_with_status(&[QueueStatus::Pending, QueueStatus::InProgress])
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, pending.id);

        store.remove_queue_item(&pending.id).unwrap();
        assert!(store.get_queue_item(&pending.id).unwrap().is_none());
    }

    #[test]
    fn test_case_lookup() {
        let (store, _temp) = create_test_store();
        store.remember_case_id("cacd", "2:24-cv-01234-ABC", "912345").unwrap();

        assert_eq!(
            store.lookup_case_id("CACD", "2:24-cv-01234").unwrap(),
            Some("912345".to_string())
        );
        assert_eq!(store.lookup_case_id("nysd", "2:24-cv-01234").unwrap(), None);
    }

    #[test]
    fn test_persist() {
        let (store, _temp) = create_test_store();
        store.upsert_queue_item(&create_test_item("https://x/doc1/9")).unwrap();
        store.persist().unwrap();
    }
}
