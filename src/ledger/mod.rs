/// Fjall-based persistence layer and spend accounting
///
/// This module provides durable storage for the acquisition pipeline. It uses
/// Fjall (an embedded LSM key-value store) to persist:
///
/// - Charges (append-only billing records, the sole source of spend totals)
/// - Download queue items (upserted on every state transition)
/// - Case-number to internal case id lookups
///
/// On top of the store, [`SpendLedger`] answers "may we spend this much right
/// now?" by recomputing daily and monthly totals from charge history.
///
/// ## Usage
///
/// ```rust,ignore
/// use courtfetch::ledger::{CostModel, FjallStore, SpendLedger, SpendLimits};
///
/// let store = FjallStore::open("data/ledger")?;
/// let ledger = SpendLedger::new(store, limits, CostModel::default());
/// let window = ledger.check_limits()?;
/// ```

pub mod charge;
pub mod cost;
pub mod error;
pub mod partitions;
pub mod spend;
pub mod store;

pub use charge::{Charge, ResourceKind};
pub use cost::CostModel;
pub use error::{LedgerError, Result};
pub use spend::{SpendLedger, SpendLimits, SpendWindow};
pub use store::{FjallStore, StoreStats};
