use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::money::Usd;

use super::charge::Charge;
use super::cost::CostModel;
use super::error::Result;
use super::store::FjallStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendLimits {
    pub daily: Usd,
    pub monthly: Usd,
}

/// Headroom derived from charge history at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpendWindow {
    pub daily_total: Usd,
    pub monthly_total: Usd,
    pub daily_limit: Usd,
    pub monthly_limit: Usd,
    pub daily_remaining: Usd,
    pub monthly_remaining: Usd,
    pub can_proceed: bool,
}

impl SpendWindow {
    /// Spend still permitted by both windows.
    pub fn remaining(&self) -> Usd {
        self.daily_remaining.min(self.monthly_remaining)
    }

    /// Whether `amount` fits under both limits.
    pub fn admits(&self, amount: Usd) -> bool {
        self.daily_total + amount <= self.daily_limit
            && self.monthly_total + amount <= self.monthly_limit
    }
}

/// Admission control for paid requests, backed by persisted charges.
#[derive(Clone)]
pub struct SpendLedger {
    store: FjallStore,
    limits: SpendLimits,
    costs: CostModel,
}

impl SpendLedger {
    pub fn new(store: FjallStore, limits: SpendLimits, costs: CostModel) -> Self {
        Self {
            store,
            limits,
            costs,
        }
    }

    pub fn limits(&self) -> SpendLimits {
        self.limits
    }

    pub fn costs(&self) -> &CostModel {
        &self.costs
    }

    pub fn check_limits(&self) -> Result<SpendWindow> {
        self.check_limits_at(Utc::now())
    }

    /// Totals for the UTC day and month containing `now`.
    pub fn check_limits_at(&self, now: DateTime<Utc>) -> Result<SpendWindow> {
        let day = now.date_naive();
        let daily_total: Usd = self
            .store
            .charges_on_day(day)?
            .iter()
            .map(|c| c.amount_usd)
            .sum();
        let monthly_total: Usd = self
            .store
            .charges_in_month(day)?
            .iter()
            .map(|c| c.amount_usd)
            .sum();

        let mut window = SpendWindow {
            daily_total,
            monthly_total,
            daily_limit: self.limits.daily,
            monthly_limit: self.limits.monthly,
            daily_remaining: self.limits.daily.saturating_sub(daily_total),
            monthly_remaining: self.limits.monthly.saturating_sub(monthly_total),
            can_proceed: false,
        };
        window.can_proceed = window.admits(self.costs.minimum_charge());
        Ok(window)
    }

    /// Whether a request costing `cost` may be made right now.
    pub fn can_afford(&self, cost: Usd) -> Result<bool> {
        let window = self.check_limits()?;
        let ok = window.admits(cost);
        if !ok {
            info!(
                cost = %cost,
                daily_total = %window.daily_total,
                monthly_total = %window.monthly_total,
                "Spend limit would be exceeded"
            );
        }
        Ok(ok)
    }

    /// Persist a charge. The only way totals ever change.
    pub fn record_charge(&self, charge: &Charge) -> Result<()> {
        self.store.insert_charge(charge)?;
        let window = self.check_limits_at(charge.created_at)?;
        if window.daily_total > window.daily_limit || window.monthly_total > window.monthly_limit {
            warn!(
                charge_id = %charge.id,
                daily_total = %window.daily_total,
                monthly_total = %window.monthly_total,
                "Recorded charge pushed spend past a limit"
            );
        } else {
            info!(
                charge_id = %charge.id,
                kind = %charge.resource_kind,
                amount = %charge.amount_usd,
                daily_total = %window.daily_total,
                "Charge recorded"
            );
        }
        Ok(())
    }

    pub fn recent_charges(&self, limit: usize) -> Result<Vec<Charge>> {
        self.store.recent_charges(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ResourceKind;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_ledger(daily_cents: i64, monthly_cents: i64) -> (SpendLedger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallStore::open(temp_dir.path().join("ledger")).unwrap();
        let ledger = SpendLedger::new(
            store,
            SpendLimits {
                daily: Usd::from_cents(daily_cents),
                monthly: Usd::from_cents(monthly_cents),
            },
            CostModel::default(),
        );
        (ledger, temp_dir)
    }

    fn charge(cents: i64, at: DateTime<Utc>) -> Charge {
        Charge::new(ResourceKind::DocumentPdf, "cacd", 1, Usd::from_cents(cents)).at(at)
    }

    #[test]
    fn test_empty_ledger_can_proceed() {
        let (ledger, _temp) = create_test_ledger(1000, 3000);
        let window = ledger.check_limits().unwrap();
        assert_eq!(window.daily_total, Usd::ZERO);
        assert_eq!(window.daily_remaining, Usd::from_cents(1000));
        assert!(window.can_proceed);
    }

    #[test]
    fn test_can_proceed_tracks_next_minimum_spend() {
        // Property: with limit L and running total S, can_proceed holds
        // exactly while S + minimum charge <= L.
        let (ledger, _temp) = create_test_ledger(100, 10_000);
        let now = Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap();

        let mut total = 0;
        for cents in [30, 30, 20, 10, 10] {
            ledger.record_charge(&charge(cents, now)).unwrap();
            total += cents;
            let window = ledger.check_limits_at(now).unwrap();
            assert_eq!(window.daily_total, Usd::from_cents(total));
            assert_eq!(window.can_proceed, total + 10 <= 100, "total={total}");
        }
        assert_eq!(total, 100);
        assert!(!ledger.check_limits_at(now).unwrap().can_proceed);
    }

    #[test]
    fn test_monthly_limit_blocks_even_with_daily_headroom() {
        let (ledger, _temp) = create_test_ledger(1000, 500);
        let now = Utc.with_ymd_and_hms(2026, 6, 20, 12, 0, 0).unwrap();
        for day in 1..=5 {
            let ts = Utc.with_ymd_and_hms(2026, 6, day, 12, 0, 0).unwrap();
            ledger.record_charge(&charge(100, ts)).unwrap();
        }

        let window = ledger.check_limits_at(now).unwrap();
        assert_eq!(window.daily_total, Usd::ZERO);
        assert_eq!(window.monthly_total, Usd::from_cents(500));
        assert_eq!(window.monthly_remaining, Usd::ZERO);
        assert_eq!(window.remaining(), Usd::ZERO);
        assert!(!window.can_proceed);
    }

    #[test]
    fn test_previous_day_does_not_count_toward_today() {
        let (ledger, _temp) = create_test_ledger(100, 10_000);
        let yesterday = Utc.with_ymd_and_hms(2026, 6, 9, 23, 59, 0).unwrap();
        let today = Utc.with_ymd_and_hms(2026, 6, 10, 0, 1, 0).unwrap();
        ledger.record_charge(&charge(100, yesterday)).unwrap();

        let window = ledger.check_limits_at(today).unwrap();
        assert_eq!(window.daily_total, Usd::ZERO);
        assert_eq!(window.monthly_total, Usd::from_cents(100));
        assert!(window.can_proceed);
    }

    #[test]
    fn test_can_afford() {
        let (ledger, _temp) = create_test_ledger(100, 10_000);
        ledger.record_charge(&charge(70, Utc::now())).unwrap();
        assert!(ledger.can_afford(Usd::from_cents(30)).unwrap());
        assert!(!ledger.can_afford(Usd::from_cents(31)).unwrap());
    }
}
