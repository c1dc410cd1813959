use serde::{Deserialize, Serialize};

use crate::money::Usd;

/// Billing rules of the external document system.
///
/// Documents are billed by size (roughly one page per `bytes_per_page`),
/// docket sheets by entry count. Both are capped at `max_charge`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CostModel {
    #[serde(default = "default_per_page_rate")]
    pub per_page_rate: Usd,
    #[serde(default = "default_max_charge")]
    pub max_charge: Usd,
    #[serde(default = "default_bytes_per_page")]
    pub bytes_per_page: u64,
    #[serde(default = "default_entries_per_page")]
    pub entries_per_page: u32,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            per_page_rate: default_per_page_rate(),
            max_charge: default_max_charge(),
            bytes_per_page: default_bytes_per_page(),
            entries_per_page: default_entries_per_page(),
        }
    }
}

fn default_per_page_rate() -> Usd {
    Usd::from_cents(10)
}

fn default_max_charge() -> Usd {
    Usd::from_cents(300)
}

fn default_bytes_per_page() -> u64 {
    50_000
}

fn default_entries_per_page() -> u32 {
    20
}

impl CostModel {
    /// Most pages that can be billed before the cap applies.
    pub fn max_pages(&self) -> u32 {
        if self.per_page_rate.cents() <= 0 {
            return u32::MAX;
        }
        let pages = self.max_charge.cents() / self.per_page_rate.cents();
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    /// The smallest amount any billable request can cost.
    pub fn minimum_charge(&self) -> Usd {
        self.per_page_rate.min(self.max_charge)
    }

    pub fn document_pages(&self, bytes: u64) -> u32 {
        let per_page = self.bytes_per_page.max(1);
        let pages = bytes.div_ceil(per_page).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX).min(self.max_pages())
    }

    pub fn docket_pages(&self, entries: usize) -> u32 {
        let per_page = self.entries_per_page.max(1) as usize;
        let pages = entries / per_page + 1;
        u32::try_from(pages).unwrap_or(u32::MAX).min(self.max_pages())
    }

    pub fn cost_for_pages(&self, pages: u32) -> Usd {
        self.per_page_rate.times(pages).min(self.max_charge)
    }
}
