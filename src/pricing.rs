//! Duration-based discount policy attached to alternative suggestions.

use serde::Serialize;

use crate::model::Cents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub discount_percent: u8,
    pub price_per_day: Option<Cents>,
    pub total_price: Option<Cents>,
    /// Only reported when a discount applies.
    pub savings: Option<Cents>,
}

pub trait PricingPolicy: Send + Sync {
    /// Discount for a rental of `days` whole days, `0..=100`.
    fn discount_percent(&self, days: i64) -> u8;

    fn quote(&self, days: i64, price_per_day: Option<Cents>) -> Quote {
        let discount = self.discount_percent(days).min(100);
        let Some(price) = price_per_day else {
            return Quote {
                discount_percent: discount,
                price_per_day: None,
                total_price: None,
                savings: None,
            };
        };
        let gross = days.saturating_mul(price);
        let savings = gross.saturating_mul(i64::from(discount)) / 100;
        Quote {
            discount_percent: discount,
            price_per_day: Some(price),
            total_price: Some(gross.saturating_sub(savings)),
            savings: (discount > 0).then_some(savings),
        }
    }
}

/// Step table: the highest tier whose `min_days` is reached wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieredDiscount {
    /// `(min_days, percent)`, kept sorted by `min_days` descending.
    tiers: Vec<(i64, u8)>,
}

impl TieredDiscount {
    pub fn new(mut tiers: Vec<(i64, u8)>) -> Self {
        tiers.sort_by(|a, b| b.0.cmp(&a.0));
        Self { tiers }
    }
}

impl Default for TieredDiscount {
    /// 30+ days: 20%, 14+: 15%, 7+: 10%.
    fn default() -> Self {
        Self::new(vec![(30, 20), (14, 15), (7, 10)])
    }
}

impl PricingPolicy for TieredDiscount {
    fn discount_percent(&self, days: i64) -> u8 {
        self.tiers
            .iter()
            .find(|(min_days, _)| days >= *min_days)
            .map_or(0, |(_, pct)| *pct)
    }
}

/// Never discounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscount;

impl PricingPolicy for NoDiscount {
    fn discount_percent(&self, _days: i64) -> u8 {
        0
    }
}
