//! Star pricing: base price per star, operator markup, package tiers
//!
//! Prices are quoted in TON with 4-decimal precision. Rounding is always
//! `MidpointAwayFromZero` so a quote is reproducible from (stars, per_star,
//! markup) alone.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Accepted shortfall when matching an on-chain transfer against a quote:
/// 0.0001 TON, expressed in nanoTON. Absorbs rounding on either side;
/// anything below `quote - TOLERANCE_NANO` is rejected.
pub const TOLERANCE_NANO: i64 = 100_000;

const NANO_PER_TON: i64 = 1_000_000_000;

/// Fragment-style package tiers: (stars, base price in ten-thousandths of TON).
const TIERS: &[(i32, i64)] = &[
    (50, 4094),
    (75, 6142),
    (100, 8189),
    (150, 12284),
    (250, 20474),
    (350, 28663),
    (500, 40948),
    (750, 61422),
];

#[derive(Debug, Clone, Serialize)]
pub struct PriceTier {
    pub stars: i32,
    pub amount_ton: Decimal,
}

/// Immutable pricing parameters loaded from config at startup.
#[derive(Debug, Clone)]
pub struct PriceBook {
    /// Base price of one star, in TON.
    pub per_star: Decimal,
    /// Operator markup in percent (e.g. 3 for +3%).
    pub markup_percent: Decimal,
}

impl PriceBook {
    pub fn new(per_star: Decimal, markup_percent: Decimal) -> Self {
        Self {
            per_star,
            markup_percent,
        }
    }

    /// Quote `stars` stars: stars × per_star × (1 + markup/100),
    /// rounded to 4 decimals.
    pub fn quote(&self, stars: i32) -> Decimal {
        let base = Decimal::from(stars) * self.per_star;
        let factor = Decimal::ONE + self.markup_percent / Decimal::ONE_HUNDRED;
        (base * factor).round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Package tier table with the markup applied.
    pub fn tiers(&self) -> Vec<PriceTier> {
        let factor = Decimal::ONE + self.markup_percent / Decimal::ONE_HUNDRED;
        TIERS
            .iter()
            .map(|&(stars, base_ten_thousandths)| PriceTier {
                stars,
                amount_ton: (Decimal::new(base_ten_thousandths, 4) * factor)
                    .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero),
            })
            .collect()
    }
}

/// Convert a TON amount to integer nanoTON, rounding to the nearest nano.
pub fn ton_to_nano(amount: Decimal) -> i64 {
    (amount * Decimal::from(NANO_PER_TON))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}
