//! Salary-structure arithmetic shared by the fixed and commission calculators.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{BonusTier, DetailLine, DetailType};

/// Rates above this are whole percentages and are rescaled to a fraction.
pub(crate) const PERCENT_RATE_CUTOFF: Decimal = Decimal::ONE;

/// Converts a rate written as a whole percentage (`10`) to a fraction (`0.1`).
/// Fractions pass through unchanged.
pub(crate) fn normalize_rate(rate: Decimal) -> Decimal {
    if rate > PERCENT_RATE_CUTOFF {
        rate / Decimal::ONE_HUNDRED
    } else {
        rate
    }
}

/// Returns the single tier whose threshold is the highest not exceeding
/// `sales`. Tiers never stack.
pub(crate) fn qualifying_tier(tiers: &[BonusTier], sales: Decimal) -> Option<&BonusTier> {
    tiers
        .iter()
        .filter(|tier| tier.threshold <= sales)
        .max_by(|a, b| a.threshold.cmp(&b.threshold))
}

/// The tiered bonus for `sales` plus its detail line, if any tier qualifies.
pub(crate) fn tier_bonus(tiers: &[BonusTier], sales: Decimal) -> (Decimal, Option<DetailLine>) {
    match qualifying_tier(tiers, sales) {
        Some(tier) if !tier.bonus.is_zero() => (
            tier.bonus,
            Some(DetailLine::new(
                DetailType::TargetBonus,
                tier.bonus,
                format!("Target bonus for sales at or above {}", tier.threshold),
            )),
        ),
        _ => (Decimal::ZERO, None),
    }
}

/// Rounds a currency amount to cents.
pub(crate) fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds to whole currency units.
pub(crate) fn round_units(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// The base salary detail line.
pub(crate) fn base_salary_line(amount: Decimal) -> DetailLine {
    DetailLine::new(DetailType::BaseSalary, amount, "Base salary")
}
