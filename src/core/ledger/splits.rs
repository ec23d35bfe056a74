//! Split calculator and validator.
//!
//! The calculators are pure; only `equal_split` guarantees an exact sum. The
//! percentage and share calculators can drift by a cent or two and must be
//! followed by [`apply_remainder_fix`] before the result is persisted, which
//! [`SplitPolicy::resolve`] does.

use crate::core::money::{EPSILON, MAX_AMOUNT, approx_eq, round_money};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Upper bound on a single member's share weight.
pub const MAX_SHARE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SplitShare {
    pub user_id: String,
    pub owed_amount: Decimal,
}

impl SplitShare {
    fn new(user_id: &str, owed_amount: Decimal) -> Self {
        SplitShare {
            user_id: user_id.to_string(),
            owed_amount,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MemberValue {
    pub user_id: String,
    pub value: Decimal,
}

/// How an expense is divided among members.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SplitPolicy {
    Equal { members: Vec<String> },
    Unequal { amounts: Vec<MemberValue> },
    Percentage { percents: Vec<MemberValue> },
    Shares { shares: Vec<MemberValue> },
}

impl SplitPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            SplitPolicy::Equal { .. } => "equal",
            SplitPolicy::Unequal { .. } => "unequal",
            SplitPolicy::Percentage { .. } => "percentage",
            SplitPolicy::Shares { .. } => "shares",
        }
    }

    /// Final splits for `amount`. Percentage and share results are corrected
    /// so they sum to `amount` exactly. Unequal amounts are passed through and
    /// still need [`validate_splits`].
    pub fn resolve(&self, amount: Decimal) -> Vec<SplitShare> {
        let splits = match self {
            SplitPolicy::Equal { members } => equal_split(amount, members),
            SplitPolicy::Unequal { amounts } => unequal_split(amount, amounts),
            SplitPolicy::Percentage { percents } => {
                apply_remainder_fix(amount, percentage_split(amount, percents))
            }
            SplitPolicy::Shares { shares } => {
                apply_remainder_fix(amount, share_split(amount, shares))
            }
        };
        debug!("Resolved {} split of {} into {:?}", self.name(), amount, splits);
        splits
    }

    /// Policy-specific input checks that must pass before resolving.
    pub fn validate_inputs(&self) -> SplitValidation {
        match self {
            SplitPolicy::Equal { members } if members.is_empty() => {
                SplitValidation::invalid("Select at least one member to split with")
            }
            SplitPolicy::Unequal { amounts } if amounts.is_empty() => {
                SplitValidation::invalid("Enter at least one member amount")
            }
            SplitPolicy::Unequal { amounts } if amounts.iter().any(|a| a.value < Decimal::ZERO) => {
                SplitValidation::invalid("Member amounts cannot be negative")
            }
            SplitPolicy::Unequal { amounts } if amounts.iter().any(|a| a.value > MAX_AMOUNT) => {
                SplitValidation::invalid("Member amounts cannot exceed 1,000,000")
            }
            SplitPolicy::Percentage { percents } => validate_percentages(percents),
            SplitPolicy::Shares { shares } if shares.iter().any(|s| s.value < Decimal::ZERO) => {
                SplitValidation::invalid("Shares cannot be negative")
            }
            SplitPolicy::Shares { shares } if shares.iter().any(|s| s.value > MAX_SHARE) => {
                SplitValidation::invalid("A member cannot hold more than 1,000,000 shares")
            }
            SplitPolicy::Shares { shares }
                if shares.iter().map(|s| s.value).sum::<Decimal>() == Decimal::ZERO =>
            {
                SplitValidation::invalid("Total shares must be greater than 0")
            }
            _ => SplitValidation::valid(),
        }
    }

    pub fn member_ids(&self) -> Vec<&str> {
        match self {
            SplitPolicy::Equal { members } => members.iter().map(String::as_str).collect(),
            SplitPolicy::Unequal { amounts: values }
            | SplitPolicy::Percentage { percents: values }
            | SplitPolicy::Shares { shares: values } => {
                values.iter().map(|v| v.user_id.as_str()).collect()
            }
        }
    }
}

/// Divides `amount` evenly; the last member absorbs the rounding residue so
/// the total is exact to the cent.
pub fn equal_split(amount: Decimal, members: &[String]) -> Vec<SplitShare> {
    let Some((last, rest)) = members.split_last() else {
        return Vec::new();
    };
    let count = Decimal::from(members.len());
    let base = round_money(amount / count);
    let mut splits: Vec<SplitShare> = rest.iter().map(|m| SplitShare::new(m, base)).collect();
    let remainder = round_money(amount - base * Decimal::from(rest.len()));
    splits.push(SplitShare::new(last, remainder));
    splits
}

pub fn unequal_split(_amount: Decimal, amounts: &[MemberValue]) -> Vec<SplitShare> {
    amounts
        .iter()
        .map(|a| SplitShare::new(&a.user_id, round_money(a.value)))
        .collect()
}

/// Not self-correcting; see [`apply_remainder_fix`].
pub fn percentage_split(amount: Decimal, percents: &[MemberValue]) -> Vec<SplitShare> {
    percents
        .iter()
        .map(|p| SplitShare::new(&p.user_id, round_money(amount * p.value / ONE_HUNDRED)))
        .collect()
}

/// Not self-correcting; see [`apply_remainder_fix`]. Zero total shares yields
/// no splits.
pub fn share_split(amount: Decimal, shares: &[MemberValue]) -> Vec<SplitShare> {
    let total: Decimal = shares.iter().map(|s| s.value).sum();
    if total == Decimal::ZERO {
        return Vec::new();
    }
    shares
        .iter()
        .map(|s| SplitShare::new(&s.user_id, round_money(amount * s.value / total)))
        .collect()
}

/// Assigns whatever the splits miss (or overshoot) to the last member.
pub fn apply_remainder_fix(amount: Decimal, mut splits: Vec<SplitShare>) -> Vec<SplitShare> {
    let total: Decimal = splits.iter().map(|s| s.owed_amount).sum();
    let residual = round_money(amount - total);
    if let Some(last) = splits.last_mut() {
        if residual != Decimal::ZERO {
            debug!("Assigning rounding residual {} to {}", residual, last.user_id);
            last.owed_amount = round_money(last.owed_amount + residual);
        }
    }
    splits
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SplitValidation {
    pub is_valid: bool,
    pub message: Option<String>,
}

impl SplitValidation {
    pub fn valid() -> Self {
        SplitValidation {
            is_valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        SplitValidation {
            is_valid: false,
            message: Some(message.into()),
        }
    }
}

pub fn validate_splits(amount: Decimal, splits: &[SplitShare]) -> SplitValidation {
    if amount <= Decimal::ZERO {
        return SplitValidation::invalid("Amount must be greater than 0");
    }
    if splits.is_empty() {
        return SplitValidation::invalid("At least one member must share the expense");
    }
    if splits.iter().any(|s| s.owed_amount < Decimal::ZERO) {
        return SplitValidation::invalid("Split amounts cannot be negative");
    }
    let total: Decimal = splits.iter().map(|s| s.owed_amount).sum();
    if (total - amount).abs() > EPSILON {
        return SplitValidation::invalid(format!(
            "Split amounts add up to {} but the expense is {}",
            round_money(total),
            amount
        ));
    }
    SplitValidation::valid()
}

pub fn validate_percentages(percents: &[MemberValue]) -> SplitValidation {
    if percents.is_empty() {
        return SplitValidation::invalid("Enter at least one member percentage");
    }
    if percents.iter().any(|p| p.value < Decimal::ZERO) {
        return SplitValidation::invalid("Percentages cannot be negative");
    }
    if percents.iter().any(|p| p.value > ONE_HUNDRED) {
        return SplitValidation::invalid("A percentage cannot exceed 100%");
    }
    let total: Decimal = percents.iter().map(|p| p.value).sum();
    if !approx_eq(total, ONE_HUNDRED) {
        return SplitValidation::invalid(format!(
            "Percentages add up to {}% instead of 100%",
            total
        ));
    }
    SplitValidation::valid()
}
