use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Directed, netted debt between two members after accepted payments.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct PairwiseDebt {
    pub from: String,
    pub to: String,
    /// Remaining amount after accepted payments.
    pub amount: Decimal,
    pub original_amount: Decimal,
    pub paid_amount: Decimal,
    pub settled: bool,
}

/// Output of the pairwise aggregator.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct PairwiseLedger {
    pub debts: Vec<PairwiseDebt>,
    /// Number of accepted payments folded into `debts`.
    pub accepted_payments: usize,
}

impl PairwiseLedger {
    pub fn has_accepted_payments(&self) -> bool {
        self.accepted_payments > 0
    }

    pub fn involving<'a>(
        &'a self,
        user_id: &'a str,
    ) -> impl Iterator<Item = &'a PairwiseDebt> + 'a {
        self.debts.iter().filter(move |d| d.from == user_id || d.to == user_id)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct NetBalance {
    pub user_id: String,
    /// Positive: is owed. Negative: owes.
    pub net_balance: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SimplifiedDebt {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

/// What the group is shown as "who owes whom".
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(tag = "mode", content = "debts", rename_all = "snake_case")]
pub enum BalanceView {
    /// No accepted payment exists yet: the minimized settlement plan.
    Simplified(Vec<SimplifiedDebt>),
    /// Settlement has started: raw pairwise edges, untouched.
    Pairwise(Vec<PairwiseDebt>),
}

impl BalanceView {
    pub fn is_simplified(&self) -> bool {
        matches!(self, BalanceView::Simplified(_))
    }
}
