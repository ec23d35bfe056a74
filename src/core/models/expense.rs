use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Persisted expense row. Never edited in place: updates replace the amount,
/// category and the full split set together.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Expense {
    pub id: String,
    pub group_id: String,
    pub payer_id: String,
    pub amount: Decimal,
    pub category: String,
    pub description: Option<String>,
    pub created_by: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ExpenseSplit {
    pub expense_id: String,
    pub user_id: String,
    pub owed_amount: Decimal,
}

/// An expense joined with its split rows, as returned by the store.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ExpenseWithSplits {
    pub expense: Expense,
    pub splits: Vec<ExpenseSplit>,
}

impl ExpenseWithSplits {
    pub fn split_total(&self) -> Decimal {
        self.splits.iter().map(|s| s.owed_amount).sum()
    }
}
