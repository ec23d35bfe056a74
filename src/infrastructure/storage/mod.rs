use crate::core::errors::LedgerError;
use crate::core::models::{
    audit::GroupAudit,
    expense::{Expense, ExpenseSplit, ExpenseWithSplits},
    group::Group,
    payment::{Payment, PaymentStatus},
    user::User,
};
use async_trait::async_trait;

/// Persistence boundary for the ledger: the expense/split store, the payment
/// store and the user directory. Every operation is a single-record write or
/// a read; there are no multi-record transactions.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn save_user(&self, user: User) -> Result<(), LedgerError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, LedgerError>;

    async fn save_group(&self, group: Group) -> Result<(), LedgerError>;
    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, LedgerError>;
    async fn remove_group_member(&self, group_id: &str, user_id: &str) -> Result<(), LedgerError>;

    async fn insert_expense(&self, expense: Expense) -> Result<(), LedgerError>;
    async fn update_expense(&self, expense: Expense) -> Result<(), LedgerError>;
    async fn insert_splits(&self, splits: Vec<ExpenseSplit>) -> Result<(), LedgerError>;
    async fn replace_splits(
        &self,
        expense_id: &str,
        splits: Vec<ExpenseSplit>,
    ) -> Result<(), LedgerError>;
    /// Removes the expense and all of its splits.
    async fn delete_expense(&self, expense_id: &str) -> Result<(), LedgerError>;
    async fn get_expense(&self, expense_id: &str) -> Result<Option<ExpenseWithSplits>, LedgerError>;
    async fn get_group_expenses(
        &self,
        group_id: &str,
    ) -> Result<Vec<ExpenseWithSplits>, LedgerError>;

    async fn insert_payment(&self, payment: Payment) -> Result<(), LedgerError>;
    /// Writes a resolved payment. Fails if the stored row is no longer pending.
    async fn resolve_payment(&self, payment: Payment) -> Result<(), LedgerError>;
    async fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>, LedgerError>;
    async fn find_pending_payment(
        &self,
        group_id: &str,
        debtor_id: &str,
        creditor_id: &str,
    ) -> Result<Option<Payment>, LedgerError>;
    async fn get_payments(
        &self,
        group_id: &str,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<Payment>, LedgerError>;

    /// Whether the payment table carries the optional `marked_by` /
    /// `accepted_by` columns.
    async fn has_payment_actor_columns(&self) -> Result<bool, LedgerError>;
    async fn add_payment_actor_columns(&self) -> Result<(), LedgerError>;

    async fn save_group_audit(&self, audit: GroupAudit) -> Result<(), LedgerError>;
    async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, LedgerError>;
}

pub mod in_memory;
