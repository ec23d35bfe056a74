use crate::core::errors::LedgerError;
use crate::core::models::{
    audit::GroupAudit,
    expense::{Expense, ExpenseSplit, ExpenseWithSplits},
    group::Group,
    payment::{Payment, PaymentStatus},
    user::User,
};
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryStorage {
    users: Arc<RwLock<HashMap<String, User>>>,
    groups: Arc<RwLock<HashMap<String, Group>>>,
    expenses: Arc<RwLock<HashMap<String, Expense>>>,
    splits: Arc<RwLock<HashMap<String, Vec<ExpenseSplit>>>>,
    payments: Arc<RwLock<HashMap<String, Payment>>>,
    payment_actor_columns: Arc<RwLock<bool>>,
    group_audits: Arc<RwLock<HashMap<String, Vec<GroupAudit>>>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::with_payment_actor_columns(true)
    }

    /// A store whose payment table predates the `marked_by` / `accepted_by`
    /// columns.
    pub fn legacy() -> Self {
        Self::with_payment_actor_columns(false)
    }

    fn with_payment_actor_columns(enabled: bool) -> Self {
        InMemoryStorage {
            users: Arc::new(RwLock::new(HashMap::new())),
            groups: Arc::new(RwLock::new(HashMap::new())),
            expenses: Arc::new(RwLock::new(HashMap::new())),
            splits: Arc::new(RwLock::new(HashMap::new())),
            payments: Arc::new(RwLock::new(HashMap::new())),
            payment_actor_columns: Arc::new(RwLock::new(enabled)),
            group_audits: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn check_actor_columns(&self, payment: &Payment) -> Result<(), LedgerError> {
        let has_columns = *self.payment_actor_columns.read().await;
        if !has_columns && (payment.marked_by.is_some() || payment.accepted_by.is_some()) {
            return Err(LedgerError::StorageError(
                "payments table has no marked_by/accepted_by columns".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn save_user(&self, user: User) -> Result<(), LedgerError> {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, LedgerError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn save_group(&self, group: Group) -> Result<(), LedgerError> {
        let mut groups = self.groups.write().await;
        groups.insert(group.id.clone(), group);
        Ok(())
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, LedgerError> {
        let groups = self.groups.read().await;
        Ok(groups.get(group_id).cloned())
    }

    async fn remove_group_member(&self, group_id: &str, user_id: &str) -> Result<(), LedgerError> {
        let mut groups = self.groups.write().await;
        let group = groups
            .get_mut(group_id)
            .ok_or_else(|| LedgerError::GroupNotFound(group_id.to_string()))?;
        group.members.retain(|m| m.user_id != user_id);
        Ok(())
    }

    async fn insert_expense(&self, expense: Expense) -> Result<(), LedgerError> {
        let mut expenses = self.expenses.write().await;
        if expenses.contains_key(&expense.id) {
            return Err(LedgerError::StorageError(format!("Expense {} already exists", expense.id)));
        }
        expenses.insert(expense.id.clone(), expense);
        Ok(())
    }

    async fn update_expense(&self, expense: Expense) -> Result<(), LedgerError> {
        let mut expenses = self.expenses.write().await;
        match expenses.get_mut(&expense.id) {
            Some(existing) => {
                *existing = expense;
                Ok(())
            }
            None => Err(LedgerError::ExpenseNotFound(expense.id)),
        }
    }

    async fn insert_splits(&self, splits: Vec<ExpenseSplit>) -> Result<(), LedgerError> {
        let expenses = self.expenses.read().await;
        let mut stored = self.splits.write().await;
        for split in splits {
            if !expenses.contains_key(&split.expense_id) {
                return Err(LedgerError::ExpenseNotFound(split.expense_id));
            }
            stored.entry(split.expense_id.clone()).or_default().push(split);
        }
        Ok(())
    }

    async fn replace_splits(
        &self,
        expense_id: &str,
        splits: Vec<ExpenseSplit>,
    ) -> Result<(), LedgerError> {
        let mut stored = self.splits.write().await;
        stored.insert(expense_id.to_string(), splits);
        Ok(())
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<(), LedgerError> {
        let mut expenses = self.expenses.write().await;
        let mut splits = self.splits.write().await;
        expenses.remove(expense_id);
        splits.remove(expense_id);
        Ok(())
    }

    async fn get_expense(
        &self,
        expense_id: &str,
    ) -> Result<Option<ExpenseWithSplits>, LedgerError> {
        let expenses = self.expenses.read().await;
        let splits = self.splits.read().await;
        Ok(expenses.get(expense_id).map(|expense| ExpenseWithSplits {
            expense: expense.clone(),
            splits: splits.get(expense_id).cloned().unwrap_or_default(),
        }))
    }

    async fn get_group_expenses(
        &self,
        group_id: &str,
    ) -> Result<Vec<ExpenseWithSplits>, LedgerError> {
        let expenses = self.expenses.read().await;
        let splits = self.splits.read().await;
        let mut records: Vec<ExpenseWithSplits> = expenses
            .values()
            .filter(|e| e.group_id == group_id)
            .map(|expense| ExpenseWithSplits {
                expense: expense.clone(),
                splits: splits.get(&expense.id).cloned().unwrap_or_default(),
            })
            .collect();
        records.sort_by(|a, b| {
            a.expense
                .timestamp
                .cmp(&b.expense.timestamp)
                .then_with(|| a.expense.id.cmp(&b.expense.id))
        });
        Ok(records)
    }

    async fn insert_payment(&self, payment: Payment) -> Result<(), LedgerError> {
        self.check_actor_columns(&payment).await?;
        let mut payments = self.payments.write().await;
        payments.insert(payment.id.clone(), payment);
        Ok(())
    }

    async fn resolve_payment(&self, payment: Payment) -> Result<(), LedgerError> {
        self.check_actor_columns(&payment).await?;
        let mut payments = self.payments.write().await;
        let stored = payments
            .get_mut(&payment.id)
            .ok_or_else(|| LedgerError::PaymentNotFound(payment.id.clone()))?;
        if !stored.is_pending() {
            return Err(LedgerError::PaymentAlreadyResolved(payment.id));
        }
        *stored = payment;
        Ok(())
    }

    async fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>, LedgerError> {
        let payments = self.payments.read().await;
        Ok(payments.get(payment_id).cloned())
    }

    async fn find_pending_payment(
        &self,
        group_id: &str,
        debtor_id: &str,
        creditor_id: &str,
    ) -> Result<Option<Payment>, LedgerError> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .find(|p| {
                p.group_id == group_id
                    && p.debtor_id == debtor_id
                    && p.creditor_id == creditor_id
                    && p.is_pending()
            })
            .cloned())
    }

    async fn get_payments(
        &self,
        group_id: &str,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<Payment>, LedgerError> {
        let payments = self.payments.read().await;
        let mut matching: Vec<Payment> = payments
            .values()
            .filter(|p| p.group_id == group_id && status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matching)
    }

    async fn has_payment_actor_columns(&self) -> Result<bool, LedgerError> {
        Ok(*self.payment_actor_columns.read().await)
    }

    async fn add_payment_actor_columns(&self) -> Result<(), LedgerError> {
        *self.payment_actor_columns.write().await = true;
        Ok(())
    }

    async fn save_group_audit(&self, audit: GroupAudit) -> Result<(), LedgerError> {
        let mut group_audits = self.group_audits.write().await;
        group_audits.entry(audit.group_id.clone()).or_default().push(audit);
        Ok(())
    }

    async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, LedgerError> {
        let group_audits = self.group_audits.read().await;
        Ok(group_audits.get(group_id).cloned().unwrap_or_default())
    }
}
