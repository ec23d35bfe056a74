use super::{GROUP, create_test_service, equal_draft, seed_group};
use crate::constants::{EXPENSE_CREATED, EXPENSE_DELETED, EXPENSE_UPDATED};
use crate::core::capabilities::CapabilityDetector;
use crate::core::errors::LedgerError;
use crate::core::ledger::{MemberValue, SplitPolicy};
use crate::core::models::{
    audit::GroupAudit,
    expense::{Expense, ExpenseSplit, ExpenseWithSplits},
    group::Group,
    payment::{Payment, PaymentStatus},
    user::User,
};
use crate::core::services::{ExpenseDraft, LedgerService};
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::Storage;
use crate::infrastructure::storage::in_memory::InMemoryStorage;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn values(pairs: &[(&str, Decimal)]) -> Vec<MemberValue> {
    pairs
        .iter()
        .map(|(u, v)| MemberValue {
            user_id: u.to_string(),
            value: *v,
        })
        .collect()
}

fn draft(payer: &str, amount: Decimal, split: SplitPolicy) -> ExpenseDraft {
    ExpenseDraft {
        payer_id: payer.to_string(),
        amount,
        category: "travel".to_string(),
        description: Some("Taxi".to_string()),
        split,
    }
}

#[tokio::test]
async fn test_create_equal_expense() {
    let (service, storage) = create_test_service();
    seed_group(&storage, GROUP, &["a", "b", "c"]).await;

    let created = service
        .create_expense(GROUP, equal_draft("a", dec!(300), &["a", "b", "c"]), "a")
        .await
        .unwrap();

    assert_eq!(created.splits.len(), 3);
    assert!(created.splits.iter().all(|s| s.owed_amount == dec!(100)));
    assert_eq!(created.split_total(), dec!(300));

    let stored = service.get_group_expenses(GROUP, "b").await.unwrap();
    assert_eq!(stored, vec![created.clone()]);

    let audits = service.get_group_audits(GROUP).await.unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, EXPENSE_CREATED);
    assert_eq!(audits[0].user_id.as_deref(), Some("a"));

    let logs = service.get_app_logs().await.unwrap();
    assert!(logs.iter().any(|l| l.action == EXPENSE_CREATED));
}

#[tokio::test]
async fn test_share_split_residual_goes_to_last_member() {
    let (service, storage) = create_test_service();
    seed_group(&storage, GROUP, &["a", "b", "c"]).await;

    let split = SplitPolicy::Shares {
        shares: values(&[("a", dec!(1)), ("b", dec!(1)), ("c", dec!(1))]),
    };
    let created = service.create_expense(GROUP, draft("a", dec!(100), split), "a").await.unwrap();

    let owed: Vec<Decimal> = created.splits.iter().map(|s| s.owed_amount).collect();
    assert_eq!(owed, vec![dec!(33.33), dec!(33.33), dec!(33.34)]);
    assert_eq!(created.split_total(), dec!(100));
}

#[tokio::test]
async fn test_percentage_split_must_total_one_hundred() {
    let (service, storage) = create_test_service();
    seed_group(&storage, GROUP, &["a", "b"]).await;

    let split = SplitPolicy::Percentage {
        percents: values(&[("a", dec!(60)), ("b", dec!(30))]),
    };
    let err = service
        .create_expense(GROUP, draft("a", dec!(50), split), "a")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidSplit(_)));
    assert!(service.get_group_expenses(GROUP, "a").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unequal_split_must_match_amount() {
    let (service, storage) = create_test_service();
    seed_group(&storage, GROUP, &["a", "b", "c"]).await;

    let split = SplitPolicy::Unequal {
        amounts: values(&[("b", dec!(40)), ("c", dec!(50))]),
    };
    let err = service
        .create_expense(GROUP, draft("a", dec!(100), split), "a")
        .await
        .unwrap_err();
    match err {
        LedgerError::InvalidSplit(message) => assert!(message.contains("add up to 90")),
        other => panic!("unexpected error {:?}", other),
    }

    // Within a cent is accepted.
    let split = SplitPolicy::Unequal {
        amounts: values(&[("b", dec!(49.99)), ("c", dec!(50))]),
    };
    assert!(service.create_expense(GROUP, draft("a", dec!(100), split), "a").await.is_ok());
}

#[tokio::test]
async fn test_membership_is_enforced() {
    let (service, storage) = create_test_service();
    seed_group(&storage, GROUP, &["a", "b"]).await;

    let err = service
        .create_expense(GROUP, equal_draft("a", dec!(10), &["a", "b"]), "mallory")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotGroupMember(ref id) if id == "mallory"));

    let err = service
        .create_expense(GROUP, equal_draft("mallory", dec!(10), &["a", "b"]), "a")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotGroupMember(ref id) if id == "mallory"));

    let err = service
        .create_expense(GROUP, equal_draft("a", dec!(10), &["a", "mallory"]), "a")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotGroupMember(ref id) if id == "mallory"));

    let err = service
        .create_expense("nowhere", equal_draft("a", dec!(10), &["a"]), "a")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::GroupNotFound(_)));
}

#[tokio::test]
async fn test_rejects_bad_amounts_and_inputs() {
    let (service, storage) = create_test_service();
    seed_group(&storage, GROUP, &["a", "b"]).await;

    for amount in [dec!(0), dec!(-5), dec!(10.005), dec!(1000000.01)] {
        let err = service
            .create_expense(GROUP, equal_draft("a", amount, &["a", "b"]), "a")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(ref field, _) if field == "amount"));
    }

    let mut blank = equal_draft("a", dec!(10), &["a", "b"]);
    blank.category = "   ".to_string();
    let err = service.create_expense(GROUP, blank, "a").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(ref field, _) if field == "category"));

    let err = service
        .create_expense(GROUP, equal_draft("a", dec!(10), &["a", "b", "a"]), "a")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidSplit(_)));

    let err = service
        .create_expense(GROUP, equal_draft("a", dec!(10), &[]), "a")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidSplit(_)));
}

#[tokio::test]
async fn test_update_replaces_splits_wholesale() {
    let (service, storage) = create_test_service();
    seed_group(&storage, GROUP, &["a", "b", "c"]).await;

    let created = service
        .create_expense(GROUP, equal_draft("a", dec!(90), &["a", "b", "c"]), "a")
        .await
        .unwrap();

    let split = SplitPolicy::Unequal {
        amounts: values(&[("b", dec!(50)), ("c", dec!(10))]),
    };
    let updated = service
        .update_expense(&created.expense.id, draft("b", dec!(60), split), "c")
        .await
        .unwrap();

    assert_eq!(updated.expense.id, created.expense.id);
    assert_eq!(updated.expense.payer_id, "b");
    assert_eq!(updated.expense.amount, dec!(60));
    assert_eq!(updated.expense.created_by, "a");

    let stored = service.get_group_expenses(GROUP, "a").await.unwrap();
    assert_eq!(stored.len(), 1);
    let owed: Vec<(&str, Decimal)> = stored[0]
        .splits
        .iter()
        .map(|s| (s.user_id.as_str(), s.owed_amount))
        .collect();
    assert_eq!(owed, vec![("b", dec!(50)), ("c", dec!(10))]);

    let audits = service.get_group_audits(GROUP).await.unwrap();
    assert_eq!(audits.last().map(|a| a.action.as_str()), Some(EXPENSE_UPDATED));
}

#[tokio::test]
async fn test_delete_cascades_to_splits() {
    let (service, storage) = create_test_service();
    seed_group(&storage, GROUP, &["a", "b"]).await;

    let created = service
        .create_expense(GROUP, equal_draft("a", dec!(20), &["a", "b"]), "a")
        .await
        .unwrap();
    service.delete_expense(&created.expense.id, "b").await.unwrap();

    assert!(service.get_group_expenses(GROUP, "a").await.unwrap().is_empty());
    assert!(storage.get_expense(&created.expense.id).await.unwrap().is_none());
    assert!(service.get_net_balances(GROUP, "a").await.unwrap().is_empty());

    let err = service.delete_expense(&created.expense.id, "a").await.unwrap_err();
    assert!(matches!(err, LedgerError::ExpenseNotFound(_)));

    let audits = service.get_group_audits(GROUP).await.unwrap();
    assert_eq!(audits.last().map(|a| a.action.as_str()), Some(EXPENSE_DELETED));
}

#[tokio::test]
async fn test_preview_does_not_persist() {
    let (service, storage) = create_test_service();
    seed_group(&storage, GROUP, &["a", "b", "c"]).await;

    let preview = service.preview_splits(
        dec!(100),
        &SplitPolicy::Percentage {
            percents: values(&[("a", dec!(33.33)), ("b", dec!(33.33)), ("c", dec!(33.34))]),
        },
    );
    assert!(preview.validation.is_valid);
    let total: Decimal = preview.splits.iter().map(|s| s.owed_amount).sum();
    assert_eq!(total, dec!(100));

    let preview = service.preview_splits(
        dec!(100),
        &SplitPolicy::Percentage {
            percents: values(&[("a", dec!(50)), ("b", dec!(20))]),
        },
    );
    assert!(!preview.validation.is_valid);
    assert!(preview.splits.is_empty());

    assert!(service.get_group_expenses(GROUP, "a").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_preview_reports_oversized_input() {
    let (service, _) = create_test_service();

    let preview = service.preview_splits(
        Decimal::MAX,
        &SplitPolicy::Shares {
            shares: values(&[("a", dec!(2)), ("b", dec!(1))]),
        },
    );
    assert!(!preview.validation.is_valid);
    assert!(preview.splits.is_empty());

    let preview = service.preview_splits(
        dec!(10),
        &SplitPolicy::Shares {
            shares: values(&[("a", Decimal::MAX), ("b", Decimal::MAX)]),
        },
    );
    assert!(!preview.validation.is_valid);
    assert!(preview.splits.is_empty());

    let preview = service.preview_splits(
        dec!(0),
        &SplitPolicy::Equal {
            members: vec!["a".to_string()],
        },
    );
    assert_eq!(preview.validation.message.as_deref(), Some("Amount must be greater than 0"));
}

/// Delegates to the in-memory store but refuses split writes of the chosen kind.
struct FailingSplitStorage {
    inner: InMemoryStorage,
    fail_insert: bool,
    fail_replace: bool,
}

#[async_trait]
impl Storage for FailingSplitStorage {
    async fn save_user(&self, user: User) -> Result<(), LedgerError> {
        self.inner.save_user(user).await
    }
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, LedgerError> {
        self.inner.get_user(user_id).await
    }
    async fn save_group(&self, group: Group) -> Result<(), LedgerError> {
        self.inner.save_group(group).await
    }
    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, LedgerError> {
        self.inner.get_group(group_id).await
    }
    async fn remove_group_member(&self, group_id: &str, user_id: &str) -> Result<(), LedgerError> {
        self.inner.remove_group_member(group_id, user_id).await
    }
    async fn insert_expense(&self, expense: Expense) -> Result<(), LedgerError> {
        self.inner.insert_expense(expense).await
    }
    async fn update_expense(&self, expense: Expense) -> Result<(), LedgerError> {
        self.inner.update_expense(expense).await
    }
    async fn insert_splits(&self, splits: Vec<ExpenseSplit>) -> Result<(), LedgerError> {
        if self.fail_insert {
            return Err(LedgerError::StorageError("split table unavailable".to_string()));
        }
        self.inner.insert_splits(splits).await
    }
    async fn replace_splits(
        &self,
        expense_id: &str,
        splits: Vec<ExpenseSplit>,
    ) -> Result<(), LedgerError> {
        if self.fail_replace {
            return Err(LedgerError::StorageError("split table unavailable".to_string()));
        }
        self.inner.replace_splits(expense_id, splits).await
    }
    async fn delete_expense(&self, expense_id: &str) -> Result<(), LedgerError> {
        self.inner.delete_expense(expense_id).await
    }
    async fn get_expense(
        &self,
        expense_id: &str,
    ) -> Result<Option<ExpenseWithSplits>, LedgerError> {
        self.inner.get_expense(expense_id).await
    }
    async fn get_group_expenses(
        &self,
        group_id: &str,
    ) -> Result<Vec<ExpenseWithSplits>, LedgerError> {
        self.inner.get_group_expenses(group_id).await
    }
    async fn insert_payment(&self, payment: Payment) -> Result<(), LedgerError> {
        self.inner.insert_payment(payment).await
    }
    async fn resolve_payment(&self, payment: Payment) -> Result<(), LedgerError> {
        self.inner.resolve_payment(payment).await
    }
    async fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>, LedgerError> {
        self.inner.get_payment(payment_id).await
    }
    async fn find_pending_payment(
        &self,
        group_id: &str,
        debtor_id: &str,
        creditor_id: &str,
    ) -> Result<Option<Payment>, LedgerError> {
        self.inner.find_pending_payment(group_id, debtor_id, creditor_id).await
    }
    async fn get_payments(
        &self,
        group_id: &str,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<Payment>, LedgerError> {
        self.inner.get_payments(group_id, status).await
    }
    async fn has_payment_actor_columns(&self) -> Result<bool, LedgerError> {
        self.inner.has_payment_actor_columns().await
    }
    async fn add_payment_actor_columns(&self) -> Result<(), LedgerError> {
        self.inner.add_payment_actor_columns().await
    }
    async fn save_group_audit(&self, audit: GroupAudit) -> Result<(), LedgerError> {
        self.inner.save_group_audit(audit).await
    }
    async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, LedgerError> {
        self.inner.get_group_audits(group_id).await
    }
}

#[tokio::test]
async fn test_failed_split_insert_removes_expense() {
    let inner = InMemoryStorage::new();
    seed_group(&inner, GROUP, &["a", "b"]).await;
    let service = LedgerService::new(
        FailingSplitStorage {
            inner: inner.clone(),
            fail_insert: true,
            fail_replace: false,
        },
        InMemoryLogging::new(),
        CapabilityDetector::new(true),
    );

    let err = service
        .create_expense(GROUP, equal_draft("a", dec!(40), &["a", "b"]), "a")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::StorageError(ref msg) if msg == "split table unavailable"));

    assert!(inner.get_group_expenses(GROUP).await.unwrap().is_empty());
    assert!(inner.get_group_audits(GROUP).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_split_replace_restores_expense() {
    let inner = InMemoryStorage::new();
    seed_group(&inner, GROUP, &["a", "b"]).await;
    let healthy = LedgerService::new(
        inner.clone(),
        InMemoryLogging::new(),
        CapabilityDetector::new(true),
    );
    let original = healthy
        .create_expense(GROUP, equal_draft("a", dec!(100), &["a", "b"]), "a")
        .await
        .unwrap();

    let service = LedgerService::new(
        FailingSplitStorage {
            inner: inner.clone(),
            fail_insert: false,
            fail_replace: true,
        },
        InMemoryLogging::new(),
        CapabilityDetector::new(true),
    );
    let err = service
        .update_expense(&original.expense.id, equal_draft("b", dec!(10), &["a", "b"]), "a")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::StorageError(ref msg) if msg == "split table unavailable"));

    let stored = inner.get_expense(&original.expense.id).await.unwrap().unwrap();
    assert_eq!(stored.expense, original.expense);
    assert_eq!(stored.split_total(), stored.expense.amount);
    let updates = inner
        .get_group_audits(GROUP)
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.action == EXPENSE_UPDATED)
        .count();
    assert_eq!(updates, 0);
}
