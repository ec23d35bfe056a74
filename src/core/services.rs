use crate::constants::{
    EXPENSE_CREATED, EXPENSE_DELETED, EXPENSE_UPDATED, MAX_CATEGORY_LENGTH, MAX_DESCRIPTION_LENGTH,
    MEMBER_LEFT, PAYMENT_ACCEPTED, PAYMENT_MARKED, PAYMENT_REJECTED,
};
use crate::core::capabilities::CapabilityDetector;
use crate::core::errors::{FieldError, LedgerError};
use crate::core::ledger::{
    SplitPolicy, SplitShare, SplitValidation, aggregate_pairwise, net_balances, select_view,
    validate_splits,
};
use crate::core::models::{
    audit::{AppLog, GroupAudit},
    balance::{BalanceView, NetBalance, PairwiseDebt, PairwiseLedger},
    expense::{Expense, ExpenseSplit, ExpenseWithSplits},
    group::Group,
    payment::{Payment, PaymentStatus},
    user::User,
};
use crate::core::money::{EPSILON, validate_amount};
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use chrono::Utc;
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

/// Calculator output plus the validator's verdict, without touching storage.
#[derive(Serialize, Deserialize, Debug, ToSchema, Clone, PartialEq)]
pub struct SplitPreview {
    pub splits: Vec<SplitShare>,
    pub validation: SplitValidation,
}

/// Fields shared by expense creation and update.
#[derive(Debug, Clone)]
pub struct ExpenseDraft {
    pub payer_id: String,
    pub amount: Decimal,
    pub category: String,
    pub description: Option<String>,
    pub split: SplitPolicy,
}

pub struct LedgerService<L: LoggingService, S: Storage> {
    storage: S,
    logging: L,
    capabilities: CapabilityDetector,
}

impl<L: LoggingService, S: Storage> LedgerService<L, S> {
    pub fn new(storage: S, logging: L, capabilities: CapabilityDetector) -> Self {
        LedgerService {
            storage,
            logging,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> &CapabilityDetector {
        &self.capabilities
    }

    async fn validate_group_membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Group, LedgerError> {
        let group = self
            .storage
            .get_group(group_id)
            .await?
            .ok_or_else(|| LedgerError::GroupNotFound(group_id.to_string()))?;
        if !group.is_member(user_id) {
            return Err(LedgerError::NotGroupMember(user_id.to_string()));
        }
        Ok(group)
    }

    async fn log_and_audit(
        &self,
        group_id: Option<&str>,
        action: &str,
        log_details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), LedgerError> {
        self.logging.log_action(action, log_details.clone(), user_id).await?;
        if let Some(gid) = group_id {
            let details = serde_json::from_value(log_details)
                .map_err(|e| {
                    LedgerError::InternalServerError(format!(
                        "Failed to encode audit details: {}",
                        e
                    ))
                })?;
            self.storage
                .save_group_audit(GroupAudit {
                    id: Uuid::new_v4().to_string(),
                    group_id: gid.to_string(),
                    action: action.to_string(),
                    user_id: user_id.map(String::from),
                    details,
                    timestamp: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }

    fn validate_string_input(
        &self,
        field: &str,
        value: &str,
        max_length: usize,
    ) -> Result<(), LedgerError> {
        if value.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                field.to_string(),
                FieldError::new(
                    field,
                    format!("Invalid {}", field),
                    format!("{} cannot be empty", field),
                ),
            ));
        }
        if value.chars().count() > max_length {
            return Err(LedgerError::InvalidInput(
                field.to_string(),
                FieldError::new(
                    field,
                    format!("{} Too Long", field),
                    format!("{} must be at most {} characters", field, max_length),
                ),
            ));
        }
        Ok(())
    }

    /// Checks the draft against the group and resolves it into final splits.
    fn resolve_draft(
        &self,
        group: &Group,
        draft: &ExpenseDraft,
    ) -> Result<Vec<SplitShare>, LedgerError> {
        if !group.is_member(&draft.payer_id) {
            return Err(LedgerError::NotGroupMember(draft.payer_id.clone()));
        }
        validate_amount("amount", draft.amount)?;
        self.validate_string_input("category", &draft.category, MAX_CATEGORY_LENGTH)?;
        if let Some(description) = &draft.description {
            if description.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(LedgerError::InvalidInput(
                    "description".to_string(),
                    FieldError::new(
                        "description",
                        "description Too Long",
                        format!(
                            "description must be at most {} characters",
                            MAX_DESCRIPTION_LENGTH
                        ),
                    ),
                ));
            }
        }

        let mut seen = HashSet::new();
        for user_id in draft.split.member_ids() {
            if !group.is_member(user_id) {
                return Err(LedgerError::NotGroupMember(user_id.to_string()));
            }
            if !seen.insert(user_id) {
                return Err(LedgerError::InvalidSplit(format!(
                    "User {} appears more than once",
                    user_id
                )));
            }
        }

        let preview = self.preview_splits(draft.amount, &draft.split);
        if !preview.validation.is_valid {
            let message = preview.validation.message.unwrap_or_else(|| "Invalid split".to_string());
            return Err(LedgerError::InvalidSplit(message));
        }
        Ok(preview.splits)
    }

    fn split_rows(expense_id: &str, splits: Vec<SplitShare>) -> Vec<ExpenseSplit> {
        splits
            .into_iter()
            .map(|s| ExpenseSplit {
                expense_id: expense_id.to_string(),
                user_id: s.user_id,
                owed_amount: s.owed_amount,
            })
            .collect()
    }

    pub fn preview_splits(&self, amount: Decimal, split: &SplitPolicy) -> SplitPreview {
        if let Err(e) = validate_amount("amount", amount) {
            let message = match e {
                LedgerError::InvalidInput(_, detail) => detail.description,
                other => other.to_string(),
            };
            return SplitPreview {
                splits: Vec::new(),
                validation: SplitValidation::invalid(message),
            };
        }
        let inputs = split.validate_inputs();
        if !inputs.is_valid {
            return SplitPreview {
                splits: Vec::new(),
                validation: inputs,
            };
        }
        let splits = split.resolve(amount);
        let validation = validate_splits(amount, &splits);
        SplitPreview { splits, validation }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, LedgerError> {
        self.storage.get_user(user_id).await
    }

    pub async fn get_group(&self, group_id: &str) -> Result<Option<Group>, LedgerError> {
        self.storage.get_group(group_id).await
    }

    pub async fn create_expense(
        &self,
        group_id: &str,
        draft: ExpenseDraft,
        created_by: &str,
    ) -> Result<ExpenseWithSplits, LedgerError> {
        let group = self.validate_group_membership(group_id, created_by).await?;
        let splits = self.resolve_draft(&group, &draft)?;

        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            payer_id: draft.payer_id,
            amount: draft.amount,
            category: draft.category,
            description: draft.description,
            created_by: created_by.to_string(),
            timestamp: Utc::now(),
        };
        let rows = Self::split_rows(&expense.id, splits);

        self.storage.insert_expense(expense.clone()).await?;
        if let Err(e) = self.storage.insert_splits(rows.clone()).await {
            warn!("Split insertion failed for expense {}, removing it: {}", expense.id, e);
            if let Err(cleanup) = self.storage.delete_expense(&expense.id).await {
                error!("Compensating delete of expense {} failed: {}", expense.id, cleanup);
            }
            return Err(e);
        }

        self.log_and_audit(
            Some(group_id),
            EXPENSE_CREATED,
            json!({
                "expense_id": expense.id,
                "group_id": group_id,
                "payer_id": expense.payer_id,
                "amount": expense.amount,
                "category": expense.category,
                "split_count": rows.len()
            }),
            Some(created_by),
        )
        .await?;

        Ok(ExpenseWithSplits { expense, splits: rows })
    }

    /// Replaces amount, payer, category, description and the full split set.
    pub async fn update_expense(
        &self,
        expense_id: &str,
        draft: ExpenseDraft,
        updated_by: &str,
    ) -> Result<ExpenseWithSplits, LedgerError> {
        let existing = self
            .storage
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| LedgerError::ExpenseNotFound(expense_id.to_string()))?;
        let group = self
            .validate_group_membership(&existing.expense.group_id, updated_by)
            .await?;
        let splits = self.resolve_draft(&group, &draft)?;
        let previous = existing.expense;
        let previous_amount = previous.amount;

        let expense = Expense {
            payer_id: draft.payer_id,
            amount: draft.amount,
            category: draft.category,
            description: draft.description,
            ..previous.clone()
        };
        let rows = Self::split_rows(&expense.id, splits);

        self.storage.update_expense(expense.clone()).await?;
        if let Err(e) = self.storage.replace_splits(&expense.id, rows.clone()).await {
            warn!("Split replacement failed for expense {}, restoring it: {}", expense.id, e);
            if let Err(cleanup) = self.storage.update_expense(previous).await {
                error!("Compensating restore of expense {} failed: {}", expense.id, cleanup);
            }
            return Err(e);
        }

        self.log_and_audit(
            Some(&expense.group_id),
            EXPENSE_UPDATED,
            json!({
                "expense_id": expense.id,
                "previous_amount": previous_amount,
                "amount": expense.amount,
                "payer_id": expense.payer_id,
                "split_count": rows.len()
            }),
            Some(updated_by),
        )
        .await?;

        Ok(ExpenseWithSplits { expense, splits: rows })
    }

    pub async fn delete_expense(
        &self,
        expense_id: &str,
        deleted_by: &str,
    ) -> Result<(), LedgerError> {
        let existing = self
            .storage
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| LedgerError::ExpenseNotFound(expense_id.to_string()))?;
        let group_id = existing.expense.group_id.clone();
        self.validate_group_membership(&group_id, deleted_by).await?;

        self.storage.delete_expense(expense_id).await?;

        self.log_and_audit(
            Some(&group_id),
            EXPENSE_DELETED,
            json!({
                "expense_id": expense_id,
                "amount": existing.expense.amount,
                "payer_id": existing.expense.payer_id
            }),
            Some(deleted_by),
        )
        .await?;
        Ok(())
    }

    pub async fn get_group_expenses(
        &self,
        group_id: &str,
        queried_by: &str,
    ) -> Result<Vec<ExpenseWithSplits>, LedgerError> {
        self.validate_group_membership(group_id, queried_by).await?;
        self.storage.get_group_expenses(group_id).await
    }

    /// Records a pending payment. Only the debtor marks their own debt as
    /// paid, and only one pending payment may exist per direction.
    pub async fn mark_payment_paid(
        &self,
        group_id: &str,
        debtor_id: &str,
        creditor_id: &str,
        amount: Decimal,
        marked_by: &str,
    ) -> Result<Payment, LedgerError> {
        let group = self.validate_group_membership(group_id, marked_by).await?;
        if marked_by != debtor_id {
            return Err(LedgerError::UnauthorizedPaymentMark(marked_by.to_string()));
        }
        if debtor_id == creditor_id {
            return Err(LedgerError::SelfPayment);
        }
        if !group.is_member(creditor_id) {
            return Err(LedgerError::NotGroupMember(creditor_id.to_string()));
        }
        validate_amount("amount", amount)?;

        if let Some(existing) = self
            .storage
            .find_pending_payment(group_id, debtor_id, creditor_id)
            .await?
        {
            debug!(
                "Pending payment {} already open for {} -> {}",
                existing.id, debtor_id, creditor_id
            );
            return Err(LedgerError::DuplicatePendingPayment {
                group_id: group_id.to_string(),
                debtor: debtor_id.to_string(),
                creditor: creditor_id.to_string(),
            });
        }

        let track_actors = self.capabilities.payment_actor_columns(&self.storage).await?;
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            debtor_id: debtor_id.to_string(),
            creditor_id: creditor_id.to_string(),
            amount,
            status: PaymentStatus::Pending,
            marked_by: track_actors.then(|| marked_by.to_string()),
            accepted_by: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        self.storage.insert_payment(payment.clone()).await?;

        self.log_and_audit(
            Some(group_id),
            PAYMENT_MARKED,
            json!({
                "payment_id": payment.id,
                "debtor_id": debtor_id,
                "creditor_id": creditor_id,
                "amount": amount
            }),
            Some(marked_by),
        )
        .await?;

        Ok(payment)
    }

    pub async fn accept_payment(
        &self,
        payment_id: &str,
        accepted_by: &str,
    ) -> Result<Payment, LedgerError> {
        self.resolve_payment(payment_id, PaymentStatus::Accepted, accepted_by).await
    }

    pub async fn reject_payment(
        &self,
        payment_id: &str,
        rejected_by: &str,
    ) -> Result<Payment, LedgerError> {
        self.resolve_payment(payment_id, PaymentStatus::Rejected, rejected_by).await
    }

    async fn resolve_payment(
        &self,
        payment_id: &str,
        next: PaymentStatus,
        resolved_by: &str,
    ) -> Result<Payment, LedgerError> {
        let payment = self
            .storage
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| LedgerError::PaymentNotFound(payment_id.to_string()))?;
        self.validate_group_membership(&payment.group_id, resolved_by).await?;
        if payment.status.is_terminal() {
            return Err(LedgerError::PaymentAlreadyResolved(payment_id.to_string()));
        }
        if payment.creditor_id != resolved_by {
            return Err(LedgerError::UnauthorizedPaymentResolution(resolved_by.to_string()));
        }

        let track_actors = self.capabilities.payment_actor_columns(&self.storage).await?;
        let actor =
            (track_actors && next == PaymentStatus::Accepted).then(|| resolved_by.to_string());
        let resolved = payment.resolve(next, actor, Utc::now())?;
        self.storage.resolve_payment(resolved.clone()).await?;

        let action = match next {
            PaymentStatus::Accepted => PAYMENT_ACCEPTED,
            _ => PAYMENT_REJECTED,
        };
        info!("Payment {} {} by {}", payment_id, resolved.status, resolved_by);
        self.log_and_audit(
            Some(&resolved.group_id),
            action,
            json!({
                "payment_id": payment_id,
                "debtor_id": resolved.debtor_id,
                "creditor_id": resolved.creditor_id,
                "amount": resolved.amount,
                "status": resolved.status
            }),
            Some(resolved_by),
        )
        .await?;

        Ok(resolved)
    }

    pub async fn list_payments(
        &self,
        group_id: &str,
        status: Option<PaymentStatus>,
        queried_by: &str,
    ) -> Result<Vec<Payment>, LedgerError> {
        self.validate_group_membership(group_id, queried_by).await?;
        self.storage.get_payments(group_id, status).await
    }

    async fn load_history(
        &self,
        group_id: &str,
    ) -> Result<(Vec<ExpenseWithSplits>, Vec<Payment>), LedgerError> {
        let expenses = self.storage.get_group_expenses(group_id).await?;
        let payments = self.storage.get_payments(group_id, Some(PaymentStatus::Accepted)).await?;
        Ok((expenses, payments))
    }


    pub async fn get_pairwise_balances(
        &self,
        group_id: &str,
        queried_by: &str,
    ) -> Result<PairwiseLedger, LedgerError> {
        self.validate_group_membership(group_id, queried_by).await?;
        let (expenses, payments) = self.load_history(group_id).await?;
        let ledger = aggregate_pairwise(&expenses, &payments);
        debug!("{} read pairwise balances of group {}", queried_by, group_id);
        Ok(ledger)
    }

    pub async fn get_net_balances(
        &self,
        group_id: &str,
        queried_by: &str,
    ) -> Result<Vec<NetBalance>, LedgerError> {
        self.validate_group_membership(group_id, queried_by).await?;
        let (expenses, payments) = self.load_history(group_id).await?;
        let balances = net_balances(&expenses, &payments);
        debug!("{} read net balances of group {}", queried_by, group_id);
        Ok(balances)
    }

    /// Simplified plan until the first accepted payment, pairwise afterwards.
    pub async fn get_simplified_balances(
        &self,
        group_id: &str,
        queried_by: &str,
    ) -> Result<BalanceView, LedgerError> {
        self.validate_group_membership(group_id, queried_by).await?;
        let (expenses, payments) = self.load_history(group_id).await?;
        let view = select_view(
            &net_balances(&expenses, &payments),
            aggregate_pairwise(&expenses, &payments),
        );
        debug!(
            "{} read {} balances of group {}",
            queried_by,
            if view.is_simplified() { "simplified" } else { "pairwise" },
            group_id
        );
        Ok(view)
    }

    pub async fn get_user_pairwise_balances(
        &self,
        group_id: &str,
        user_id: &str,
        queried_by: &str,
    ) -> Result<Vec<PairwiseDebt>, LedgerError> {
        self.validate_group_membership(group_id, queried_by).await?;
        let (expenses, payments) = self.load_history(group_id).await?;
        let ledger = aggregate_pairwise(&expenses, &payments);
        Ok(ledger.involving(user_id).cloned().collect())
    }

    /// A member may leave once none of their pairwise debts is open.
    pub async fn can_leave_group(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<bool, LedgerError> {
        self.validate_group_membership(group_id, user_id).await?;
        let (expenses, payments) = self.load_history(group_id).await?;
        let ledger = aggregate_pairwise(&expenses, &payments);
        let open = ledger
            .involving(user_id)
            .filter(|d| !d.settled && d.amount > EPSILON)
            .count();
        debug!("User {} has {} open debts in group {}", user_id, open, group_id);
        Ok(open == 0)
    }

    pub async fn leave_group(&self, group_id: &str, user_id: &str) -> Result<(), LedgerError> {
        if !self.can_leave_group(group_id, user_id).await? {
            return Err(LedgerError::UnsettledBalances(user_id.to_string()));
        }
        self.storage.remove_group_member(group_id, user_id).await?;
        self.log_and_audit(
            Some(group_id),
            MEMBER_LEFT,
            json!({ "group_id": group_id, "user_id": user_id }),
            Some(user_id),
        )
        .await?;
        Ok(())
    }

    pub async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, LedgerError> {
        self.storage.get_group_audits(group_id).await
    }

    pub async fn get_app_logs(&self) -> Result<Vec<AppLog>, LedgerError> {
        self.logging.get_logs().await
    }
}
