use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

impl FieldError {
    pub fn new(field: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Error, Debug, Serialize)]
pub enum LedgerError {
    #[error("User {0} not found")]
    UserNotFound(String),
    #[error("Group {0} not found")]
    GroupNotFound(String),
    #[error("User {0} is not a group member")]
    NotGroupMember(String),
    #[error("Expense {0} not found")]
    ExpenseNotFound(String),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),
    #[error("Payment {0} not found")]
    PaymentNotFound(String),
    #[error("A pending payment from {debtor} to {creditor} already exists in group {group_id}")]
    DuplicatePendingPayment {
        group_id: String,
        debtor: String,
        creditor: String,
    },
    #[error("Payment {0} has already been resolved")]
    PaymentAlreadyResolved(String),
    #[error("Only the debtor can mark a payment as paid, not user {0}")]
    UnauthorizedPaymentMark(String),
    #[error("User {0} not authorized to resolve this payment")]
    UnauthorizedPaymentResolution(String),
    #[error("Cannot record a payment to self")]
    SelfPayment,
    #[error("User {0} has unsettled balances in the group")]
    UnsettledBalances(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Logging error: {0}")]
    LoggingError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}
