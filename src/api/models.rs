use axum::{Json, http::StatusCode, response::IntoResponse};
use log::error;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::core::errors::LedgerError;
use crate::core::ledger::SplitPolicy;
use crate::core::models::payment::PaymentStatus;
use crate::core::services::ExpenseDraft;

// Request structs for JSON payloads
#[derive(Deserialize, ToSchema)]
pub struct PreviewSplitsRequest {
    pub amount: Decimal,
    pub split: SplitPolicy,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateExpenseRequest {
    pub group_id: String,
    pub payer_id: String,
    pub amount: Decimal,
    pub category: String,
    pub description: Option<String>,
    pub split: SplitPolicy,
    pub created_by_id: String,
}

impl CreateExpenseRequest {
    pub fn into_draft(self) -> (String, ExpenseDraft, String) {
        let draft = ExpenseDraft {
            payer_id: self.payer_id,
            amount: self.amount,
            category: self.category,
            description: self.description,
            split: self.split,
        };
        (self.group_id, draft, self.created_by_id)
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateExpenseRequest {
    pub payer_id: String,
    pub amount: Decimal,
    pub category: String,
    pub description: Option<String>,
    pub split: SplitPolicy,
    pub updated_by_id: String,
}

impl UpdateExpenseRequest {
    pub fn into_draft(self) -> (ExpenseDraft, String) {
        let draft = ExpenseDraft {
            payer_id: self.payer_id,
            amount: self.amount,
            category: self.category,
            description: self.description,
            split: self.split,
        };
        (draft, self.updated_by_id)
    }
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteExpenseRequest {
    pub deleted_by_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct MarkPaymentRequest {
    pub group_id: String,
    pub debtor_id: String,
    pub creditor_id: String,
    pub amount: Decimal,
    pub marked_by_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResolvePaymentRequest {
    pub resolved_by_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LeaveGroupRequest {
    pub user_id: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueriedByParams {
    pub queried_by_id: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentListParams {
    pub queried_by_id: String,
    pub status: Option<PaymentStatus>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PairwiseParams {
    pub queried_by_id: String,
    /// Only debts where this member is debtor or creditor.
    pub user_id: Option<String>,
}

// Balance responses carry display names next to the ids.
#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct NamedPairwiseDebt {
    pub from: String,
    pub from_name: String,
    pub to: String,
    pub to_name: String,
    pub amount: Decimal,
    pub original_amount: Decimal,
    pub paid_amount: Decimal,
    pub settled: bool,
}

#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct PairwiseBalancesResponse {
    pub debts: Vec<NamedPairwiseDebt>,
    pub accepted_payments: usize,
}

#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct NamedNetBalance {
    pub user_id: String,
    pub name: String,
    pub net_balance: Decimal,
}

#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct NamedSimplifiedDebt {
    pub from: String,
    pub from_name: String,
    pub to: String,
    pub to_name: String,
    pub amount: Decimal,
}

#[derive(Serialize, ToSchema, Debug, PartialEq)]
#[serde(tag = "mode", content = "debts", rename_all = "snake_case")]
pub enum BalanceViewResponse {
    Simplified(Vec<NamedSimplifiedDebt>),
    Pairwise(Vec<NamedPairwiseDebt>),
}

// Error response struct
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// Newtype wrapper for LedgerError to implement IntoResponse
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

pub fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::UserNotFound(_)
        | LedgerError::GroupNotFound(_)
        | LedgerError::ExpenseNotFound(_)
        | LedgerError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::NotGroupMember(_)
        | LedgerError::UnauthorizedPaymentMark(_)
        | LedgerError::UnauthorizedPaymentResolution(_) => StatusCode::FORBIDDEN,
        LedgerError::InvalidSplit(_)
        | LedgerError::InvalidInput(_, _)
        | LedgerError::SelfPayment => StatusCode::BAD_REQUEST,
        LedgerError::DuplicatePendingPayment { .. }
        | LedgerError::PaymentAlreadyResolved(_)
        | LedgerError::UnsettledBalances(_) => StatusCode::CONFLICT,
        LedgerError::StorageError(_)
        | LedgerError::LoggingError(_)
        | LedgerError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = status_for(&self.0);
        let error_message = match &self.0 {
            LedgerError::InvalidInput(field, detail) => {
                format!("Invalid input for {}: {}", field, detail.description)
            }
            other => other.to_string(),
        };
        if status.is_server_error() {
            error!("Request failed: {}", error_message);
        }
        (status, Json(ErrorResponse { error: error_message })).into_response()
    }
}
