use crate::{
    api::models::*,
    core::{
        errors::LedgerError,
        models::{
            audit::{AppLog, GroupAudit},
            balance::{BalanceView, NetBalance, PairwiseDebt, SimplifiedDebt},
            expense::ExpenseWithSplits,
            payment::Payment,
        },
        services::{LedgerService, SplitPreview},
    },
    infrastructure::{logging::in_memory::InMemoryLogging, storage::in_memory::InMemoryStorage},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub type SharedService = Arc<LedgerService<InMemoryLogging, InMemoryStorage>>;

// Define API routes
pub fn api_routes(service: SharedService) -> Router {
    Router::new()
        .route("/splits/preview", post(preview_splits))
        .route("/expenses", post(create_expense))
        .route("/expenses/{expense_id}", put(update_expense).delete(delete_expense))
        .route("/groups/{group_id}/expenses", get(get_group_expenses))
        .route("/payments", post(mark_payment_paid))
        .route("/payments/{payment_id}/accept", post(accept_payment))
        .route("/payments/{payment_id}/reject", post(reject_payment))
        .route("/groups/{group_id}/payments", get(list_payments))
        .route("/groups/{group_id}/balances/pairwise", get(get_pairwise_balances))
        .route("/groups/{group_id}/balances/net", get(get_net_balances))
        .route("/groups/{group_id}/balances/simplified", get(get_simplified_balances))
        .route("/groups/{group_id}/leave", post(leave_group))
        .route("/logs", get(get_app_logs))
        .route("/groups/{group_id}/audits", get(get_group_audits))
        .with_state(service)
}

/// Display names for `ids`, falling back to the id for users missing from
/// the directory.
async fn display_names<'a>(
    service: &LedgerService<InMemoryLogging, InMemoryStorage>,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<HashMap<String, String>, LedgerError> {
    let unique: BTreeSet<&str> = ids.into_iter().collect();
    let lookups = unique.into_iter().map(|id| async move {
        let name = service
            .get_user(id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| id.to_string());
        Ok::<_, LedgerError>((id.to_string(), name))
    });
    Ok(futures::future::try_join_all(lookups).await?.into_iter().collect())
}

fn debtor_creditor_ids(debts: &[PairwiseDebt]) -> impl Iterator<Item = &str> {
    debts.iter().flat_map(|d| [d.from.as_str(), d.to.as_str()])
}

fn name_of(names: &HashMap<String, String>, id: &str) -> String {
    names.get(id).cloned().unwrap_or_else(|| id.to_string())
}

pub fn name_pairwise(
    debts: Vec<PairwiseDebt>,
    names: &HashMap<String, String>,
) -> Vec<NamedPairwiseDebt> {
    debts
        .into_iter()
        .map(|d| NamedPairwiseDebt {
            from_name: name_of(names, &d.from),
            to_name: name_of(names, &d.to),
            from: d.from,
            to: d.to,
            amount: d.amount,
            original_amount: d.original_amount,
            paid_amount: d.paid_amount,
            settled: d.settled,
        })
        .collect()
}

pub fn name_net(
    balances: Vec<NetBalance>,
    names: &HashMap<String, String>,
) -> Vec<NamedNetBalance> {
    balances
        .into_iter()
        .map(|b| NamedNetBalance {
            name: name_of(names, &b.user_id),
            user_id: b.user_id,
            net_balance: b.net_balance,
        })
        .collect()
}

pub fn name_simplified(
    debts: Vec<SimplifiedDebt>,
    names: &HashMap<String, String>,
) -> Vec<NamedSimplifiedDebt> {
    debts
        .into_iter()
        .map(|d| NamedSimplifiedDebt {
            from_name: name_of(names, &d.from),
            to_name: name_of(names, &d.to),
            from: d.from,
            to: d.to,
            amount: d.amount,
        })
        .collect()
}

#[utoipa::path(
    post,
    path = "/api/splits/preview",
    request_body = PreviewSplitsRequest,
    responses(
        (status = 200, description = "Calculated splits and validation", body = SplitPreview),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub async fn preview_splits(
    State(service): State<SharedService>,
    Json(req): Json<PreviewSplitsRequest>,
) -> Result<Json<SplitPreview>, ApiError> {
    Ok(Json(service.preview_splits(req.amount, &req.split)))
}

#[utoipa::path(
    post,
    path = "/api/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense created", body = ExpenseWithSplits),
        (status = 400, description = "Invalid amount or split", body = ErrorResponse),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_expense(
    State(service): State<SharedService>,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseWithSplits>), ApiError> {
    let (group_id, draft, created_by) = req.into_draft();
    let expense = service.create_expense(&group_id, draft, &created_by).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[utoipa::path(
    put,
    path = "/api/expenses/{expense_id}",
    request_body = UpdateExpenseRequest,
    params(
        ("expense_id" = String, Path, description = "ID of the expense to replace")
    ),
    responses(
        (status = 200, description = "Expense and splits replaced", body = ExpenseWithSplits),
        (status = 400, description = "Invalid amount or split", body = ErrorResponse),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn update_expense(
    State(service): State<SharedService>,
    Path(expense_id): Path<String>,
    Json(req): Json<UpdateExpenseRequest>,
) -> Result<Json<ExpenseWithSplits>, ApiError> {
    let (draft, updated_by) = req.into_draft();
    let expense = service.update_expense(&expense_id, draft, &updated_by).await?;
    Ok(Json(expense))
}

#[utoipa::path(
    delete,
    path = "/api/expenses/{expense_id}",
    request_body = DeleteExpenseRequest,
    params(
        ("expense_id" = String, Path, description = "ID of the expense to delete")
    ),
    responses(
        (status = 200, description = "Expense and its splits deleted"),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_expense(
    State(service): State<SharedService>,
    Path(expense_id): Path<String>,
    Json(req): Json<DeleteExpenseRequest>,
) -> Result<StatusCode, ApiError> {
    service.delete_expense(&expense_id, &req.deleted_by_id).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/expenses",
    params(
        ("group_id" = String, Path, description = "ID of the group"),
        QueriedByParams
    ),
    responses(
        (status = 200, description = "Expenses, oldest first", body = [ExpenseWithSplits]),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    )
)]
pub async fn get_group_expenses(
    State(service): State<SharedService>,
    Path(group_id): Path<String>,
    Query(params): Query<QueriedByParams>,
) -> Result<Json<Vec<ExpenseWithSplits>>, ApiError> {
    let expenses = service.get_group_expenses(&group_id, &params.queried_by_id).await?;
    Ok(Json(expenses))
}

#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = MarkPaymentRequest,
    responses(
        (status = 201, description = "Pending payment recorded", body = Payment),
        (status = 400, description = "Invalid amount or self payment", body = ErrorResponse),
        (status = 403, description = "Only the debtor may mark a payment", body = ErrorResponse),
        (status = 409, description = "A pending payment already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn mark_payment_paid(
    State(service): State<SharedService>,
    Json(req): Json<MarkPaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let payment = service
        .mark_payment_paid(
            &req.group_id,
            &req.debtor_id,
            &req.creditor_id,
            req.amount,
            &req.marked_by_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    post,
    path = "/api/payments/{payment_id}/accept",
    request_body = ResolvePaymentRequest,
    params(
        ("payment_id" = String, Path, description = "ID of the pending payment")
    ),
    responses(
        (status = 200, description = "Payment accepted", body = Payment),
        (status = 403, description = "Only the creditor may accept", body = ErrorResponse),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Payment already resolved", body = ErrorResponse)
    )
)]
pub async fn accept_payment(
    State(service): State<SharedService>,
    Path(payment_id): Path<String>,
    Json(req): Json<ResolvePaymentRequest>,
) -> Result<Json<Payment>, ApiError> {
    let payment = service.accept_payment(&payment_id, &req.resolved_by_id).await?;
    Ok(Json(payment))
}

#[utoipa::path(
    post,
    path = "/api/payments/{payment_id}/reject",
    request_body = ResolvePaymentRequest,
    params(
        ("payment_id" = String, Path, description = "ID of the pending payment")
    ),
    responses(
        (status = 200, description = "Payment rejected", body = Payment),
        (status = 403, description = "Only the creditor may reject", body = ErrorResponse),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Payment already resolved", body = ErrorResponse)
    )
)]
pub async fn reject_payment(
    State(service): State<SharedService>,
    Path(payment_id): Path<String>,
    Json(req): Json<ResolvePaymentRequest>,
) -> Result<Json<Payment>, ApiError> {
    let payment = service.reject_payment(&payment_id, &req.resolved_by_id).await?;
    Ok(Json(payment))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/payments",
    params(
        ("group_id" = String, Path, description = "ID of the group"),
        PaymentListParams
    ),
    responses(
        (status = 200, description = "Payments, oldest first", body = [Payment]),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    )
)]
pub async fn list_payments(
    State(service): State<SharedService>,
    Path(group_id): Path<String>,
    Query(params): Query<PaymentListParams>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let payments = service
        .list_payments(&group_id, params.status, &params.queried_by_id)
        .await?;
    Ok(Json(payments))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/balances/pairwise",
    params(
        ("group_id" = String, Path, description = "ID of the group"),
        PairwiseParams
    ),
    responses(
        (status = 200, description = "Netted pairwise debts", body = PairwiseBalancesResponse),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    )
)]
pub async fn get_pairwise_balances(
    State(service): State<SharedService>,
    Path(group_id): Path<String>,
    Query(params): Query<PairwiseParams>,
) -> Result<Json<PairwiseBalancesResponse>, ApiError> {
    let ledger = service.get_pairwise_balances(&group_id, &params.queried_by_id).await?;
    let accepted_payments = ledger.accepted_payments;
    let debts: Vec<PairwiseDebt> = match params.user_id {
        Some(user_id) => ledger.involving(&user_id).cloned().collect(),
        None => ledger.debts,
    };
    let names = display_names(&service, debtor_creditor_ids(&debts)).await?;
    Ok(Json(PairwiseBalancesResponse {
        debts: name_pairwise(debts, &names),
        accepted_payments,
    }))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/balances/net",
    params(
        ("group_id" = String, Path, description = "ID of the group"),
        QueriedByParams
    ),
    responses(
        (status = 200, description = "Net balances by user id", body = [NamedNetBalance]),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    )
)]
pub async fn get_net_balances(
    State(service): State<SharedService>,
    Path(group_id): Path<String>,
    Query(params): Query<QueriedByParams>,
) -> Result<Json<Vec<NamedNetBalance>>, ApiError> {
    let balances = service.get_net_balances(&group_id, &params.queried_by_id).await?;
    let names = display_names(&service, balances.iter().map(|b| b.user_id.as_str())).await?;
    Ok(Json(name_net(balances, &names)))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/balances/simplified",
    params(
        ("group_id" = String, Path, description = "ID of the group"),
        QueriedByParams
    ),
    responses(
        (
            status = 200,
            description = "Settlement plan, or pairwise debts once settlement has started",
            body = BalanceViewResponse
        ),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    )
)]
pub async fn get_simplified_balances(
    State(service): State<SharedService>,
    Path(group_id): Path<String>,
    Query(params): Query<QueriedByParams>,
) -> Result<Json<BalanceViewResponse>, ApiError> {
    let view = service.get_simplified_balances(&group_id, &params.queried_by_id).await?;
    let response = match view {
        BalanceView::Simplified(debts) => {
            let ids = debts.iter().flat_map(|d| [d.from.as_str(), d.to.as_str()]);
            let names = display_names(&service, ids).await?;
            BalanceViewResponse::Simplified(name_simplified(debts, &names))
        }
        BalanceView::Pairwise(debts) => {
            let names = display_names(&service, debtor_creditor_ids(&debts)).await?;
            BalanceViewResponse::Pairwise(name_pairwise(debts, &names))
        }
    };
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/groups/{group_id}/leave",
    request_body = LeaveGroupRequest,
    params(
        ("group_id" = String, Path, description = "ID of the group to leave")
    ),
    responses(
        (status = 200, description = "Member removed"),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 409, description = "Member still has unsettled debts", body = ErrorResponse)
    )
)]
pub async fn leave_group(
    State(service): State<SharedService>,
    Path(group_id): Path<String>,
    Json(req): Json<LeaveGroupRequest>,
) -> Result<StatusCode, ApiError> {
    service.leave_group(&group_id, &req.user_id).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/logs",
    responses(
        (status = 200, description = "Application logs", body = [AppLog]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_app_logs(
    State(service): State<SharedService>,
) -> Result<Json<Vec<AppLog>>, ApiError> {
    let logs = service.get_app_logs().await?;
    Ok(Json(logs))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/audits",
    params(
        ("group_id" = String, Path, description = "ID of the group")
    ),
    responses(
        (status = 200, description = "Group audit trail", body = [GroupAudit]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_group_audits(
    State(service): State<SharedService>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<GroupAudit>>, ApiError> {
    let audits = service.get_group_audits(&group_id).await?;
    Ok(Json(audits))
}
