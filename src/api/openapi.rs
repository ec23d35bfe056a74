use utoipa::OpenApi;

use crate::{
    api::models::{
        BalanceViewResponse, CreateExpenseRequest, DeleteExpenseRequest, ErrorResponse,
        LeaveGroupRequest, MarkPaymentRequest, NamedNetBalance, NamedPairwiseDebt,
        NamedSimplifiedDebt, PairwiseBalancesResponse, PreviewSplitsRequest, ResolvePaymentRequest,
        UpdateExpenseRequest,
    },
    core::{
        ledger::{MemberValue, SplitPolicy, SplitShare, SplitValidation},
        models::{
            audit::{AppLog, GroupAudit},
            expense::{Expense, ExpenseSplit, ExpenseWithSplits},
            payment::{Payment, PaymentStatus},
        },
        services::SplitPreview,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::preview_splits,
        super::handlers::create_expense,
        super::handlers::update_expense,
        super::handlers::delete_expense,
        super::handlers::get_group_expenses,
        super::handlers::mark_payment_paid,
        super::handlers::accept_payment,
        super::handlers::reject_payment,
        super::handlers::list_payments,
        super::handlers::get_pairwise_balances,
        super::handlers::get_net_balances,
        super::handlers::get_simplified_balances,
        super::handlers::leave_group,
        super::handlers::get_app_logs,
        super::handlers::get_group_audits
    ),
    components(schemas(
        PreviewSplitsRequest,
        CreateExpenseRequest,
        UpdateExpenseRequest,
        DeleteExpenseRequest,
        MarkPaymentRequest,
        ResolvePaymentRequest,
        LeaveGroupRequest,
        ErrorResponse,
        SplitPolicy,
        MemberValue,
        SplitShare,
        SplitValidation,
        SplitPreview,
        Expense,
        ExpenseSplit,
        ExpenseWithSplits,
        Payment,
        PaymentStatus,
        NamedPairwiseDebt,
        PairwiseBalancesResponse,
        NamedNetBalance,
        NamedSimplifiedDebt,
        BalanceViewResponse,
        AppLog,
        GroupAudit
    )),
    info(
        title = "Split Ledger API",
        description = "Group expense splitting, pairwise balances and settlement",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
