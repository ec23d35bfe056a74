//! Chooses what a group is shown as "who owes whom".
//!
//! Before any payment is accepted the simplified plan is shown. Once any
//! payment in the group has been accepted the raw pairwise edges are shown
//! instead, so a settlement is never routed through someone who did not
//! receive the money.

use crate::core::ledger::simplify::simplify_debts;
use crate::core::models::balance::{BalanceView, NetBalance, PairwiseLedger};
use log::debug;

pub fn select_view(net_balances: &[NetBalance], pairwise: PairwiseLedger) -> BalanceView {
    if pairwise.has_accepted_payments() {
        debug!(
            "{} accepted payments present, exposing {} pairwise debts",
            pairwise.accepted_payments,
            pairwise.debts.len()
        );
        BalanceView::Pairwise(pairwise.debts)
    } else {
        BalanceView::Simplified(simplify_debts(net_balances))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::{net::net_balances, pairwise::aggregate_pairwise};
    use crate::core::models::expense::{Expense, ExpenseSplit, ExpenseWithSplits};
    use crate::core::models::payment::{Payment, PaymentStatus};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn expense(id: &str, payer: &str, splits: &[(&str, Decimal)]) -> ExpenseWithSplits {
        ExpenseWithSplits {
            expense: Expense {
                id: id.to_string(),
                group_id: "g".to_string(),
                payer_id: payer.to_string(),
                amount: splits.iter().map(|(_, v)| *v).sum(),
                category: "trip".to_string(),
                description: None,
                created_by: payer.to_string(),
                timestamp: Utc::now(),
            },
            splits: splits
                .iter()
                .map(|(u, v)| ExpenseSplit {
                    expense_id: id.to_string(),
                    user_id: u.to_string(),
                    owed_amount: *v,
                })
                .collect(),
        }
    }

    fn payment(status: PaymentStatus) -> Payment {
        Payment {
            id: "p1".to_string(),
            group_id: "g".to_string(),
            debtor_id: "C".to_string(),
            creditor_id: "B".to_string(),
            amount: dec!(10),
            status,
            marked_by: None,
            accepted_by: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    // A chain A <- B <- C that simplification collapses into C -> A.
    fn chain() -> Vec<ExpenseWithSplits> {
        vec![
            expense("e1", "A", &[("B", dec!(30))]),
            expense("e2", "B", &[("C", dec!(30))]),
        ]
    }

    #[test]
    fn without_accepted_payments_the_plan_is_simplified() {
        let expenses = chain();
        let payments = vec![payment(PaymentStatus::Pending), payment(PaymentStatus::Rejected)];
        let view = select_view(
            &net_balances(&expenses, &payments),
            aggregate_pairwise(&expenses, &payments),
        );
        match view {
            BalanceView::Simplified(plan) => {
                assert_eq!(plan.len(), 1);
                assert_eq!(plan[0].from, "C");
                assert_eq!(plan[0].to, "A");
                assert_eq!(plan[0].amount, dec!(30));
            }
            other => panic!("expected simplified view, got {:?}", other),
        }
    }

    #[test]
    fn any_accepted_payment_exposes_raw_pairwise_edges() {
        let expenses = chain();
        let payments = vec![payment(PaymentStatus::Accepted)];
        let pairwise = aggregate_pairwise(&expenses, &payments);
        let view = select_view(&net_balances(&expenses, &payments), pairwise.clone());
        assert_eq!(view, BalanceView::Pairwise(pairwise.debts));
        assert!(!view.is_simplified());
    }
}
