//! Per-member net positions across the whole group.

use crate::core::models::balance::NetBalance;
use crate::core::models::expense::ExpenseWithSplits;
use crate::core::models::payment::Payment;
use crate::core::money::{is_zero, round_money};
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Every member touched by the history, including settled ones. The values
/// always sum to exactly zero.
pub fn net_positions(
    expenses: &[ExpenseWithSplits],
    payments: &[Payment],
) -> BTreeMap<String, Decimal> {
    let mut positions: BTreeMap<String, Decimal> = BTreeMap::new();

    for record in expenses {
        let payer = &record.expense.payer_id;
        let mut credited = Decimal::ZERO;
        for split in record.splits.iter().filter(|s| &s.user_id != payer) {
            credited += split.owed_amount;
            *positions.entry(split.user_id.clone()).or_insert(Decimal::ZERO) -= split.owed_amount;
        }
        *positions.entry(payer.clone()).or_insert(Decimal::ZERO) += credited;
    }

    for payment in payments.iter().filter(|p| p.is_accepted()) {
        *positions.entry(payment.debtor_id.clone()).or_insert(Decimal::ZERO) += payment.amount;
        *positions.entry(payment.creditor_id.clone()).or_insert(Decimal::ZERO) -= payment.amount;
    }

    positions
}

/// Members whose position is more than a cent away from zero, ordered by
/// user id.
pub fn net_balances(expenses: &[ExpenseWithSplits], payments: &[Payment]) -> Vec<NetBalance> {
    let balances: Vec<NetBalance> = net_positions(expenses, payments)
        .into_iter()
        .filter(|(_, balance)| !is_zero(*balance))
        .map(|(user_id, balance)| NetBalance {
            user_id,
            net_balance: round_money(balance),
        })
        .collect();
    debug!("Computed {} non-zero net balances", balances.len());
    balances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::splits::equal_split;
    use crate::core::models::expense::{Expense, ExpenseSplit};
    use crate::core::models::payment::PaymentStatus;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn expense(payer: &str, splits: &[(&str, Decimal)]) -> ExpenseWithSplits {
        ExpenseWithSplits {
            expense: Expense {
                id: "e".to_string(),
                group_id: "g".to_string(),
                payer_id: payer.to_string(),
                amount: splits.iter().map(|(_, v)| *v).sum(),
                category: "misc".to_string(),
                description: None,
                created_by: payer.to_string(),
                timestamp: Utc::now(),
            },
            splits: splits
                .iter()
                .map(|(u, v)| ExpenseSplit {
                    expense_id: "e".to_string(),
                    user_id: u.to_string(),
                    owed_amount: *v,
                })
                .collect(),
        }
    }

    fn accepted(debtor: &str, creditor: &str, amount: Decimal) -> Payment {
        Payment {
            id: "p".to_string(),
            group_id: "g".to_string(),
            debtor_id: debtor.to_string(),
            creditor_id: creditor.to_string(),
            amount,
            status: PaymentStatus::Accepted,
            marked_by: None,
            accepted_by: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    fn balance_of(balances: &[NetBalance], user: &str) -> Option<Decimal> {
        balances.iter().find(|b| b.user_id == user).map(|b| b.net_balance)
    }

    #[test]
    fn three_way_equal_split() {
        let expenses = vec![expense("A", &[("A", dec!(100)), ("B", dec!(100)), ("C", dec!(100))])];
        let balances = net_balances(&expenses, &[]);
        assert_eq!(balance_of(&balances, "A"), Some(dec!(200)));
        assert_eq!(balance_of(&balances, "B"), Some(dec!(-100)));
        assert_eq!(balance_of(&balances, "C"), Some(dec!(-100)));
    }

    #[test]
    fn own_share_is_not_credited_to_payer() {
        let positions = net_positions(&[expense("A", &[("A", dec!(40))])], &[]);
        assert_eq!(positions.get("A"), Some(&Decimal::ZERO));
    }

    #[test]
    fn accepted_payments_move_both_parties() {
        let expenses = vec![expense("A", &[("B", dec!(60))])];
        let balances = net_balances(&expenses, &[accepted("B", "A", dec!(25))]);
        assert_eq!(balance_of(&balances, "A"), Some(dec!(35)));
        assert_eq!(balance_of(&balances, "B"), Some(dec!(-35)));

        let settled = net_balances(&expenses, &[accepted("B", "A", dec!(59.99))]);
        assert!(settled.is_empty());
    }

    #[test]
    fn non_accepted_payments_are_ignored() {
        let expenses = vec![expense("A", &[("B", dec!(60))])];
        let mut pending = accepted("B", "A", dec!(60));
        pending.status = PaymentStatus::Pending;
        let mut rejected = pending.clone();
        rejected.status = PaymentStatus::Rejected;
        let balances = net_balances(&expenses, &[pending, rejected]);
        assert_eq!(balance_of(&balances, "B"), Some(dec!(-60)));
    }

    fn arb_history() -> impl Strategy<Value = (Vec<ExpenseWithSplits>, Vec<Payment>)> {
        let users = ["a", "b", "c", "d", "e", "f"];
        let expenses = proptest::collection::vec(
            (0usize..6, 1i64..1_000_000, 1usize..6),
            0..30,
        )
        .prop_map(move |raw| {
            raw.into_iter()
                .map(|(payer, cents, n)| {
                    let members: Vec<String> =
                        users.iter().take(n).map(|u| u.to_string()).collect();
                    let splits = equal_split(Decimal::new(cents, 2), &members);
                    let pairs: Vec<(&str, Decimal)> =
                        splits.iter().map(|s| (s.user_id.as_str(), s.owed_amount)).collect();
                    expense(users[payer], &pairs)
                })
                .collect::<Vec<_>>()
        });
        let transfers = (0usize..6, 0usize..6, 1i64..100_000);
        let payments = proptest::collection::vec(transfers, 0..10).prop_map(move |raw| {
            raw.into_iter()
                .filter(|(d, c, _)| d != c)
                .map(|(d, c, cents)| accepted(users[d], users[c], Decimal::new(cents, 3)))
                .collect::<Vec<_>>()
        });
        (expenses, payments)
    }

    proptest! {
        #[test]
        fn unfiltered_positions_sum_to_exactly_zero((expenses, payments) in arb_history()) {
            let total: Decimal = net_positions(&expenses, &payments).values().copied().sum();
            prop_assert_eq!(total, Decimal::ZERO);
        }
    }
}
