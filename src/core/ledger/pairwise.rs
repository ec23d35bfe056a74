//! Pairwise balance aggregation.
//!
//! Every split owed by a non-payer becomes a directed debt towards the payer.
//! Debts between the same two members are netted into a single edge, then
//! accepted payments are subtracted by exact direction.

use crate::core::models::balance::{PairwiseDebt, PairwiseLedger};
use crate::core::models::expense::ExpenseWithSplits;
use crate::core::models::payment::Payment;
use crate::core::money::{EPSILON, round_money};
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

type Edge = (String, String);

pub fn aggregate_pairwise(expenses: &[ExpenseWithSplits], payments: &[Payment]) -> PairwiseLedger {
    let mut directed: BTreeMap<Edge, Decimal> = BTreeMap::new();
    for record in expenses {
        let payer = &record.expense.payer_id;
        for split in record.splits.iter().filter(|s| &s.user_id != payer) {
            *directed
                .entry((split.user_id.clone(), payer.clone()))
                .or_insert(Decimal::ZERO) += split.owed_amount;
        }
    }

    let mut paid: BTreeMap<Edge, Decimal> = BTreeMap::new();
    let mut accepted_payments = 0;
    for payment in payments.iter().filter(|p| p.is_accepted()) {
        accepted_payments += 1;
        *paid
            .entry((payment.debtor_id.clone(), payment.creditor_id.clone()))
            .or_insert(Decimal::ZERO) += payment.amount;
    }

    let mut debts = Vec::new();
    for ((a, b), forward) in &directed {
        // Each unordered pair is handled once, from its smaller id.
        if a > b && directed.contains_key(&(b.clone(), a.clone())) {
            continue;
        }
        let backward = directed.get(&(b.clone(), a.clone())).copied().unwrap_or(Decimal::ZERO);
        let net = round_money(*forward - backward);
        if net.abs() <= EPSILON {
            continue;
        }
        let (from, to) = if net > Decimal::ZERO { (a, b) } else { (b, a) };
        let original_amount = net.abs();
        let paid_amount = paid
            .get(&(from.clone(), to.clone()))
            .copied()
            .map(round_money)
            .unwrap_or(Decimal::ZERO);
        let amount = round_money(original_amount - paid_amount);
        debts.push(PairwiseDebt {
            from: from.clone(),
            to: to.clone(),
            amount,
            original_amount,
            paid_amount,
            settled: amount <= EPSILON,
        });
    }
    debts.sort_by(|x, y| (&x.from, &x.to).cmp(&(&y.from, &y.to)));

    debug!(
        "Aggregated {} pairwise debts from {} expenses and {} accepted payments",
        debts.len(),
        expenses.len(),
        accepted_payments
    );
    PairwiseLedger {
        debts,
        accepted_payments,
    }
}
