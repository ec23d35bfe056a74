//! Greedy debt simplification.
//!
//! Repeatedly matches the largest remaining creditor with the largest
//! remaining debtor. Every round clears at least one party, so the plan has at
//! most `n - 1` transactions for `n` non-zero members. This is a bounded
//! heuristic: it does not search for the globally smallest plan.
//!
//! Ties on the largest remaining amount go to the party that appears first in
//! the input, so the same balances always produce the same plan.

use crate::core::models::balance::{NetBalance, SimplifiedDebt};
use crate::core::money::{EPSILON, round_money};
use log::debug;
use rust_decimal::Decimal;

struct Party<'a> {
    user_id: &'a str,
    remaining: Decimal,
}

/// Index of the first party holding the maximum remaining amount.
fn largest(parties: &[Party<'_>]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, party) in parties.iter().enumerate() {
        match best {
            Some(b) if parties[b].remaining >= party.remaining => {}
            _ => best = Some(i),
        }
    }
    best
}

pub fn simplify_debts(balances: &[NetBalance]) -> Vec<SimplifiedDebt> {
    let mut creditors: Vec<Party<'_>> = balances
        .iter()
        .filter(|b| b.net_balance > EPSILON)
        .map(|b| Party {
            user_id: &b.user_id,
            remaining: b.net_balance,
        })
        .collect();
    let mut debtors: Vec<Party<'_>> = balances
        .iter()
        .filter(|b| b.net_balance < -EPSILON)
        .map(|b| Party {
            user_id: &b.user_id,
            remaining: -b.net_balance,
        })
        .collect();

    let mut plan = Vec::new();
    while let (Some(c), Some(d)) = (largest(&creditors), largest(&debtors)) {
        let amount = round_money(creditors[c].remaining.min(debtors[d].remaining));
        plan.push(SimplifiedDebt {
            from: debtors[d].user_id.to_string(),
            to: creditors[c].user_id.to_string(),
            amount,
        });
        creditors[c].remaining -= amount;
        debtors[d].remaining -= amount;
        if creditors[c].remaining <= EPSILON {
            creditors.remove(c);
        }
        if debtors[d].remaining <= EPSILON {
            debtors.remove(d);
        }
    }

    debug!("Simplified {} balances into {} transactions", balances.len(), plan.len());
    plan
}
