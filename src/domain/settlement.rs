use serde::{Deserialize, Serialize};

use super::money::decimal;
use super::{Cents, ParticipantId, TripId, TripSummary};

/// Transfers that bring every balance of a trip back to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSettlement {
    pub trip_id: TripId,
    pub trip_name: String,
    pub currency: String,
    pub payments: Vec<Payment>,
}

/// `payer` owes `receiver` the given amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payer_id: ParticipantId,
    pub payer_name: String,
    pub receiver_id: ParticipantId,
    pub receiver_name: String,
    #[serde(with = "decimal")]
    pub amount: Cents,
}

struct Side<'a> {
    order: usize,
    id: ParticipantId,
    name: &'a str,
    remaining: Cents,
}

/// Index of the side with the largest remaining amount; earlier input order wins ties.
fn largest(sides: &[Side<'_>]) -> Option<usize> {
    sides
        .iter()
        .enumerate()
        .filter(|(_, s)| s.remaining > 0)
        .max_by(|(_, a), (_, b)| {
            a.remaining
                .cmp(&b.remaining)
                .then_with(|| b.order.cmp(&a.order))
        })
        .map(|(i, _)| i)
}

/// Greedy settlement: repeatedly pair the largest debtor with the largest
/// creditor and move the smaller of the two amounts.
///
/// Each step clears at least one side, so a trip with N participants needs at
/// most N - 1 payments. Expects balances that sum to zero, which
/// [`compute_summary`](super::compute_summary) guarantees.
pub fn settle(summary: &TripSummary) -> TripSettlement {
    let mut debtors = Vec::new();
    let mut creditors = Vec::new();

    for (order, entry) in summary.participants.iter().enumerate() {
        let side = Side {
            order,
            id: entry.id,
            name: &entry.name,
            remaining: entry.balance.abs(),
        };
        match entry.balance.signum() {
            -1 => debtors.push(side),
            1 => creditors.push(side),
            _ => {}
        }
    }

    let mut payments = Vec::new();
    while let (Some(d), Some(c)) = (largest(&debtors), largest(&creditors)) {
        let amount = debtors[d].remaining.min(creditors[c].remaining);
        debtors[d].remaining -= amount;
        creditors[c].remaining -= amount;

        payments.push(Payment {
            payer_id: debtors[d].id,
            payer_name: debtors[d].name.to_string(),
            receiver_id: creditors[c].id,
            receiver_name: creditors[c].name.to_string(),
            amount,
        });
    }

    debug_assert!(debtors.iter().chain(&creditors).all(|s| s.remaining == 0));

    TripSettlement {
        trip_id: summary.trip_id,
        trip_name: summary.trip_name.clone(),
        currency: summary.currency.clone(),
        payments,
    }
}

/// Balances after every payment has been made (payer +amount, receiver -amount).
pub fn apply_payments(summary: &TripSummary, payments: &[Payment]) -> Vec<(ParticipantId, Cents)> {
    let mut balances: Vec<(ParticipantId, Cents)> = summary
        .participants
        .iter()
        .map(|p| (p.id, p.balance))
        .collect();

    for payment in payments {
        for (id, balance) in balances.iter_mut() {
            if *id == payment.payer_id {
                *balance += payment.amount;
            }
            if *id == payment.receiver_id {
                *balance -= payment.amount;
            }
        }
    }
    balances
}
