use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::money::{decimal, divide_half_up};
use super::{Cents, Expense, Participant, ParticipantId, Trip, TripId, ValidationError};

/// Per-trip totals and the net position of every participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSummary {
    pub trip_id: TripId,
    pub trip_name: String,
    pub currency: String,
    #[serde(with = "decimal")]
    pub total_amount: Cents,
    pub participants: Vec<ParticipantBalance>,
}

/// `balance > 0`: the participant is owed money. `balance < 0`: they owe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantBalance {
    pub id: ParticipantId,
    pub name: String,
    #[serde(with = "decimal")]
    pub total_paid: Cents,
    #[serde(with = "decimal")]
    pub balance: Cents,
}

impl TripSummary {
    pub fn balance_of(&self, participant: ParticipantId) -> Option<Cents> {
        self.participants
            .iter()
            .find(|p| p.id == participant)
            .map(|p| p.balance)
    }

    pub fn balance_sum(&self) -> Cents {
        self.participants.iter().map(|p| p.balance).sum()
    }
}

/// Equal-split summary: every participant owes `total / N` (rounded half-up to
/// the cent) and is credited with what they paid.
///
/// Rounding leaves a residue of at most a few cents; it is taken from the first
/// participant with a positive balance (or the first participant) so that the
/// balances always sum to exactly zero. Participants keep their input order.
///
/// Sums are taken in `i128`; a total that does not fit in [`Cents`] is an error.
pub fn compute_summary(
    trip: &Trip,
    participants: &[Participant],
    expenses: &[Expense],
) -> Result<TripSummary, ValidationError> {
    let total: i128 = expenses.iter().map(|e| i128::from(e.amount_cents)).sum();
    let total_amount = Cents::try_from(total).map_err(|_| ValidationError::TotalOutOfRange)?;

    // Each payer's share is bounded by the total, which fits.
    let mut paid: HashMap<ParticipantId, Cents> = HashMap::new();
    for expense in expenses {
        *paid.entry(expense.payer_id).or_insert(0) += expense.amount_cents;
    }

    let fair_share = divide_half_up(total_amount, participants.len());

    let mut balances: Vec<ParticipantBalance> = participants
        .iter()
        .map(|p| {
            let total_paid = paid.get(&p.id).copied().unwrap_or(0);
            ParticipantBalance {
                id: p.id,
                name: p.name.clone(),
                total_paid,
                balance: total_paid - fair_share,
            }
        })
        .collect();

    let residue: Cents = balances.iter().map(|b| b.balance).sum();
    if residue != 0 {
        let target = balances.iter().position(|b| b.balance > 0).unwrap_or(0);
        if let Some(entry) = balances.get_mut(target) {
            entry.balance -= residue;
        }
    }

    Ok(TripSummary {
        trip_id: trip.id,
        trip_name: trip.name.clone(),
        currency: trip.currency.clone(),
        total_amount,
        participants: balances,
    })
}
