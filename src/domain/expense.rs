use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{decimal, decimal_opt};
use super::validation::{ValidationError, normalize_optional, validate_amount};
use super::{Cents, Participant, ParticipantId, Trip, TripId};

pub type ExpenseId = Uuid;

const DESCRIPTION_MAX: usize = 255;

/// A single payment made by one participant on behalf of the whole trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    pub trip_id: TripId,
    pub payer_id: ParticipantId,
    #[serde(rename = "amount", with = "decimal")]
    pub amount_cents: Cents,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    #[serde(default, with = "decimal_opt")]
    pub amount: Option<Cents>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub payer_id: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseChanges {
    #[serde(
        default,
        with = "decimal_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Cents>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_id: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn check_date(trip: &Trip, date: NaiveDate) -> Result<(), ValidationError> {
    if !trip.contains_date(date) {
        return Err(ValidationError::DateOutsideTrip {
            date,
            start: trip.start_date,
            end: trip.end_date,
        });
    }
    Ok(())
}

fn check_payer(participants: &[Participant], payer_id: ParticipantId) -> Result<(), ValidationError> {
    if participants.iter().any(|p| p.id == payer_id) {
        Ok(())
    } else {
        Err(ValidationError::PayerNotInTrip)
    }
}

impl Expense {
    /// Build an expense for `trip`; the payer must be one of `participants`.
    pub fn new(
        trip: &Trip,
        participants: &[Participant],
        draft: ExpenseDraft,
    ) -> Result<Self, ValidationError> {
        let amount_cents = draft.amount.ok_or(ValidationError::Required("Amount"))?;
        validate_amount(amount_cents)?;
        let date = draft.date.ok_or(ValidationError::Required("Date"))?;
        check_date(trip, date)?;
        let payer_id = draft.payer_id.ok_or(ValidationError::Required("Payer"))?;
        check_payer(participants, payer_id)?;
        let description = normalize_optional("Description", draft.description, DESCRIPTION_MAX)?;

        Ok(Self {
            id: Uuid::new_v4(),
            trip_id: trip.id,
            payer_id,
            amount_cents,
            description,
            date,
            created_at: Utc::now(),
        })
    }

    /// Apply a partial update. On error the expense is left unchanged.
    pub fn apply(
        &mut self,
        trip: &Trip,
        participants: &[Participant],
        changes: ExpenseChanges,
    ) -> Result<(), ValidationError> {
        let mut updated = self.clone();

        if let Some(amount) = changes.amount {
            validate_amount(amount)?;
            updated.amount_cents = amount;
        }
        if let Some(date) = changes.date {
            check_date(trip, date)?;
            updated.date = date;
        }
        if let Some(payer_id) = changes.payer_id {
            check_payer(participants, payer_id)?;
            updated.payer_id = payer_id;
        }
        if let Some(description) = changes.description {
            updated.description =
                normalize_optional("Description", Some(description), DESCRIPTION_MAX)?;
        }

        *self = updated;
        Ok(())
    }
}
