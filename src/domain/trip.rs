use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;
use super::validation::{
    ValidationError, normalize_optional, required_text, validate_currency, validate_date_range,
};

pub type TripId = Uuid;

const NAME_MAX: usize = 100;
const DESTINATION_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    pub owner_id: UserId,
    pub name: String,
    pub destination: String,
    pub description: Option<String>,
    /// ISO 4217 code, e.g. "EUR"
    pub currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Fields submitted when creating a trip. Every field except `description` is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Trip {
    pub fn new(owner_id: UserId, draft: TripDraft) -> Result<Self, ValidationError> {
        let name = required_text("Trip name", &draft.name, NAME_MAX)?;
        let destination = required_text("Destination", &draft.destination, DESTINATION_MAX)?;
        let description = normalize_optional("Description", draft.description, DESCRIPTION_MAX)?;
        let currency = validate_currency(&draft.currency)?;
        let start_date = draft
            .start_date
            .ok_or(ValidationError::Required("Start date"))?;
        let end_date = draft.end_date.ok_or(ValidationError::Required("End date"))?;
        validate_date_range(start_date, end_date)?;

        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            destination,
            description,
            currency,
            start_date,
            end_date,
            created_at: Utc::now(),
        })
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    /// Inclusive on both ends.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Apply a partial update. On error the trip is left unchanged.
    pub fn apply(&mut self, changes: TripChanges) -> Result<(), ValidationError> {
        let mut updated = self.clone();

        if let Some(name) = changes.name {
            updated.name = required_text("Trip name", &name, NAME_MAX)?;
        }
        if let Some(destination) = changes.destination {
            updated.destination = required_text("Destination", &destination, DESTINATION_MAX)?;
        }
        if let Some(description) = changes.description {
            updated.description =
                normalize_optional("Description", Some(description), DESCRIPTION_MAX)?;
        }
        if let Some(currency) = changes.currency {
            updated.currency = validate_currency(&currency)?;
        }
        if let Some(start) = changes.start_date {
            updated.start_date = start;
        }
        if let Some(end) = changes.end_date {
            updated.end_date = end;
        }
        validate_date_range(updated.start_date, updated.end_date)?;

        *self = updated;
        Ok(())
    }
}
