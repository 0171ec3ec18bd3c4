use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TripId;
use super::validation::{ValidationError, required_text, validate_email};

pub type ParticipantId = Uuid;

const NAME_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub trip_id: TripId,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

fn normalize_email(email: Option<String>) -> Result<Option<String>, ValidationError> {
    match email.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(e) => validate_email(e).map(Some),
    }
}

impl Participant {
    pub fn new(trip_id: TripId, draft: ParticipantDraft) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            trip_id,
            name: required_text("Participant name", &draft.name, NAME_MAX)?,
            email: normalize_email(draft.email)?,
            created_at: Utc::now(),
        })
    }

    pub fn apply(&mut self, changes: ParticipantChanges) -> Result<(), ValidationError> {
        let name = changes
            .name
            .map(|n| required_text("Participant name", &n, NAME_MAX))
            .transpose()?;
        let email = changes.email.map(|e| normalize_email(Some(e))).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        Ok(())
    }
}
