use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{ValidationError, required_text, validate_email};

pub type UserId = Uuid;

pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Salted hash, see `application::auth::hash_password`.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(registration: Registration, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: registration.name,
            email: registration.email,
            password_hash,
            created_at: Utc::now(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public view of a user, never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Registration {
    pub fn validate(self) -> Result<Self, ValidationError> {
        let name = required_text("Name", &self.name, 100)?;
        let email = validate_email(&self.email)?;

        if self.password.is_empty() {
            return Err(ValidationError::Required("Password"));
        }
        let len = self.password.chars().count();
        if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
            return Err(ValidationError::LengthOutOfRange {
                field: "Password",
                min: PASSWORD_MIN_LEN,
                max: PASSWORD_MAX_LEN,
            });
        }

        Ok(Self {
            name,
            email,
            password: self.password,
        })
    }
}
