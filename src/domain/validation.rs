use chrono::NaiveDate;
use thiserror::Error;

use super::Cents;
use super::money::{MAX_AMOUNT_CENTS, format_cents};

/// A user-correctable problem with submitted data. The message is shown verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be between {min} and {max} characters")]
    LengthOutOfRange {
        field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("Currency must be a 3-letter code (e.g. EUR, USD), got '{0}'")]
    InvalidCurrency(String),

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("startDate ({start}) cannot be after endDate ({end})")]
    InvertedDates { start: NaiveDate, end: NaiveDate },

    #[error("Amount must be greater than 0")]
    NonPositiveAmount(Cents),

    #[error("Amount must be at most {}", format_cents(MAX_AMOUNT_CENTS))]
    AmountTooLarge(Cents),

    #[error("Trip total exceeds the largest supported amount")]
    TotalOutOfRange,

    #[error("Expense date {date} must be within trip dates ({start} to {end})")]
    DateOutsideTrip {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Participant does not belong to this trip")]
    PayerNotInTrip,
}

/// Trim `value` and ensure it is non-empty and at most `max` characters.
pub fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    optional_text(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

pub fn optional_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Normalise an optional free-text field: blank becomes `None`.
pub fn normalize_optional(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Ok(None),
        Some(v) => {
            optional_text(field, &v, max)?;
            Ok(Some(v))
        }
        None => Ok(None),
    }
}

pub fn validate_currency(code: &str) -> Result<String, ValidationError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::Required("Currency"));
    }
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(code.to_string())
    } else {
        Err(ValidationError::InvalidCurrency(code.to_string()))
    }
}

pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required("Email"));
    }
    optional_text("Email", email, 255)?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email.to_string())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::InvertedDates { start, end });
    }
    Ok(())
}

/// An amount must be positive and no larger than [`MAX_AMOUNT_CENTS`].
pub fn validate_amount(amount: Cents) -> Result<(), ValidationError> {
    if amount <= 0 {
        return Err(ValidationError::NonPositiveAmount(amount));
    }
    if amount > MAX_AMOUNT_CENTS {
        return Err(ValidationError::AmountTooLarge(amount));
    }
    Ok(())
}
