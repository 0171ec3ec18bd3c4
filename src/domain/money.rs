use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// For EUR/USD, 1 unit = 100 cents, so €50.00 = 5000 cents.
pub type Cents = i64;

/// Largest amount a single value may carry: 100 billion units.
/// Keeps sums of many expenses far from `i64::MAX` and every value exact as a
/// two-decimal JSON number.
pub const MAX_AMOUNT_CENTS: Cents = 10_000_000_000_000;

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, input) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, decimal_str) = match input.split_once('.') {
        Some((units, decimals)) if !decimals.contains('.') => (units, decimals),
        Some(_) => return Err(ParseCentsError::InvalidFormat),
        None => (input, ""),
    };

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !decimal_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::OutOfRange)?
    };

    // Pad or truncate the fractional part to 2 digits
    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => decimal_str.parse::<i64>().map_err(|_| ParseCentsError::InvalidFormat)? * 10,
        _ => decimal_str[..2]
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::OutOfRange)?;
    check_range(if negative { -cents } else { cents })
}

/// Reject values whose magnitude exceeds [`MAX_AMOUNT_CENTS`].
pub fn check_range(cents: Cents) -> Result<Cents, ParseCentsError> {
    if cents.abs() > MAX_AMOUNT_CENTS {
        return Err(ParseCentsError::OutOfRange);
    }
    Ok(cents)
}

/// Divide `total` by `parts`, rounding half away from zero to the nearest cent.
/// Returns 0 when `parts` is 0.
pub fn divide_half_up(total: Cents, parts: usize) -> Cents {
    if parts == 0 {
        return 0;
    }
    let parts = parts as i64;
    let quotient = total / parts;
    let remainder = total % parts;
    if remainder.abs() * 2 >= parts {
        quotient + total.signum()
    } else {
        quotient
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    OutOfRange,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::OutOfRange => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Serde adapter: cents travel as a JSON number with two decimals (`12.34`).
/// Deserialisation also accepts integers and decimal strings.
pub mod decimal {
    use serde::{Deserializer, Serializer, de};
    use std::fmt;

    use super::{Cents, ParseCentsError, check_range, parse_cents};

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*cents as f64 / 100.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        deserializer.deserialize_any(CentsVisitor)
    }

    pub(super) struct CentsVisitor;

    impl de::Visitor<'_> for CentsVisitor {
        type Value = Cents;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal amount such as 12.34")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cents, E> {
            v.checked_mul(100)
                .ok_or(ParseCentsError::OutOfRange)
                .and_then(check_range)
                .map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cents, E> {
            i64::try_from(v)
                .ok()
                .and_then(|v| v.checked_mul(100))
                .ok_or(ParseCentsError::OutOfRange)
                .and_then(check_range)
                .map_err(E::custom)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Cents, E> {
            if !v.is_finite() {
                return Err(E::custom("amount must be a finite number"));
            }
            parse_cents(&v.to_string()).map_err(E::custom)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Cents, E> {
            parse_cents(v).map_err(E::custom)
        }
    }
}

/// Same as [`decimal`] for optional amounts (partial updates).
pub mod decimal_opt {
    use serde::{Deserializer, Serializer, de};
    use std::fmt;

    use super::Cents;
    use super::decimal::CentsVisitor;

    pub fn serialize<S: Serializer>(
        cents: &Option<Cents>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match cents {
            Some(c) => super::decimal::serialize(c, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Cents>, D::Error> {
        deserializer.deserialize_option(OptionVisitor)
    }

    struct OptionVisitor;

    impl<'de> de::Visitor<'de> for OptionVisitor {
        type Value = Option<Cents>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an optional decimal amount")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(CentsVisitor).map(Some)
        }
    }
}
