use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ApiError;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lowercases, rejecting anything that is not an address.
pub fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(email)
}

pub fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

pub fn non_negative(field: &str, value: f64) -> Result<f64, ApiError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ApiError::bad_request(format!("{} must be a non-negative number", field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("  Jane.Doe@Example.COM ", Some("jane.doe@example.com"))]
    #[case("a@b.co", Some("a@b.co"))]
    #[case("no-at-sign", None)]
    #[case("two@@example.com", None)]
    #[case("spaces in@example.com", None)]
    #[case("", None)]
    fn normalizes_or_rejects(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_email(raw).ok().as_deref(), expected);
    }

    #[test]
    fn blank_required_field_is_bad_request() {
        assert!(matches!(required("title", "   "), Err(ApiError::BadRequest(_))));
        assert_eq!(required("title", " Site ").unwrap(), "Site");
    }

    #[test]
    fn amounts_must_be_finite_and_non_negative() {
        assert!(non_negative("amount", -1.0).is_err());
        assert!(non_negative("amount", f64::NAN).is_err());
        assert_eq!(non_negative("amount", 0.0).unwrap(), 0.0);
    }
}
