//! Input validation for API requests.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Permissive email shape check; uniqueness is enforced by the database
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();

    /// Housing unit numbers: alphanumeric with dashes and spaces (e.g. "A-12", "Casa 4")
    static ref UNIT_NUMBER_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _-]{0,31}$").unwrap();
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

pub fn validate_unit_number(numero: &str) -> Result<(), String> {
    if numero.trim().is_empty() {
        return Err("Residence number is required".to_string());
    }
    if !UNIT_NUMBER_REGEX.is_match(numero.trim()) {
        return Err("Invalid residence number format".to_string());
    }
    Ok(())
}

/// Parse a submitted amount. Absent amounts are stored as 0 and left for
/// administrative correction; present amounts must be non-negative.
pub fn parse_amount(raw: Option<&str>) -> Result<f64, String> {
    match raw {
        None => Ok(0.0),
        Some(s) if s.trim().is_empty() => Ok(0.0),
        Some(s) => {
            let value: f64 = s
                .trim()
                .parse()
                .map_err(|_| "Amount must be a number".to_string())?;
            if !value.is_finite() || value < 0.0 {
                return Err("Amount must be a non-negative number".to_string());
            }
            Ok(value)
        }
    }
}

/// Validate a due date in `YYYY-MM-DD` form
pub fn validate_due_date(date: &str) -> Result<(), String> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| "Due date must be in YYYY-MM-DD format".to_string())
}

/// Validate password strength for registration and recovery
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if password.len() > 128 {
        return Err("Password is too long".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_defaults_to_zero_when_absent() {
        assert_eq!(parse_amount(None).unwrap(), 0.0);
        assert_eq!(parse_amount(Some("")).unwrap(), 0.0);
        assert_eq!(parse_amount(Some("  ")).unwrap(), 0.0);
    }

    #[test]
    fn amount_rejects_negative_and_garbage() {
        assert!(parse_amount(Some("-1")).is_err());
        assert!(parse_amount(Some("abc")).is_err());
        assert!(parse_amount(Some("NaN")).is_err());
        assert!(parse_amount(Some("inf")).is_err());
    }

    #[test]
    fn amount_accepts_zero_and_decimals() {
        assert_eq!(parse_amount(Some("0")).unwrap(), 0.0);
        assert_eq!(parse_amount(Some("1250.75")).unwrap(), 1250.75);
    }

    #[test]
    fn unit_numbers() {
        assert!(validate_unit_number("A-12").is_ok());
        assert!(validate_unit_number("Casa 4").is_ok());
        assert!(validate_unit_number("").is_err());
        assert!(validate_unit_number("../etc").is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("vecino@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn due_dates() {
        assert!(validate_due_date("2024-06-01").is_ok());
        assert!(validate_due_date("01/06/2024").is_err());
        assert!(validate_due_date("2024-13-01").is_err());
    }
}
