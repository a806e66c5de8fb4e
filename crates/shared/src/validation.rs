//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// Digits with an optional leading +.
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]+$").expect("valid phone regex");
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lng: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lng) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates a phone number: 10-20 characters, digits with optional + prefix.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if (10..=20).contains(&phone.len()) && PHONE_RE.is_match(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone_format");
        err.message = Some("Phone must be 10-20 digits with an optional leading +".into());
        Err(err)
    }
}

/// Validates that a monetary amount is strictly positive.
pub fn validate_amount(amount: f64) -> Result<(), ValidationError> {
    if amount > 0.0 && amount.is_finite() {
        Ok(())
    } else {
        let mut err = ValidationError::new("amount_positive");
        err.message = Some("Amount must be greater than zero".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latitude_bounds() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.0001).is_err());
        assert!(validate_latitude(-90.0001).is_err());
    }

    #[test]
    fn test_longitude_bounds() {
        assert!(validate_longitude(0.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.0001).is_err());
        assert!(validate_longitude(-180.0001).is_err());
    }

    #[test]
    fn test_phone_format() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("+919876543210").is_ok());
        assert!(validate_phone("12345678901234567890").is_ok()); // 20 chars
        assert!(validate_phone("123456789").is_err()); // too short
        assert!(validate_phone("123456789012345678901").is_err()); // too long
        assert!(validate_phone("98765abc10").is_err());
    }

    #[test]
    fn test_amount_positive() {
        assert!(validate_amount(0.01).is_ok());
        assert!(validate_amount(2934.0).is_ok());
        assert!(validate_amount(0.0).is_err());
        assert!(validate_amount(-1.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
    }
}
