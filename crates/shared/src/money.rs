//! Monetary rounding helpers.
//!
//! All fares cross the wire as floats rounded half-up to two decimals and are
//! stored in NUMERIC(10,2) columns; rounding must happen exactly once, here.

/// Round a monetary amount half-up to two decimal places.
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Round a distance half-up to three decimal places (NUMERIC(10,3) storage).
pub fn round3(amount: f64) -> f64 {
    (amount * 1000.0).round() / 1000.0
}

/// True when two amounts agree within one paisa (the tamper-check tolerance).
/// The extra epsilon absorbs binary-representation noise at the boundary.
pub fn amounts_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= 0.01 + 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_up() {
        // 1.125 is exactly representable, so the .5 boundary is genuine.
        assert_eq!(round2(1.125), 1.13);
        assert_eq!(round2(1.124), 1.12);
        assert_eq!(round2(2934.0), 2934.0);
    }

    #[test]
    fn rounds_distance_to_millis() {
        assert_eq!(round3(290.44361), 290.444);
    }

    #[test]
    fn amount_tolerance_is_one_paisa() {
        assert!(amounts_match(480.0, 480.01));
        assert!(amounts_match(480.0, 479.99));
        assert!(!amounts_match(480.0, 400.0));
        assert!(!amounts_match(480.0, 480.02));
    }
}
