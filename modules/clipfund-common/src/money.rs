//! Cent-precision helpers. All internal amounts are 2-decimal values;
//! the payment processor boundary converts to integer cents.

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a 2-decimal amount to integer cents for the processor wire.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
