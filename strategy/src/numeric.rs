//! Step rounding and tolerant comparisons.
//!
//! All grid arithmetic is exact [`Decimal`]; the 1e-8 tolerance only enters
//! where two independently derived values are compared (fill prices against
//! level prices, venue-observed orders against desired orders).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Absolute comparison tolerance.
pub const EPS: Decimal = dec!(0.00000001);

/// Largest value down to a multiple of `step`. A zero step is the identity.
pub fn round_down(x: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return x;
    }
    (x / step).floor() * step
}

/// Smallest multiple of `step` at or above `x`. A zero step is the identity.
pub fn round_up(x: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return x;
    }
    (x / step).ceil() * step
}

/// Whether `x` sits on the `step` grid within [`EPS`].
pub fn is_step_multiple(x: Decimal, step: Decimal) -> bool {
    if step.is_zero() {
        return true;
    }
    let remainder = x - round_down(x, step);
    remainder.abs() <= EPS || (step - remainder).abs() <= EPS
}

/// |a − b| ≤ [`EPS`].
pub fn approx_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= EPS
}
