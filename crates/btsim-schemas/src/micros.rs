//! Fixed-point share/cash/price representation.
//!
//! Every quantity that could otherwise be a native integer or float share
//! count, cash amount, or price is instead carried as an `i64` scaled by
//! [`MICROS_SCALE`]. This keeps sells after a stock dividend (which may be
//! fractional) and sub-cent commission math exact, and keeps arithmetic
//! free of the rounding a native `f64` price would introduce at every fill.

/// Number of fractional digits carried by a micros-scaled quantity.
pub const MICROS_SCALE: i64 = 1_000_000;

/// `adjust_factor` of `1.0` expressed in micros.
pub const FACTOR_UNITY_MICROS: i64 = MICROS_SCALE;

/// Smallest share quantity that is not treated as dust (spec: prune below
/// `1e-6` shares).
pub const DUST_SHARES_MICROS: i64 = 1;

/// Converts a decimal string (e.g. `"182.34"`) to micros.
///
/// Used only at system boundaries (wire DTOs, the in-memory feed's seed
/// data) — internal arithmetic never touches floats.
pub fn decimal_str_to_micros(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let negative = s.starts_with('-');
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let mut parts = unsigned.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let frac = parts.next().unwrap_or("");
    if frac.len() > 6 {
        return None;
    }
    let whole_val: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut frac_padded = frac.to_string();
    while frac_padded.len() < 6 {
        frac_padded.push('0');
    }
    let frac_val: i64 = if frac_padded.is_empty() {
        0
    } else {
        frac_padded.parse().ok()?
    };
    let micros = whole_val
        .checked_mul(MICROS_SCALE)?
        .checked_add(frac_val)?;
    Some(if negative { -micros } else { micros })
}

/// Renders a micros quantity back to a decimal string with 6 fractional
/// digits, matching the wire convention of [`decimal_str_to_micros`].
pub fn micros_to_decimal_str(micros: i64) -> String {
    let negative = micros < 0;
    let abs = micros.unsigned_abs();
    let whole = abs / (MICROS_SCALE as u64);
    let frac = abs % (MICROS_SCALE as u64);
    format!("{}{}.{:06}", if negative { "-" } else { "" }, whole, frac)
}

/// Multiplies two micros-scaled quantities, widening to `i128` to avoid
/// overflow, and rescales back down by [`MICROS_SCALE`].
///
/// Used for `shares_micros * price_micros -> cash_micros` and similar
/// products of two already-scaled quantities.
pub fn mul_micros(a: i64, b: i64) -> i128 {
    (a as i128) * (b as i128) / (MICROS_SCALE as i128)
}

/// Multiplies an already-widened micros product by another micros-scaled
/// quantity, rescaling back down by [`MICROS_SCALE`] once more.
///
/// Lets callers chain more than two micros quantities (e.g.
/// `shares * price * adjust_factor`) without re-narrowing to `i64` between
/// steps.
pub fn mul_micros_wide(a: i128, b: i64) -> i128 {
    a * (b as i128) / (MICROS_SCALE as i128)
}

/// Divides a widened micros product by a micros-scaled divisor, restoring
/// one factor of [`MICROS_SCALE`] in the numerator first so the result is
/// itself micros-scaled.
///
/// `b` must be strictly positive; callers are expected to have validated
/// this already (an adjustment factor or price of zero is not a value this
/// domain produces).
pub fn divide_micros_wide(a: i128, b: i64) -> i128 {
    a * (MICROS_SCALE as i128) / (b as i128)
}

/// Clamps an `i128` intermediate back to `i64`, saturating rather than
/// panicking on overflow (a "should never happen" condition for any
/// realistic account size).
pub fn clamp_i128_to_i64(v: i128) -> i64 {
    if v > i64::MAX as i128 {
        i64::MAX
    } else if v < i64::MIN as i128 {
        i64::MIN
    } else {
        v as i64
    }
}
