//! Exact integer rates in basis points.

/// One hundred percent, in basis points.
pub const FULL_BPS: u32 = 10_000;

/// `part / whole` in basis points, rounded half to even. Zero when `whole`
/// is zero.
pub fn ratio_bps(part: u128, whole: u128) -> u32 {
    if whole == 0 {
        return 0;
    }
    let scaled = part.saturating_mul(FULL_BPS as u128);
    let quotient = scaled / whole;
    let remainder = scaled % whole;
    let twice = remainder.saturating_mul(2);
    let rounded = if twice > whole || (twice == whole && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    };
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// A percentage threshold (e.g. `66.67`) as basis points, clamped to
/// `0..=10_000`. NaN counts as zero.
pub fn percent_to_bps(percent: f64) -> u32 {
    if percent.is_nan() || percent <= 0.0 {
        return 0;
    }
    let bps = (percent * 100.0).round();
    if bps >= FULL_BPS as f64 {
        FULL_BPS
    } else {
        bps as u32
    }
}

/// Whether `part / whole` is at least `need_bps`, compared exactly.
pub fn meets_bps(part: u128, whole: u128, need_bps: u32) -> bool {
    if whole == 0 {
        return false;
    }
    part.saturating_mul(FULL_BPS as u128) >= (need_bps as u128).saturating_mul(whole)
}

pub fn bps_to_percent(bps: u32) -> f64 {
    bps as f64 / 100.0
}
