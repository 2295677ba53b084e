/// Clamp `v` into `[lo, hi]`; `hi < lo` collapses to `lo`.
pub(crate) fn restrict(lo: i64, hi: i64, v: i64) -> i64 {
    v.min(hi).max(lo)
}

/// Rows per band so that `bands` bands cover `height` rows with no remainder gap.
pub(crate) fn band_rows(height: usize, bands: usize) -> usize {
    height.div_ceil(bands.max(1)).max(1)
}

/// `num / den` clamped to `[0, 1]`; an empty denominator reads as done.
pub(crate) fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        return 1.0;
    }
    (num as f64 / den as f64).clamp(0.0, 1.0)
}
