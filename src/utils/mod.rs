pub mod validation;

/// Convert a count to f64 for ratios, allowing the precision loss explicitly
#[inline]
#[must_use]
pub fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}
