//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into the range `[min, max]`.
///
/// This is hard saturation, values outside the range are truncated to the
/// nearest bound, not rescaled.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::AddAssign
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&5f64, &-1f64, &1f64), 1f64);
        assert_eq!(clamp(&-5f64, &-1f64, &1f64), -1f64);
        assert_eq!(clamp(&0.5f64, &-1f64, &1f64), 0.5f64);
        assert_eq!(clamp(&-1f64, &-1f64, &1f64), -1f64);
        assert_eq!(clamp(&1f64, &-1f64, &1f64), 1f64);
    }

    #[test]
    fn test_clamp_idempotent() {
        for x in &[-100f64, -1.5, -1.0, 0.0, 0.3, 1.0, 42.0] {
            let once = clamp(x, &-1f64, &1f64);
            assert_eq!(clamp(&once, &-1f64, &1f64), once);
        }
    }
}
