//! Delay sampling and interruptible waiting

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Skip;
use crate::profile::Delay;
use crate::random::RandomSource;
use crate::{Error, Result, gated_error, gated_warn};

/// Milliseconds to wait for `delay`.
///
/// Invalid specifications (negative values, `min > max`, unknown kinds) never
/// fail: they resolve to 0 with a diagnostic.
pub fn sample(delay: &Delay, random: &dyn RandomSource) -> u64 {
    match *delay {
        Delay::Fixed { value } => sample_fixed(value),
        Delay::Range { min, max } => sample_range(min, max, random),
        Delay::Normal { mean, std_dev } => sample_normal(mean, std_dev, random),
        Delay::Unsupported(ref kind) => {
            let skip = Skip::UnsupportedDelayKind(kind.clone());
            gated_warn!(reason = %skip, "Setting time to sleep to 0");
            0
        }
    }
}

/// Same as [`sample`], with an absent delay meaning none
pub fn sample_or_zero(delay: Option<&Delay>, random: &dyn RandomSource) -> u64 {
    delay.map_or(0, |d| sample(d, random))
}

fn sample_fixed(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_else(|_| {
        gated_error!(value, "Value is negative for fixed delay. Setting time to sleep to 0.");
        0
    })
}

fn sample_range(min: i64, max: i64, random: &dyn RandomSource) -> u64 {
    if min < 0 {
        gated_error!(min, "Minimum is negative for range delay. Setting time to sleep to 0.");
        return 0;
    }
    if max < 0 {
        gated_error!(max, "Maximum is negative for range delay. Setting time to sleep to 0.");
        return 0;
    }
    if min > max {
        gated_error!(
            min,
            max,
            "Minimum is greater than maximum for range delay. Setting time to sleep to 0."
        );
        return 0;
    }

    // both bounds are non-negative, so the inclusive span fits in u64
    let span = (max - min).unsigned_abs() + 1;
    min.unsigned_abs() + random.next_long(span)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample_normal(mean: i64, std_dev: i64, random: &dyn RandomSource) -> u64 {
    if mean < 0 {
        gated_error!(mean, "Mean is negative for normal delay. Setting time to sleep to 0.");
        return 0;
    }
    if std_dev < 0 {
        gated_error!(
            std_dev,
            "Standard deviation is negative for normal delay. Setting time to sleep to 0."
        );
        return 0;
    }

    let drawn = (std_dev as f64).mul_add(random.next_gaussian(), mean as f64).round();
    if drawn < 0.0 {
        gated_warn!(drawn, mean, std_dev, "Normal delay drew a negative duration, clamping to 0");
        return 0;
    }
    drawn as u64
}

/// Sleep for `millis`, giving up with [`Error::Interrupted`] if `cancel` fires first
pub async fn wait(millis: u64, cancel: &CancellationToken) -> Result<()> {
    if millis == 0 {
        return Ok(());
    }

    tokio::select! {
        () = tokio::time::sleep(Duration::from_millis(millis)) => Ok(()),
        () = cancel.cancelled() => Err(Error::Interrupted(millis)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ScriptedRandom, ThreadRandom};

    #[test]
    fn test_fixed_delay() {
        let random = ThreadRandom;
        assert_eq!(sample(&Delay::Fixed { value: 2000 }, &random), 2000);
        assert_eq!(sample(&Delay::Fixed { value: 0 }, &random), 0);
    }

    #[test]
    fn test_negative_fixed_delay_is_zero() {
        assert_eq!(sample(&Delay::Fixed { value: -2000 }, &ThreadRandom), 0);
    }

    #[test]
    fn test_range_delay_uses_inclusive_span() {
        let random = ScriptedRandom::new().with_ints([1500]);
        let delay = Delay::Range { min: 2000, max: 4000 };
        assert_eq!(sample(&delay, &random), 3500);
    }

    #[test]
    fn test_range_delay_upper_bound_reachable() {
        // span is max - min + 1 = 2001, so the largest draw is 2000
        let random = ScriptedRandom::new().with_ints([5000]);
        let delay = Delay::Range { min: 2000, max: 4000 };
        assert_eq!(sample(&delay, &random), 4000);
    }

    #[test]
    fn test_range_delay_stays_in_bounds() {
        let delay = Delay::Range { min: 10, max: 20 };
        for _ in 0..500 {
            let ms = sample(&delay, &ThreadRandom);
            assert!((10..=20).contains(&ms));
        }
    }

    /// Always draws the largest value allowed
    struct Highest;

    impl RandomSource for Highest {
        fn next_int(&self, bound: u32) -> u32 {
            bound.saturating_sub(1)
        }

        fn next_long(&self, bound: u64) -> u64 {
            bound.saturating_sub(1)
        }

        fn next_gaussian(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_range_wider_than_u32_reaches_max() {
        let max = i64::from(u32::MAX) * 3;
        assert_eq!(sample(&Delay::Range { min: 0, max }, &Highest), max.unsigned_abs());
        assert_eq!(
            sample(&Delay::Range { min: 10, max: i64::MAX }, &Highest),
            i64::MAX.unsigned_abs()
        );

        let delay = Delay::Range { min: 0, max };
        for _ in 0..200 {
            assert!(sample(&delay, &ThreadRandom) <= max.unsigned_abs());
        }
    }

    #[test]
    fn test_invalid_range_delays_are_zero() {
        let random = ScriptedRandom::new().with_ints([1, 1, 1]);
        assert_eq!(sample(&Delay::Range { min: 4000, max: 2000 }, &random), 0);
        assert_eq!(sample(&Delay::Range { min: -1, max: 2000 }, &random), 0);
        assert_eq!(sample(&Delay::Range { min: 0, max: -5 }, &random), 0);
        // no draw is consumed for invalid specs
        assert_eq!(random.remaining(), 3);
    }

    #[test]
    fn test_degenerate_range() {
        let delay = Delay::Range { min: 750, max: 750 };
        assert_eq!(sample(&delay, &ThreadRandom), 750);
    }

    #[test]
    fn test_normal_delay_rounds() {
        let random = ScriptedRandom::new().with_gaussians([0.68]);
        let delay = Delay::Normal {
            mean: 3000,
            std_dev: 1500,
        };
        assert_eq!(sample(&delay, &random), 4020);
    }

    #[test]
    fn test_normal_delay_rounds_to_nearest() {
        let random = ScriptedRandom::new().with_gaussians([0.0003, -0.0003]);
        let delay = Delay::Normal {
            mean: 100,
            std_dev: 1000,
        };
        assert_eq!(sample(&delay, &random), 100);
        assert_eq!(sample(&delay, &random), 100);
    }

    #[test]
    fn test_invalid_normal_delays_are_zero() {
        let random = ScriptedRandom::new().with_gaussians([1.0, 1.0]);
        assert_eq!(sample(&Delay::Normal { mean: -3000, std_dev: 1500 }, &random), 0);
        assert_eq!(sample(&Delay::Normal { mean: 3000, std_dev: -1500 }, &random), 0);
    }

    #[test]
    fn test_negative_normal_draw_is_clamped() {
        let random = ScriptedRandom::new().with_gaussians([-3.0]);
        let delay = Delay::Normal {
            mean: 100,
            std_dev: 1000,
        };
        assert_eq!(sample(&delay, &random), 0);
    }

    #[test]
    fn test_unsupported_delay_is_zero() {
        let delay = Delay::Unsupported("exponential".to_string());
        assert_eq!(sample(&delay, &ThreadRandom), 0);
    }

    #[test]
    fn test_absent_delay_is_zero() {
        assert_eq!(sample_or_zero(None, &ThreadRandom), 0);
        assert_eq!(
            sample_or_zero(Some(&Delay::Fixed { value: 5 }), &ThreadRandom),
            5
        );
    }

    #[tokio::test]
    async fn test_wait_elapses() {
        let cancel = CancellationToken::new();
        let started = tokio::time::Instant::now();
        wait(20, &cancel).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_wait_is_interruptible() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = wait(60_000, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Interrupted(60_000)));
    }

    #[tokio::test]
    async fn test_zero_wait_ignores_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        wait(0, &cancel).await.unwrap();
    }
}
