//! Weighted outcome selection.
//!
//! The three percentages are turned into cumulative cut points, then one draw
//! in `[1, 100]` picks the bucket it lands in. Cut points are inclusive upper
//! bounds: with cuts `[70, 90, 100]`, 70 is a success and 71 a failure.

use std::fmt;
use std::str::FromStr;

use crate::error::Skip;
use crate::random::RandomSource;

/// Outcome a call is steered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Downstream answers normally (or a spoofed success)
    Success,
    /// Downstream answers with a configured error
    Failure,
    /// Downstream hangs, then fails
    Timeout,
}

impl Outcome {
    /// Wire name used in tokens
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = Skip;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "timeout" => Ok(Self::Timeout),
            other => Err(Skip::UnknownStatus(other.to_string())),
        }
    }
}

/// Cumulative cut points `[s, s + f, s + f + t]`, last one always 100
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buckets([i32; 3]);

impl Buckets {
    /// Validate percentages and accumulate them
    pub fn compute(success: i32, failure: i32, timeout: i32) -> Result<Self, Skip> {
        let invalid = Skip::InvalidPercentageDistribution {
            success,
            failure,
            timeout,
        };
        if success < 0 || failure < 0 || timeout < 0 {
            return Err(invalid);
        }

        let first = success;
        let second = first.checked_add(failure).ok_or_else(|| invalid.clone())?;
        let third = second.checked_add(timeout).ok_or_else(|| invalid.clone())?;
        if third != 100 {
            return Err(invalid);
        }
        Ok(Self([first, second, third]))
    }

    /// Cut points
    #[must_use]
    pub fn cuts(&self) -> [i32; 3] {
        self.0
    }

    /// Bucket a draw in `[1, 100]` falls into
    #[must_use]
    pub fn outcome_for(&self, draw: i32) -> Outcome {
        let [success, failure, _] = self.0;
        if draw <= success {
            Outcome::Success
        } else if draw <= failure {
            Outcome::Failure
        } else {
            Outcome::Timeout
        }
    }

    /// Draw once and select
    pub fn select(&self, random: &dyn RandomSource) -> Outcome {
        let draw = random.next_int(100).min(99);
        // next_int is bounded by 99 here
        #[allow(clippy::cast_possible_wrap)]
        self.outcome_for(draw as i32 + 1)
    }
}

/// Cut points for the three weights, `None` if they are invalid
pub fn compute_buckets(success: i32, failure: i32, timeout: i32) -> Option<Buckets> {
    match Buckets::compute(success, failure, timeout) {
        Ok(buckets) => Some(buckets),
        Err(skip) => {
            crate::gated_error!(reason = %skip, "Invalid percentage distribution");
            None
        }
    }
}

/// Pick an outcome; no buckets means no decision
pub fn select_outcome(buckets: Option<&Buckets>, random: &dyn RandomSource) -> Option<Outcome> {
    buckets.map(|b| b.select(random))
}
