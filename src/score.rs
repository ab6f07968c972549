//! Two-level score used to compare route plans.
//!
//! The hard level measures feasibility and always dominates the soft level,
//! so ordering is lexicographic on `(hard, soft)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// A score with a hard (feasibility) and a soft (quality) level.
///
/// # Examples
///
/// ```
/// use dial_a_ride::score::HardSoftScore;
///
/// let infeasible = HardSoftScore::of(-1, 1_000_000);
/// let feasible = HardSoftScore::of(0, -5);
///
/// // Any hard violation loses against any soft value
/// assert!(feasible > infeasible);
/// assert!(feasible.is_feasible());
/// assert_eq!(infeasible.to_string(), "-1hard/1000000soft");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HardSoftScore {
    hard: i64,
    soft: i64,
}

impl HardSoftScore {
    pub const ZERO: Self = Self::of(0, 0);
    pub const ONE_HARD: Self = Self::of(1, 0);
    pub const ONE_SOFT: Self = Self::of(0, 1);

    /// Creates a score from both levels.
    pub const fn of(hard: i64, soft: i64) -> Self {
        Self { hard, soft }
    }

    /// Creates a score with only a hard component.
    pub const fn of_hard(hard: i64) -> Self {
        Self::of(hard, 0)
    }

    /// Creates a score with only a soft component.
    pub const fn of_soft(soft: i64) -> Self {
        Self::of(0, soft)
    }

    #[inline]
    pub fn hard(&self) -> i64 {
        self.hard
    }

    #[inline]
    pub fn soft(&self) -> i64 {
        self.soft
    }

    /// Returns true when no hard constraint is broken.
    #[inline]
    pub fn is_feasible(&self) -> bool {
        self.hard >= 0
    }

    /// Scales both levels by `factor`.
    ///
    /// ```
    /// use dial_a_ride::score::HardSoftScore;
    ///
    /// assert_eq!(HardSoftScore::ONE_HARD.multiply(-3), HardSoftScore::of_hard(-3));
    /// ```
    #[inline]
    pub fn multiply(self, factor: i64) -> Self {
        Self::of(self.hard * factor, self.soft * factor)
    }
}

impl Add for HardSoftScore {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::of(self.hard + rhs.hard, self.soft + rhs.soft)
    }
}

impl AddAssign for HardSoftScore {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for HardSoftScore {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::of(self.hard - rhs.hard, self.soft - rhs.soft)
    }
}

impl SubAssign for HardSoftScore {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for HardSoftScore {
    type Output = Self;

    fn neg(self) -> Self {
        Self::of(-self.hard, -self.soft)
    }
}

impl Sum for HardSoftScore {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for HardSoftScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}hard/{}soft", self.hard, self.soft)
    }
}

/// Error returned when a score string is not of the form `"<h>hard/<s>soft"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid score {0:?}, expected \"<hard>hard/<soft>soft\"")]
pub struct ParseScoreError(String);

impl FromStr for HardSoftScore {
    type Err = ParseScoreError;

    /// ```
    /// use dial_a_ride::score::HardSoftScore;
    ///
    /// let score: HardSoftScore = "-500hard/42soft".parse().unwrap();
    /// assert_eq!(score, HardSoftScore::of(-500, 42));
    /// assert!("500".parse::<HardSoftScore>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseScoreError(s.to_string());
        let (hard, soft) = s.trim().split_once('/').ok_or_else(err)?;
        let hard = hard.strip_suffix("hard").ok_or_else(err)?;
        let soft = soft.strip_suffix("soft").ok_or_else(err)?;
        Ok(Self::of(
            hard.parse().map_err(|_| err())?,
            soft.parse().map_err(|_| err())?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_dominates_soft() {
        let mut scores = vec![
            HardSoftScore::of(0, -10),
            HardSoftScore::of(-1, 100),
            HardSoftScore::of(0, 5),
            HardSoftScore::of(-100_000, 0),
        ];
        scores.sort();
        assert_eq!(
            scores,
            vec![
                HardSoftScore::of(-100_000, 0),
                HardSoftScore::of(-1, 100),
                HardSoftScore::of(0, -10),
                HardSoftScore::of(0, 5),
            ]
        );
    }

    #[test]
    fn test_arithmetic() {
        let a = HardSoftScore::of(-2, 7);
        let b = HardSoftScore::of(-3, -1);
        assert_eq!(a + b, HardSoftScore::of(-5, 6));
        assert_eq!(a - b, HardSoftScore::of(1, 8));
        assert_eq!(-a, HardSoftScore::of(2, -7));
        assert_eq!(vec![a, b, a].into_iter().sum::<HardSoftScore>(), HardSoftScore::of(-7, 13));
    }

    #[test]
    fn test_display_parse() {
        let score = HardSoftScore::of(-100_500, 1234);
        assert_eq!(score.to_string().parse::<HardSoftScore>(), Ok(score));
        assert!("1hard".parse::<HardSoftScore>().is_err());
        assert!("xhard/0soft".parse::<HardSoftScore>().is_err());
    }
}
