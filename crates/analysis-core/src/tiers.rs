//! Declarative breakpoint tables.
//!
//! Each sub-scale is an ordered list of `(bound, score)` tiers. Lookup walks the list
//! and returns the score of the first tier whose bound matches; when none match the
//! table's fallback score is used.

/// Comparison a tier applies to its input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// `x >= threshold`
    AtLeast(f64),
    /// `x > threshold`
    Above(f64),
    /// `x < threshold`
    Below(f64),
    /// `x <= threshold`
    AtMost(f64),
}

impl Bound {
    pub fn matches(&self, x: f64) -> bool {
        match *self {
            Bound::AtLeast(t) => x >= t,
            Bound::Above(t) => x > t,
            Bound::Below(t) => x < t,
            Bound::AtMost(t) => x <= t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub bound: Bound,
    pub score: f64,
}

impl Tier {
    pub const fn at_least(threshold: f64, score: f64) -> Self {
        Self { bound: Bound::AtLeast(threshold), score }
    }

    pub const fn above(threshold: f64, score: f64) -> Self {
        Self { bound: Bound::Above(threshold), score }
    }

    pub const fn below(threshold: f64, score: f64) -> Self {
        Self { bound: Bound::Below(threshold), score }
    }

    pub const fn at_most(threshold: f64, score: f64) -> Self {
        Self { bound: Bound::AtMost(threshold), score }
    }
}

/// Ordered tiers plus the score for inputs no tier claims.
#[derive(Debug, Clone, Copy)]
pub struct TierTable<const N: usize> {
    tiers: [Tier; N],
    fallback: f64,
}

impl<const N: usize> TierTable<N> {
    pub const fn new(tiers: [Tier; N], fallback: f64) -> Self {
        Self { tiers, fallback }
    }

    /// Score of the first matching tier.
    pub fn score(&self, x: f64) -> f64 {
        self.tiers
            .iter()
            .find(|tier| tier.bound.matches(x))
            .map(|tier| tier.score)
            .unwrap_or(self.fallback)
    }

    /// Highest score any input can reach.
    pub fn max_score(&self) -> f64 {
        self.tiers
            .iter()
            .map(|tier| tier.score)
            .fold(self.fallback, f64::max)
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }
}
