//! Outstanding demand accounting.
//!
//! Demand is the permission a subscriber grants a producer to emit. Finite
//! demand is decremented by every emission; unbounded demand never is.

/// Request amount that asks for an unbounded number of elements.
pub const UNBOUNDED: u64 = u64::MAX;

/// Outstanding demand granted by a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Demand {
    /// Finite demand with the remaining count.
    Finite(u64),
    /// Unbounded demand.
    Unbounded,
}

impl Demand {
    /// No demand.
    pub const NONE: Demand = Demand::Finite(0);

    /// Interpret a raw request amount, treating [`UNBOUNDED`] as unbounded.
    #[must_use]
    pub const fn from_request(n: u64) -> Self {
        if n == UNBOUNDED {
            Self::Unbounded
        } else {
            Self::Finite(n)
        }
    }

    /// Returns `true` if the demand is unbounded.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool { matches!(self, Self::Unbounded) }

    /// Returns `true` if at least one element may be emitted.
    #[must_use]
    pub const fn has_demand(&self) -> bool {
        matches!(self, Self::Unbounded) || matches!(self, Self::Finite(remaining) if *remaining > 0)
    }

    /// Returns the remaining finite demand, if any.
    #[must_use]
    pub const fn remaining(&self) -> Option<u64> {
        match self {
            Self::Finite(value) => Some(*value),
            Self::Unbounded => None,
        }
    }

    /// Raw request amount equivalent to this demand.
    #[must_use]
    pub const fn as_request(&self) -> u64 {
        match self {
            Self::Finite(value) => *value,
            Self::Unbounded => UNBOUNDED,
        }
    }

    /// Add `n` units, saturating to [`Demand::Unbounded`] on overflow.
    #[must_use]
    pub const fn add(self, n: u64) -> Self {
        match self {
            Self::Unbounded => Self::Unbounded,
            Self::Finite(current) => match current.checked_add(n) {
                Some(total) if total != UNBOUNDED => Self::Finite(total),
                _ => Self::Unbounded,
            },
        }
    }

    /// Consume a single unit when available.
    #[must_use]
    pub fn consume_one(&mut self) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Finite(value) if *value > 0 => {
                *value -= 1;
                true
            }
            Self::Finite(_) => false,
        }
    }

    /// Take the whole demand, leaving [`Demand::NONE`] behind.
    #[must_use]
    pub fn take(&mut self) -> Self { std::mem::replace(self, Self::NONE) }
}

impl Default for Demand {
    fn default() -> Self { Self::NONE }
}

/// Countdown over a block of demand handed to a producer.
///
/// Yields once per unit for finite demand and forever for unbounded demand.
#[derive(Debug)]
pub(crate) struct Units {
    remaining: Demand,
}

impl Units {
    pub(crate) fn new(demand: Demand) -> Self { Self { remaining: demand } }
}

impl Iterator for Units {
    type Item = ();

    fn next(&mut self) -> Option<()> { self.remaining.consume_one().then_some(()) }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::zero(0, Demand::Finite(0))]
    #[case::finite(4, Demand::Finite(4))]
    #[case::unbounded(UNBOUNDED, Demand::Unbounded)]
    fn from_request_maps_sentinel(#[case] n: u64, #[case] expected: Demand) {
        assert_eq!(Demand::from_request(n), expected);
    }

    #[test]
    fn add_saturates_to_unbounded() {
        let demand = Demand::Finite(u64::MAX - 2).add(5);
        assert_eq!(demand, Demand::Unbounded);
        assert_eq!(Demand::Unbounded.add(1), Demand::Unbounded);
    }

    #[test]
    fn consume_one_never_goes_negative() {
        let mut demand = Demand::Finite(1);
        assert!(demand.consume_one());
        assert!(!demand.consume_one());
        assert_eq!(demand, Demand::NONE);
    }

    #[test]
    fn unbounded_is_never_decremented() {
        let mut demand = Demand::Unbounded;
        for _ in 0..1_000 {
            assert!(demand.consume_one());
        }
        assert!(demand.is_unbounded());
    }

    #[test]
    fn take_leaves_nothing() {
        let mut demand = Demand::Finite(3);
        assert_eq!(demand.take(), Demand::Finite(3));
        assert!(!demand.has_demand());
    }

    #[test]
    fn units_counts_finite_demand() {
        assert_eq!(Units::new(Demand::Finite(3)).count(), 3);
        assert_eq!(Units::new(Demand::Unbounded).take(10).count(), 10);
    }

    proptest! {
        #[test]
        fn accumulated_requests_bound_consumption(requests in proptest::collection::vec(1u64..64, 0..16)) {
            let mut demand = Demand::NONE;
            let mut granted = 0u64;
            for n in &requests {
                demand = demand.add(*n);
                granted += n;
            }
            let mut consumed = 0u64;
            while demand.consume_one() {
                consumed += 1;
            }
            prop_assert_eq!(consumed, granted);
        }
    }
}
