//! Outstanding demand between a subscriber and its upstream.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// The number of further values a subscriber is willing to receive.
///
/// Demand is cumulative: every request adds to what is already outstanding.
/// `Max(0)` means "send nothing right now" and is not terminal, a later
/// request can raise it again.
///
/// Arithmetic saturates in both directions. Adding anything to `Unlimited`
/// stays `Unlimited`, adding finite demands saturates at `usize::MAX`, and
/// subtraction never leaves a finite demand below zero:
///
/// ```
/// # use backflow::Demand;
/// assert_eq!(Demand::max(2) + Demand::max(3), Demand::max(5));
/// assert_eq!(Demand::max(2) + Demand::unlimited(), Demand::unlimited());
/// assert_eq!(Demand::max(2) - 5, Demand::none());
/// assert_eq!(Demand::unlimited() - 5, Demand::unlimited());
/// assert!(Demand::unlimited() > Demand::max(usize::MAX));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Demand {
    /// A finite number of values.
    Max(usize),
    /// No limit on the number of values.
    Unlimited,
}

impl Demand {
    /// No demand at all.
    pub const fn none() -> Demand {
        Demand::Max(0)
    }

    /// Unbounded demand.
    pub const fn unlimited() -> Demand {
        Demand::Unlimited
    }

    /// A finite demand of `n` values.
    pub const fn max(n: usize) -> Demand {
        Demand::Max(n)
    }

    /// Whether no value may be sent.
    pub const fn is_zero(&self) -> bool {
        matches!(self, Demand::Max(0))
    }

    /// Whether the demand has no limit.
    pub const fn is_unlimited(&self) -> bool {
        matches!(self, Demand::Unlimited)
    }

    /// The finite bound, or `None` for unlimited demand.
    pub const fn limit(&self) -> Option<usize> {
        match *self {
            Demand::Max(n) => Some(n),
            Demand::Unlimited => None,
        }
    }

    /// Take one unit of demand, if any is left.
    ///
    /// Returns whether a value may be sent.
    pub fn consume(&mut self) -> bool {
        match *self {
            Demand::Unlimited => true,
            Demand::Max(0) => false,
            Demand::Max(n) => {
                *self = Demand::Max(n - 1);
                true
            }
        }
    }
}

impl Default for Demand {
    fn default() -> Demand {
        Demand::none()
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Demand::Max(n) => write!(f, "max({})", n),
            Demand::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl Add for Demand {
    type Output = Demand;

    fn add(self, rhs: Demand) -> Demand {
        match (self, rhs) {
            (Demand::Max(a), Demand::Max(b)) => Demand::Max(a.saturating_add(b)),
            _ => Demand::Unlimited,
        }
    }
}

impl Add<usize> for Demand {
    type Output = Demand;

    fn add(self, rhs: usize) -> Demand {
        self + Demand::Max(rhs)
    }
}

impl Sub for Demand {
    type Output = Demand;

    fn sub(self, rhs: Demand) -> Demand {
        match (self, rhs) {
            (Demand::Unlimited, _) => Demand::Unlimited,
            (Demand::Max(_), Demand::Unlimited) => Demand::Max(0),
            (Demand::Max(a), Demand::Max(b)) => Demand::Max(a.saturating_sub(b)),
        }
    }
}

impl Sub<usize> for Demand {
    type Output = Demand;

    fn sub(self, rhs: usize) -> Demand {
        self - Demand::Max(rhs)
    }
}

impl AddAssign for Demand {
    fn add_assign(&mut self, rhs: Demand) {
        *self = *self + rhs;
    }
}

impl AddAssign<usize> for Demand {
    fn add_assign(&mut self, rhs: usize) {
        *self = *self + rhs;
    }
}

impl SubAssign for Demand {
    fn sub_assign(&mut self, rhs: Demand) {
        *self = *self - rhs;
    }
}

impl SubAssign<usize> for Demand {
    fn sub_assign(&mut self, rhs: usize) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for Demand {
    fn arbitrary(g: &mut quickcheck::Gen) -> Demand {
        if u8::arbitrary(g) % 5 == 0 {
            Demand::Unlimited
        } else {
            Demand::Max(usize::arbitrary(g))
        }
    }
}

#[cfg(test)]
mod test {
    use quickcheck::quickcheck;

    use super::*;

    #[test]
    fn requests_accumulate() {
        let mut demand = Demand::none();
        demand += Demand::max(2);
        demand += 3;
        assert_eq!(demand, Demand::max(5));
        demand += Demand::unlimited();
        assert_eq!(demand, Demand::unlimited());
        demand += Demand::max(7);
        assert_eq!(demand, Demand::unlimited());
    }

    #[test]
    fn addition_saturates() {
        assert_eq!(Demand::max(usize::MAX) + 1, Demand::max(usize::MAX));
    }

    #[test]
    fn subtraction_clamps_at_zero() {
        assert_eq!(Demand::max(3) - 1, Demand::max(2));
        assert_eq!(Demand::max(3) - 10, Demand::none());
        assert_eq!(Demand::max(3) - Demand::unlimited(), Demand::none());
        assert_eq!(Demand::unlimited() - Demand::max(3), Demand::unlimited());
    }

    #[test]
    fn consume() {
        let mut demand = Demand::max(1);
        assert!(demand.consume());
        assert!(!demand.consume());
        assert!(demand.is_zero());

        let mut demand = Demand::unlimited();
        assert!(demand.consume());
        assert!(demand.is_unlimited());
    }

    #[test]
    fn ordering() {
        assert!(Demand::max(3) < Demand::max(4));
        assert!(Demand::max(usize::MAX) < Demand::unlimited());
        assert_eq!(Demand::max(2).limit(), Some(2));
        assert_eq!(Demand::unlimited().limit(), None);
    }

    #[test]
    fn display() {
        assert_eq!(Demand::max(4).to_string(), "max(4)");
        assert_eq!(Demand::unlimited().to_string(), "unlimited");
    }

    #[test]
    fn addition_commutes() {
        fn check(a: Demand, b: Demand) -> bool {
            a + b == b + a
        }
        quickcheck(check as fn(Demand, Demand) -> bool);
    }

    #[test]
    fn addition_is_monotone() {
        fn check(a: Demand, b: Demand) -> bool {
            a + b >= a && a + b >= b
        }
        quickcheck(check as fn(Demand, Demand) -> bool);
    }

    #[test]
    fn subtraction_never_grows() {
        fn check(a: Demand, b: Demand) -> bool {
            a - b <= a
        }
        quickcheck(check as fn(Demand, Demand) -> bool);
    }

    #[test]
    fn unlimited_absorbs() {
        fn check(a: Demand) -> bool {
            (a + Demand::unlimited()).is_unlimited() && (Demand::unlimited() - a).is_unlimited()
        }
        quickcheck(check as fn(Demand) -> bool);
    }
}
