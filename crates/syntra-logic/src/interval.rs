//! Time intervals constraining the temporal operators.
//!
//! An interval has an integer bound on each side, each of which may be weak
//! (closed), strict (open) or infinite. The default interval is unbounded on
//! both sides.

use std::fmt;

use syntra_automata::Endpoint;

/// The kind of an interval bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BoundKind {
    /// The bound is included (closed)
    Weak,
    /// The bound is excluded (open)
    Strict,
    /// There is no bound on this side
    #[default]
    Infinite,
}

/// A non-empty interval over non-negative time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TimeInterval {
    lower: Endpoint,
    lower_kind: BoundKind,
    upper: Endpoint,
    upper_kind: BoundKind,
}

impl TimeInterval {
    /// The unbounded interval `(∞, ∞)`
    pub fn unbounded() -> Self {
        TimeInterval::default()
    }

    /// A closed interval `[lower, upper]`
    pub fn new(lower: Endpoint, upper: Endpoint) -> Self {
        TimeInterval {
            lower,
            lower_kind: BoundKind::Weak,
            upper,
            upper_kind: BoundKind::Weak,
        }
    }

    /// An interval with explicit bound kinds
    pub fn new_with_bounds(
        lower: Endpoint,
        lower_kind: BoundKind,
        upper: Endpoint,
        upper_kind: BoundKind,
    ) -> Self {
        TimeInterval {
            lower,
            lower_kind,
            upper,
            upper_kind,
        }
    }

    /// Get the lower bound; meaningless if the lower bound kind is infinite
    pub fn lower(&self) -> Endpoint {
        self.lower
    }

    /// Get the upper bound; meaningless if the upper bound kind is infinite
    pub fn upper(&self) -> Endpoint {
        self.upper
    }

    /// Get the kind of the lower bound
    pub fn lower_kind(&self) -> BoundKind {
        self.lower_kind
    }

    /// Get the kind of the upper bound
    pub fn upper_kind(&self) -> BoundKind {
        self.upper_kind
    }

    /// Check whether the interval contains the given value
    pub fn contains(&self, value: f64) -> bool {
        let fits_lower = match self.lower_kind {
            BoundKind::Infinite => true,
            BoundKind::Weak => value >= f64::from(self.lower),
            BoundKind::Strict => value > f64::from(self.lower),
        };
        let fits_upper = match self.upper_kind {
            BoundKind::Infinite => true,
            BoundKind::Weak => value <= f64::from(self.upper),
            BoundKind::Strict => value < f64::from(self.upper),
        };
        fits_lower && fits_upper
    }

    /// Check whether the interval is empty
    pub fn is_empty(&self) -> bool {
        if self.lower_kind == BoundKind::Infinite || self.upper_kind == BoundKind::Infinite {
            return false;
        }
        self.lower > self.upper
            || (self.lower == self.upper
                && (self.lower_kind == BoundKind::Strict || self.upper_kind == BoundKind::Strict))
    }

    /// The largest finite constant appearing in the bounds
    pub fn largest_constant(&self) -> Option<Endpoint> {
        [
            (self.lower_kind != BoundKind::Infinite).then_some(self.lower),
            (self.upper_kind != BoundKind::Infinite).then_some(self.upper),
        ]
        .into_iter()
        .flatten()
        .max()
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lower_kind == BoundKind::Infinite && self.upper_kind == BoundKind::Infinite {
            return Ok(());
        }
        match self.lower_kind {
            BoundKind::Weak => write!(f, "[{}", self.lower)?,
            BoundKind::Strict => write!(f, "({}", self.lower)?,
            BoundKind::Infinite => write!(f, "(∞")?,
        }
        write!(f, ", ")?;
        match self.upper_kind {
            BoundKind::Weak => write!(f, "{}]", self.upper),
            BoundKind::Strict => write!(f, "{})", self.upper),
            BoundKind::Infinite => write!(f, "∞)"),
        }
    }
}
