//! Extent: the non-negative quantity of a property an agent holds

use serde::{Deserialize, Serialize};

/// Quantity of a property held by one agent: a count, a balance in minor
/// units, or a unit indicator for indivisible property.
///
/// Non-negative by construction.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Extent(pub u64);

impl Extent {
    /// The unit value used for indivisible property.
    pub const UNIT: Extent = Extent(1);

    /// Extent of `value` units
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The empty extent; never stored in a registry
    pub fn zero() -> Self {
        Self(0)
    }

    /// Raw unit count
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `None` on overflow
    pub fn checked_add(self, other: Extent) -> Option<Extent> {
        self.0.checked_add(other.0).map(Extent)
    }

    /// `None` if `other` exceeds `self`
    pub fn checked_sub(self, other: Extent) -> Option<Extent> {
        self.0.checked_sub(other.0).map(Extent)
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Extent {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
