//! Canonical variables assigned to identifiers by the library.

use quickcheck::{Arbitrary, Gen};
use std::fmt::{self, Display};

/// A canonical name for one dimension of an order. Users never pick these:
/// the order assigns them by monotone successor while identifiers are added.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy, PartialOrd, Ord)]
pub struct VarLabel(u32);

impl VarLabel {
    #[inline]
    pub fn new(v: u32) -> VarLabel {
        VarLabel(v)
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn value_usize(&self) -> usize {
        self.0 as usize
    }

    /// The successor variable, the next one an order hands out.
    #[inline]
    pub fn next(&self) -> VarLabel {
        VarLabel(self.0 + 1)
    }
}

impl Display for VarLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl Arbitrary for VarLabel {
    fn arbitrary(g: &mut Gen) -> VarLabel {
        VarLabel(u32::arbitrary(g) % 16)
    }
}

#[test]
fn successor_is_monotone() {
    let v = VarLabel::new(0);
    assert_eq!(v.next().value(), 1);
    assert_eq!(v.next().next(), VarLabel::new(2));
    assert!(v < v.next());
}
