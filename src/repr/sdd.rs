//! The internal representation of hierarchical set decision diagram nodes.

use crate::repr::values::ValueSet;
use crate::repr::var_label::VarLabel;
use std::fmt::{self, Display};

/// A handle to a hash-consed SDD node. Handle equality is structural
/// equality: the unique table guarantees equal payloads share one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SddPtr(u32);

impl SddPtr {
    /// The empty set.
    pub const ZERO: SddPtr = SddPtr(0);
    /// The singleton of the empty tuple.
    pub const ONE: SddPtr = SddPtr(1);

    pub(crate) fn new(index: u32) -> SddPtr {
        SddPtr(index)
    }

    pub(crate) fn index(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == SddPtr::ZERO
    }

    pub fn is_one(&self) -> bool {
        *self == SddPtr::ONE
    }

    pub fn is_terminal(&self) -> bool {
        self.0 <= 1
    }
}

impl Display for SddPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SddPtr::ZERO => write!(f, "⊥"),
            SddPtr::ONE => write!(f, "⊤"),
            SddPtr(i) => write!(f, "n{}", i),
        }
    }
}

/// An arc of a flat node: a non-empty value set and its successor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlatArc<V> {
    pub values: V,
    pub succ: SddPtr,
}

/// An arc of a hierarchical node: a non-terminal nested SDD and its
/// successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HierArc {
    pub nested: SddPtr,
    pub succ: SddPtr,
}

/// An SDD node. Interior nodes satisfy the canonicity invariants enforced by
/// the smart constructors: no `Zero` successor, pairwise-disjoint labels,
/// distinct successors, arcs sorted by successor handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SddNode<V> {
    Zero,
    One,
    Flat {
        var: VarLabel,
        arcs: Box<[FlatArc<V>]>,
    },
    Hier {
        var: VarLabel,
        arcs: Box<[HierArc]>,
    },
}

impl<V: ValueSet> SddNode<V> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SddNode::Zero | SddNode::One)
    }

    /// The variable of an interior node.
    ///
    /// Panics on a terminal.
    pub fn var(&self) -> VarLabel {
        match self {
            SddNode::Flat { var, .. } | SddNode::Hier { var, .. } => *var,
            _ => panic!("called var() on a terminal node"),
        }
    }

    /// Number of arcs; terminals have none.
    pub fn num_arcs(&self) -> usize {
        match self {
            SddNode::Flat { arcs, .. } => arcs.len(),
            SddNode::Hier { arcs, .. } => arcs.len(),
            _ => 0,
        }
    }
}

/// One component of a tuple yielded by [`crate::Manager::tuples`]: either a
/// value of a flat level or the tuple of a nested level.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TupleEntry {
    Value(u32),
    Nested(Vec<TupleEntry>),
}

impl Display for TupleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TupleEntry::Value(v) => write!(f, "{}", v),
            TupleEntry::Nested(entries) => {
                write!(f, "[")?;
                for (i, e) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
        }
    }
}
