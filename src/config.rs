//! The configuration bundle a manager is monomorphized over, and the two
//! stock configurations.

use crate::repr::values::{Bitset64, FlatSet, ValueSet};
use crate::repr::var_label::VarLabel;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Everything the library is parameterized over: the user-facing identifier
/// type, the value-set representation, and the seed of the canonical
/// variable sequence. The whole node universe is monomorphized per
/// configuration; two configurations never share a unique table.
pub trait Config: 'static {
    type Identifier: Clone + Eq + Hash + Debug + Display;
    type Values: ValueSet;

    /// The first variable an empty order hands out.
    fn first_variable() -> VarLabel {
        VarLabel::new(0)
    }
}

/// String identifiers over 64-bit bitset values: the cheap configuration for
/// domains of at most 64 values per flat level.
#[derive(Debug)]
pub struct Conf64;

impl Config for Conf64 {
    type Identifier = String;
    type Values = Bitset64;
}

/// String identifiers over sorted flat sets: the general configuration for
/// unbounded value domains.
#[derive(Debug)]
pub struct ConfFlat;

impl Config for ConfFlat {
    type Identifier = String;
    type Values = FlatSet;
}
