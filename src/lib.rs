//! Hierarchical set decision diagrams (SDDs) and homomorphisms over them.
//!
//! An SDD is a canonical, maximally shared DAG encoding a set of tuples over
//! ordered identifiers whose domains are either flat value sets or nested
//! SDDs. Homomorphisms are functions on SDDs drawn from a fixed algebra
//! (identity, constant, union, composition, local, inductive, fixpoint, ...);
//! they are the tool for computing, e.g., the reachable state space of a
//! transition system.
//!
//! Three mechanisms make this tractable at scale:
//! - hash-consing of both node algebras, so structural equality is handle
//!   equality ([`backing_store`]);
//! - an LFU-evicting operation cache memoizing every `(operation, input)`
//!   pair ([`cache`]);
//! - a rewriter turning fixpoints of sums into per-level saturation forms
//!   ([`builder`]).

pub mod backing_store;
pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod repr;

pub use builder::{Context, Manager, Options};
pub use config::{Conf64, ConfFlat, Config};
pub use error::{EvaluationError, Step, Top};
pub use repr::hom::{HomKind, HomNode, HomPtr, Inductive, ValuesFn};
pub use repr::order::Order;
pub use repr::sdd::{FlatArc, HierArc, SddNode, SddPtr, TupleEntry};
pub use repr::values::{Bitset64, FlatSet, ValueSet};
pub use repr::var_label::VarLabel;
