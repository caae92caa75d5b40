//! The internal representation of homomorphism nodes.
//!
//! Homomorphisms are hash-consed exactly like SDD nodes, so every variant
//! must be hashable and comparable, including the ones wrapping user
//! behavior. User callables supply their own equality and hash through
//! `eq_dyn`/`hash_dyn`, mirroring how the original wraps user homomorphisms
//! behind a virtual base.

use crate::builder::Manager;
use crate::config::Config;
use crate::repr::sdd::SddPtr;
use crate::repr::var_label::VarLabel;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::discriminant;
use std::rc::Rc;

/// A handle to a hash-consed homomorphism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HomPtr(u32);

impl HomPtr {
    /// The identity homomorphism, seeded at a fixed slot.
    pub const IDENTITY: HomPtr = HomPtr(0);

    pub(crate) fn new(index: u32) -> HomPtr {
        HomPtr(index)
    }

    pub(crate) fn index(&self) -> u32 {
        self.0
    }

    pub fn is_identity(&self) -> bool {
        *self == HomPtr::IDENTITY
    }
}

impl fmt::Display for HomPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// A user-defined per-arc homomorphism. For every arc of the node it is
/// applied to, the callable decides which homomorphism to apply to the arc's
/// successor; the results are joined by union.
///
/// `eq_dyn` and `hash_dyn` must agree: two callables comparing equal must
/// hash equal, otherwise hash-consing breaks.
pub trait Inductive<C: Config>: fmt::Debug + 'static {
    /// Whether this callable ignores `var` entirely, letting evaluation push
    /// it one level down unchanged.
    fn skip(&self, var: VarLabel) -> bool;

    /// Whether every application returns a subset of its input.
    fn selector(&self) -> bool {
        false
    }

    /// The homomorphism to apply to the successor of a flat arc.
    fn on_flat(&self, man: &mut Manager<C>, var: VarLabel, values: &C::Values) -> HomPtr;

    /// The homomorphism to apply to the successor of a hierarchical arc.
    fn on_hier(&self, man: &mut Manager<C>, var: VarLabel, nested: SddPtr) -> HomPtr;

    /// The terminal case: the result on the `One` SDD.
    fn on_one(&self, man: &mut Manager<C>) -> SddPtr;

    fn eq_dyn(&self, other: &dyn Any) -> bool;
    fn hash_dyn(&self) -> u64;
    fn as_any(&self) -> &dyn Any;
}

/// A user-defined transformation of the value sets of one flat variable.
pub trait ValuesFn<V>: fmt::Debug + 'static {
    fn apply(&self, values: &V) -> V;

    /// Whether the function always returns a subset of its input.
    fn selector(&self) -> bool {
        false
    }

    fn eq_dyn(&self, other: &dyn Any) -> bool;
    fn hash_dyn(&self) -> u64;
    fn as_any(&self) -> &dyn Any;
}

/// Discriminates homomorphism variants without touching their payload. Part
/// of the cache key so cache filters can reject trivial operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HomKind {
    Identity,
    Constant,
    Cons,
    ConsHier,
    Composition,
    Sum,
    Intersection,
    Local,
    Inductive,
    Fixpoint,
    ValuesFunction,
    SaturationFixpoint,
    SaturationSum,
}

/// A homomorphism node. Operand runs of the variable-arity variants live in
/// one boxed slice, keeping the node a single allocation.
pub enum HomNode<C: Config> {
    Identity,
    /// Returns its captured SDD regardless of input.
    Constant(SddPtr),
    /// Prepends a flat arc `(values, next(x))` at `var`.
    Cons {
        var: VarLabel,
        values: C::Values,
        next: HomPtr,
    },
    /// Prepends a hierarchical arc `(nested, next(x))` at `var`.
    ConsHier {
        var: VarLabel,
        nested: SddPtr,
        next: HomPtr,
    },
    /// `left ∘ right`.
    Composition { left: HomPtr, right: HomPtr },
    /// Pointwise union of the applications; a canonical sorted set, size ≥ 2.
    Sum(Box<[HomPtr]>),
    /// Pointwise intersection of the applications; canonical, size ≥ 2.
    Intersection(Box<[HomPtr]>),
    /// Applies `hom` to the SDD nested at `id`.
    Local { id: C::Identifier, hom: HomPtr },
    Inductive(Rc<dyn Inductive<C>>),
    /// Iterates `hom` until the result handle stabilizes.
    Fixpoint(HomPtr),
    /// Rewrites the value sets of the flat node at `var`.
    ValuesFunction {
        var: VarLabel,
        f: Rc<dyn ValuesFn<C::Values>>,
    },
    /// Normalized form of `Fixpoint(Sum(..))`, produced by the rewriter:
    /// `f` saturates strictly below `var`, `l` saturates the nested level,
    /// `g` are the operands that touch `var` itself.
    SaturationFixpoint {
        var: VarLabel,
        f: Option<HomPtr>,
        g: Box<[HomPtr]>,
        l: Option<HomPtr>,
    },
    /// Normalized form of `Sum(..)`, split the same way but applied once.
    SaturationSum {
        var: VarLabel,
        f: Option<HomPtr>,
        g: Box<[HomPtr]>,
        l: Option<HomPtr>,
    },
}

impl<C: Config> HomNode<C> {
    pub fn kind(&self) -> HomKind {
        match self {
            HomNode::Identity => HomKind::Identity,
            HomNode::Constant(_) => HomKind::Constant,
            HomNode::Cons { .. } => HomKind::Cons,
            HomNode::ConsHier { .. } => HomKind::ConsHier,
            HomNode::Composition { .. } => HomKind::Composition,
            HomNode::Sum(_) => HomKind::Sum,
            HomNode::Intersection(_) => HomKind::Intersection,
            HomNode::Local { .. } => HomKind::Local,
            HomNode::Inductive(_) => HomKind::Inductive,
            HomNode::Fixpoint(_) => HomKind::Fixpoint,
            HomNode::ValuesFunction { .. } => HomKind::ValuesFunction,
            HomNode::SaturationFixpoint { .. } => HomKind::SaturationFixpoint,
            HomNode::SaturationSum { .. } => HomKind::SaturationSum,
        }
    }
}

impl<C: Config> Clone for HomNode<C> {
    fn clone(&self) -> Self {
        match self {
            HomNode::Identity => HomNode::Identity,
            HomNode::Constant(c) => HomNode::Constant(*c),
            HomNode::Cons { var, values, next } => HomNode::Cons {
                var: *var,
                values: values.clone(),
                next: *next,
            },
            HomNode::ConsHier { var, nested, next } => HomNode::ConsHier {
                var: *var,
                nested: *nested,
                next: *next,
            },
            HomNode::Composition { left, right } => HomNode::Composition {
                left: *left,
                right: *right,
            },
            HomNode::Sum(ops) => HomNode::Sum(ops.clone()),
            HomNode::Intersection(ops) => HomNode::Intersection(ops.clone()),
            HomNode::Local { id, hom } => HomNode::Local {
                id: id.clone(),
                hom: *hom,
            },
            HomNode::Inductive(u) => HomNode::Inductive(Rc::clone(u)),
            HomNode::Fixpoint(h) => HomNode::Fixpoint(*h),
            HomNode::ValuesFunction { var, f } => HomNode::ValuesFunction {
                var: *var,
                f: Rc::clone(f),
            },
            HomNode::SaturationFixpoint { var, f, g, l } => HomNode::SaturationFixpoint {
                var: *var,
                f: *f,
                g: g.clone(),
                l: *l,
            },
            HomNode::SaturationSum { var, f, g, l } => HomNode::SaturationSum {
                var: *var,
                f: *f,
                g: g.clone(),
                l: *l,
            },
        }
    }
}

impl<C: Config> PartialEq for HomNode<C> {
    fn eq(&self, other: &Self) -> bool {
        use HomNode::*;
        match (self, other) {
            (Identity, Identity) => true,
            (Constant(a), Constant(b)) => a == b,
            (
                Cons {
                    var: v1,
                    values: s1,
                    next: n1,
                },
                Cons {
                    var: v2,
                    values: s2,
                    next: n2,
                },
            ) => v1 == v2 && n1 == n2 && s1 == s2,
            (
                ConsHier {
                    var: v1,
                    nested: s1,
                    next: n1,
                },
                ConsHier {
                    var: v2,
                    nested: s2,
                    next: n2,
                },
            ) => v1 == v2 && s1 == s2 && n1 == n2,
            (
                Composition {
                    left: l1,
                    right: r1,
                },
                Composition {
                    left: l2,
                    right: r2,
                },
            ) => l1 == l2 && r1 == r2,
            (Sum(a), Sum(b)) => a == b,
            (Intersection(a), Intersection(b)) => a == b,
            (Local { id: i1, hom: h1 }, Local { id: i2, hom: h2 }) => i1 == i2 && h1 == h2,
            (Inductive(a), Inductive(b)) => Rc::ptr_eq(a, b) || a.eq_dyn(b.as_any()),
            (Fixpoint(a), Fixpoint(b)) => a == b,
            (ValuesFunction { var: v1, f: f1 }, ValuesFunction { var: v2, f: f2 }) => {
                v1 == v2 && (Rc::ptr_eq(f1, f2) || f1.eq_dyn(f2.as_any()))
            }
            (
                SaturationFixpoint {
                    var: v1,
                    f: f1,
                    g: g1,
                    l: l1,
                },
                SaturationFixpoint {
                    var: v2,
                    f: f2,
                    g: g2,
                    l: l2,
                },
            ) => v1 == v2 && f1 == f2 && g1 == g2 && l1 == l2,
            (
                SaturationSum {
                    var: v1,
                    f: f1,
                    g: g1,
                    l: l1,
                },
                SaturationSum {
                    var: v2,
                    f: f2,
                    g: g2,
                    l: l2,
                },
            ) => v1 == v2 && f1 == f2 && g1 == g2 && l1 == l2,
            _ => false,
        }
    }
}

impl<C: Config> Eq for HomNode<C> {}

impl<C: Config> Hash for HomNode<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
        match self {
            HomNode::Identity => {}
            HomNode::Constant(c) => c.hash(state),
            HomNode::Cons { var, values, next } => {
                var.hash(state);
                values.hash(state);
                next.hash(state);
            }
            HomNode::ConsHier { var, nested, next } => {
                var.hash(state);
                nested.hash(state);
                next.hash(state);
            }
            HomNode::Composition { left, right } => {
                left.hash(state);
                right.hash(state);
            }
            HomNode::Sum(ops) => ops.hash(state),
            HomNode::Intersection(ops) => ops.hash(state),
            HomNode::Local { id, hom } => {
                id.hash(state);
                hom.hash(state);
            }
            HomNode::Inductive(u) => state.write_u64(u.hash_dyn()),
            HomNode::Fixpoint(h) => h.hash(state),
            HomNode::ValuesFunction { var, f } => {
                var.hash(state);
                state.write_u64(f.hash_dyn());
            }
            HomNode::SaturationFixpoint { var, f, g, l }
            | HomNode::SaturationSum { var, f, g, l } => {
                var.hash(state);
                f.hash(state);
                g.hash(state);
                l.hash(state);
            }
        }
    }
}

impl<C: Config> fmt::Debug for HomNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomNode::Identity => write!(f, "Identity"),
            HomNode::Constant(c) => write!(f, "Constant({})", c),
            HomNode::Cons { var, values, next } => {
                write!(f, "Cons({}, {:?}, {})", var, values, next)
            }
            HomNode::ConsHier { var, nested, next } => {
                write!(f, "ConsHier({}, {}, {})", var, nested, next)
            }
            HomNode::Composition { left, right } => write!(f, "({} ∘ {})", left, right),
            HomNode::Sum(ops) => write!(f, "Sum{:?}", ops),
            HomNode::Intersection(ops) => write!(f, "Intersection{:?}", ops),
            HomNode::Local { id, hom } => write!(f, "Local({:?}, {})", id, hom),
            HomNode::Inductive(u) => write!(f, "Inductive({:?})", u),
            HomNode::Fixpoint(h) => write!(f, "({})*", h),
            HomNode::ValuesFunction { var, f: func } => {
                write!(f, "ValuesFunction({}, {:?})", var, func)
            }
            HomNode::SaturationFixpoint { var, f: ff, g, l } => {
                write!(f, "SatFixpoint({}, {:?}, {:?}, {:?})", var, ff, g, l)
            }
            HomNode::SaturationSum { var, f: ff, g, l } => {
                write!(f, "SatSum({}, {:?}, {:?}, {:?})", var, ff, g, l)
            }
        }
    }
}
