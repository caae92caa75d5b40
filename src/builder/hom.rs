//! Smart constructors for homomorphisms, and the two predicates evaluation
//! dispatches on. Constructors normalize at build time so that equivalent
//! terms intern to the same handle as often as possible: nested sums are
//! flattened and their locals regrouped, fixpoints collapse, units vanish.

use crate::builder::Manager;
use crate::config::Config;
use crate::repr::hom::{HomNode, HomPtr, Inductive, ValuesFn};
use crate::repr::order::Order;
use crate::repr::sdd::SddPtr;
use crate::repr::var_label::VarLabel;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::rc::Rc;

impl<C: Config> Manager<C> {
    /// The identity homomorphism.
    pub fn identity(&self) -> HomPtr {
        HomPtr::IDENTITY
    }

    /// The homomorphism returning `c` on every input.
    pub fn constant(&mut self, c: SddPtr) -> HomPtr {
        self.intern_hom(HomNode::Constant(c))
    }

    /// Prepend a flat arc: `x ↦ flat(var, [(values, next(x))])`.
    pub fn cons(&mut self, var: VarLabel, values: C::Values, next: HomPtr) -> HomPtr {
        self.intern_hom(HomNode::Cons { var, values, next })
    }

    /// Prepend a hierarchical arc: `x ↦ hier(var, [(nested, next(x))])`.
    pub fn cons_hier(&mut self, var: VarLabel, nested: SddPtr, next: HomPtr) -> HomPtr {
        self.intern_hom(HomNode::ConsHier { var, nested, next })
    }

    /// `left ∘ right`. Identity is a unit on both sides.
    pub fn composition(&mut self, left: HomPtr, right: HomPtr) -> HomPtr {
        if left.is_identity() {
            return right;
        }
        if right.is_identity() {
            return left;
        }
        self.intern_hom(HomNode::Composition { left, right })
    }

    /// The pointwise union of the operands' applications.
    ///
    /// Nested sums are flattened, `Local` operands sharing an identifier are
    /// regrouped into one `Local` over their sum, duplicates collapse, and a
    /// singleton collapses to its sole operand. Operands are kept sorted by
    /// handle, so equal sets intern identically.
    ///
    /// Panics when `ops` is empty.
    pub fn sum<I>(&mut self, order: &Order<C>, ops: I) -> HomPtr
    where
        I: IntoIterator<Item = HomPtr>,
    {
        let mut operands: BTreeSet<HomPtr> = BTreeSet::new();
        let mut locals: FxHashMap<C::Identifier, Vec<HomPtr>> = FxHashMap::default();
        let mut any = false;
        for op in ops {
            any = true;
            self.flatten_sum_operand(op, &mut operands, &mut locals);
        }
        assert!(any, "empty operands at sum construction");

        let mut locals: Vec<(C::Identifier, Vec<HomPtr>)> = locals.into_iter().collect();
        locals.sort_by(|a, b| a.1.cmp(&b.1));
        for (id, inner_ops) in locals {
            let inner = self.sum(order, inner_ops);
            let regrouped = self.local(id, order, inner);
            operands.insert(regrouped);
        }

        let ops: Vec<HomPtr> = operands.into_iter().collect();
        if let [only] = ops.as_slice() {
            return *only;
        }
        self.intern_hom(HomNode::Sum(ops.into_boxed_slice()))
    }

    fn flatten_sum_operand(
        &mut self,
        op: HomPtr,
        operands: &mut BTreeSet<HomPtr>,
        locals: &mut FxHashMap<C::Identifier, Vec<HomPtr>>,
    ) {
        enum Flavor<I> {
            Nested(Box<[HomPtr]>),
            Local(I, HomPtr),
            Plain,
        }
        let flavor = match self.hom_node(op) {
            HomNode::Sum(inner) => Flavor::Nested(inner.clone()),
            HomNode::Local { id, hom } => Flavor::Local(id.clone(), *hom),
            _ => Flavor::Plain,
        };
        match flavor {
            Flavor::Nested(inner) => {
                for &inner_op in inner.iter() {
                    self.flatten_sum_operand(inner_op, operands, locals);
                }
            }
            Flavor::Local(id, hom) => locals.entry(id).or_default().push(hom),
            Flavor::Plain => {
                operands.insert(op);
            }
        }
    }

    /// The pointwise intersection of the operands' applications. Flattened,
    /// deduplicated, sorted; a singleton collapses.
    ///
    /// Panics when `ops` is empty.
    pub fn intersection_hom<I>(&mut self, _order: &Order<C>, ops: I) -> HomPtr
    where
        I: IntoIterator<Item = HomPtr>,
    {
        let mut operands: BTreeSet<HomPtr> = BTreeSet::new();
        for op in ops {
            match self.hom_node(op) {
                HomNode::Intersection(inner) => operands.extend(inner.iter()),
                _ => {
                    operands.insert(op);
                }
            }
        }
        assert!(
            !operands.is_empty(),
            "empty operands at intersection construction"
        );
        let ops: Vec<HomPtr> = operands.into_iter().collect();
        if let [only] = ops.as_slice() {
            return *only;
        }
        self.intern_hom(HomNode::Intersection(ops.into_boxed_slice()))
    }

    /// Apply `hom` to the SDD nested at `id`. `Local` of the identity is the
    /// identity.
    pub fn local(&mut self, id: C::Identifier, order: &Order<C>, hom: HomPtr) -> HomPtr {
        debug_assert!(
            order.is_empty() || order.identifier_variable(&id).is_some(),
            "local over an identifier absent from the order"
        );
        if hom.is_identity() {
            return HomPtr::IDENTITY;
        }
        self.intern_hom(HomNode::Local { id, hom })
    }

    /// Wrap a user-defined per-arc homomorphism.
    pub fn inductive(&mut self, user: Rc<dyn Inductive<C>>) -> HomPtr {
        self.intern_hom(HomNode::Inductive(user))
    }

    /// Iterate `hom` until the result stabilizes. `Fixpoint` is idempotent
    /// at construction, absorbs the identity, and commutes with `Local`.
    pub fn fixpoint(&mut self, hom: HomPtr) -> HomPtr {
        if hom.is_identity() {
            return HomPtr::IDENTITY;
        }
        enum Flavor<I> {
            Already,
            Local(I, HomPtr),
            Plain,
        }
        let flavor = match self.hom_node(hom) {
            HomNode::Fixpoint(_) => Flavor::Already,
            HomNode::Local { id, hom: inner } => Flavor::Local(id.clone(), *inner),
            _ => Flavor::Plain,
        };
        match flavor {
            Flavor::Already => hom,
            Flavor::Local(id, inner) => {
                let inner_fix = self.fixpoint(inner);
                self.intern_hom(HomNode::Local { id, hom: inner_fix })
            }
            Flavor::Plain => self.intern_hom(HomNode::Fixpoint(hom)),
        }
    }

    /// Rewrite the value sets of the flat level at `var` with `f`.
    pub fn values_function(&mut self, var: VarLabel, f: Rc<dyn ValuesFn<C::Values>>) -> HomPtr {
        self.intern_hom(HomNode::ValuesFunction { var, f })
    }

    pub(crate) fn saturation_fixpoint(
        &mut self,
        var: VarLabel,
        f: Option<HomPtr>,
        g: Vec<HomPtr>,
        l: Option<HomPtr>,
    ) -> HomPtr {
        self.intern_hom(HomNode::SaturationFixpoint {
            var,
            f,
            g: g.into_boxed_slice(),
            l,
        })
    }

    pub(crate) fn saturation_sum(
        &mut self,
        var: VarLabel,
        f: Option<HomPtr>,
        g: Vec<HomPtr>,
        l: Option<HomPtr>,
    ) -> HomPtr {
        self.intern_hom(HomNode::SaturationSum {
            var,
            f,
            g: g.into_boxed_slice(),
            l,
        })
    }

    /// Whether applying `h` at the head of `order` can be pushed one level
    /// down unchanged, i.e. `h` does not touch the head variable.
    pub fn skip(&self, h: HomPtr, order: &Order<C>) -> bool {
        if order.is_empty() {
            return false;
        }
        match self.hom_node(h) {
            HomNode::Identity | HomNode::Constant(_) => true,
            HomNode::Cons { var, .. }
            | HomNode::ConsHier { var, .. }
            | HomNode::ValuesFunction { var, .. }
            | HomNode::SaturationFixpoint { var, .. }
            | HomNode::SaturationSum { var, .. } => *var != order.variable(),
            HomNode::Composition { left, right } => {
                self.skip(*left, order) && self.skip(*right, order)
            }
            HomNode::Sum(ops) | HomNode::Intersection(ops) => {
                ops.iter().all(|&op| self.skip(op, order))
            }
            HomNode::Local { id, .. } => order.identifier() != Some(id),
            HomNode::Inductive(u) => u.skip(order.variable()),
            HomNode::Fixpoint(inner) => self.skip(*inner, order),
        }
    }

    /// Whether `h` returns a subset of its input for every input.
    pub fn selector(&self, h: HomPtr) -> bool {
        match self.hom_node(h) {
            HomNode::Identity => true,
            HomNode::Constant(_) | HomNode::Cons { .. } | HomNode::ConsHier { .. } => false,
            HomNode::Composition { left, right } => {
                self.selector(*left) && self.selector(*right)
            }
            HomNode::Sum(ops) | HomNode::Intersection(ops) => {
                ops.iter().all(|&op| self.selector(op))
            }
            HomNode::Local { hom, .. } => self.selector(*hom),
            HomNode::Inductive(u) => u.selector(),
            HomNode::Fixpoint(inner) => self.selector(*inner),
            HomNode::ValuesFunction { f, .. } => f.selector(),
            HomNode::SaturationFixpoint { f, g, l, .. }
            | HomNode::SaturationSum { f, g, l, .. } => {
                f.map_or(true, |h| self.selector(h))
                    && g.iter().all(|&h| self.selector(h))
                    && l.map_or(true, |h| self.selector(h))
            }
        }
    }
}
