//! The rewriter: turns fixpoints of sums into per-level saturation forms
//! before evaluation. Rewrites preserve denotational equality (evaluating
//! the rewritten term yields the identical handle) and are memoized per
//! `(homomorphism, order position)`.

use crate::builder::Manager;
use crate::config::Config;
use crate::repr::hom::{HomNode, HomPtr};
use crate::repr::order::Order;
use log::trace;

struct Partition {
    /// Operands that skip the head level and apply strictly below.
    below: Vec<HomPtr>,
    /// Inner homomorphisms of `Local`s on the head identifier.
    locals: Vec<HomPtr>,
    /// Operands that touch the head level itself.
    here: Vec<HomPtr>,
}

impl<C: Config> Manager<C> {
    /// Rewrite `h` into an equivalent form specialized for `order`.
    /// Recognized today: `Fixpoint(Sum(Identity, ..))` and plain `Sum`
    /// become saturation forms, recursively down the spine and into nested
    /// orders.
    pub fn rewrite(&mut self, h: HomPtr, order: &Order<C>) -> HomPtr {
        if order.is_empty() {
            return h;
        }
        let key = (h, order.clone());
        if let Some(&r) = self.rewrites.get(&key) {
            return r;
        }
        let result = self.rewrite_uncached(h, order);
        if result != h {
            trace!("rewrote {} into {}", h, result);
        }
        self.rewrites.insert(key, result);
        result
    }

    fn rewrite_uncached(&mut self, h: HomPtr, order: &Order<C>) -> HomPtr {
        enum Flavor<I> {
            FixpointOfSum(Box<[HomPtr]>),
            Fixpoint(HomPtr),
            Sum(Box<[HomPtr]>),
            Local(I, HomPtr),
            Composition(HomPtr, HomPtr),
            Other,
        }
        let flavor = match self.hom_node(h) {
            HomNode::Fixpoint(inner) => match self.hom_node(*inner) {
                HomNode::Sum(ops) if ops.contains(&HomPtr::IDENTITY) => {
                    Flavor::FixpointOfSum(ops.clone())
                }
                _ => Flavor::Fixpoint(*inner),
            },
            HomNode::Sum(ops) => Flavor::Sum(ops.clone()),
            HomNode::Local { id, hom } => Flavor::Local(id.clone(), *hom),
            HomNode::Composition { left, right } => Flavor::Composition(*left, *right),
            _ => Flavor::Other,
        };
        match flavor {
            Flavor::FixpointOfSum(ops) => self.saturate_fixpoint(&ops, order, h),
            Flavor::Fixpoint(inner) => {
                let rewritten = self.rewrite(inner, order);
                self.fixpoint(rewritten)
            }
            Flavor::Sum(ops) => self.saturate_sum(&ops, order, h),
            Flavor::Local(id, hom) => {
                if order.identifier() == Some(&id) {
                    let rewritten = self.rewrite(hom, &order.nested());
                    self.local(id, order, rewritten)
                } else {
                    h
                }
            }
            Flavor::Composition(left, right) => {
                let l = self.rewrite(left, order);
                let r = self.rewrite(right, order);
                self.composition(l, r)
            }
            Flavor::Other => h,
        }
    }

    /// Split sum operands against the head of `order`. The identity operand
    /// is absorbed when `absorb_identity` (the fixpoint forms embed it) and
    /// kept as a head operand otherwise.
    fn partition(&self, ops: &[HomPtr], order: &Order<C>, absorb_identity: bool) -> Partition {
        let mut part = Partition {
            below: Vec::new(),
            locals: Vec::new(),
            here: Vec::new(),
        };
        for &op in ops {
            if op.is_identity() && absorb_identity {
                continue;
            }
            if let HomNode::Local { id, hom } = self.hom_node(op) {
                if order.identifier() == Some(id) {
                    part.locals.push(*hom);
                    continue;
                }
            }
            if self.skip(op, order) {
                part.below.push(op);
            } else {
                part.here.push(op);
            }
        }
        part
    }

    /// `Fixpoint(Sum(Identity, ops))` → `SaturationFixpoint`: skipped
    /// operands keep saturating below the head inside their own rewritten
    /// fixpoint, locals saturate the nested level, and only the operands
    /// that genuinely touch the head stay in the round loop.
    fn saturate_fixpoint(&mut self, ops: &[HomPtr], order: &Order<C>, h: HomPtr) -> HomPtr {
        let part = self.partition(ops, order, true);
        if part.below.is_empty() && part.locals.is_empty() {
            return h;
        }

        let f = if part.below.is_empty() {
            None
        } else {
            let mut below = part.below;
            below.push(HomPtr::IDENTITY);
            let below_sum = self.sum(order, below);
            let below_fix = self.fixpoint(below_sum);
            Some(self.rewrite(below_fix, &order.next()))
        };

        let l = self.rewrite_locals(part.locals, order, true);
        self.saturation_fixpoint(order.variable(), f, part.here, l)
    }

    /// `Sum(ops)` → `SaturationSum`: the same split, applied once instead of
    /// iterated.
    fn saturate_sum(&mut self, ops: &[HomPtr], order: &Order<C>, h: HomPtr) -> HomPtr {
        let part = self.partition(ops, order, false);
        if part.below.is_empty() && part.locals.is_empty() {
            return h;
        }

        let f = if part.below.is_empty() {
            None
        } else {
            let below_sum = self.sum(order, part.below);
            Some(self.rewrite(below_sum, &order.next()))
        };

        let l = self.rewrite_locals(part.locals, order, false);
        self.saturation_sum(order.variable(), f, part.here, l)
    }

    /// Regroup the local operands of the head identifier into one rewritten
    /// `Local`, a fixpoint one when `saturating`.
    fn rewrite_locals(
        &mut self,
        locals: Vec<HomPtr>,
        order: &Order<C>,
        saturating: bool,
    ) -> Option<HomPtr> {
        if locals.is_empty() {
            return None;
        }
        // Locals only ever match a named head.
        let id = order.identifier().cloned()?;
        let nested_order = order.nested();
        let mut inner_ops = locals;
        if saturating {
            inner_ops.push(HomPtr::IDENTITY);
        }
        let inner_sum = self.sum(order, inner_ops);
        let inner = if saturating {
            self.fixpoint(inner_sum)
        } else {
            inner_sum
        };
        let rewritten = self.rewrite(inner, &nested_order);
        let local = self.local(id, order, rewritten);
        if local.is_identity() {
            None
        } else {
            Some(local)
        }
    }
}
