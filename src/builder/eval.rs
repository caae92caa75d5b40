//! The homomorphism evaluator. Dispatch is a single match on the node tag;
//! every non-trivial application is memoized through the context's
//! homomorphism cache, keyed by `(homomorphism, input)`.

use crate::builder::{Context, Manager};
use crate::cache::CachedOperation;
use crate::config::Config;
use crate::error::{EvaluationError, Step, Top};
use crate::repr::hom::{HomKind, HomNode, HomPtr};
use crate::repr::order::Order;
use crate::repr::sdd::{FlatArc, HierArc, SddNode, SddPtr};
use log::trace;

/// The key of the homomorphism cache: one application of `hom` to `sdd`.
/// The variant tag rides along so the cache filter can reject operations
/// cheaper than the lookup itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CachedHom {
    pub hom: HomPtr,
    pub kind: HomKind,
    pub sdd: SddPtr,
}

impl CachedOperation for CachedHom {
    type Output = SddPtr;

    fn step(&self) -> Step {
        Step::Hom {
            hom: self.hom,
            sdd: self.sdd,
        }
    }
}

/// Identity and constant applications resolve in O(1); caching them would
/// cost more than evaluating them.
pub(crate) static HOM_CACHE_FILTERS: [fn(&CachedHom) -> bool; 1] =
    [|op| !matches!(op.kind, HomKind::Identity | HomKind::Constant)];

impl<C: Config> Manager<C> {
    /// Apply the homomorphism `h` to `x` under `order`.
    ///
    /// `order` must be the order position `x` lives at; nested levels are
    /// reached through `Local`, never through the spine.
    pub fn apply(
        &mut self,
        ctx: &mut Context,
        h: HomPtr,
        order: &Order<C>,
        x: SddPtr,
    ) -> Result<SddPtr, EvaluationError> {
        if x.is_zero() {
            return Ok(SddPtr::ZERO);
        }
        if h.is_identity() {
            return Ok(x);
        }
        if ctx.interrupted() {
            return Err(EvaluationError::interrupted());
        }
        let op = CachedHom {
            hom: h,
            kind: self.hom_node(h).kind(),
            sdd: x,
        };
        if !ctx.hom_cache.is_cacheable(&op) {
            return match self.dispatch(ctx, h, order, x) {
                Ok(r) => {
                    ctx.hom_cache.note_filtered();
                    Ok(r)
                }
                Err(mut e) => {
                    e.push_step(op.step());
                    Err(e)
                }
            };
        }
        if let Some(r) = ctx.hom_cache.get(&op) {
            return Ok(r);
        }
        match self.dispatch(ctx, h, order, x) {
            Ok(r) => {
                ctx.hom_cache.insert(op, r);
                Ok(r)
            }
            Err(mut e) => {
                e.push_step(op.step());
                Err(e)
            }
        }
    }

    fn dispatch(
        &mut self,
        ctx: &mut Context,
        h: HomPtr,
        order: &Order<C>,
        x: SddPtr,
    ) -> Result<SddPtr, EvaluationError> {
        // A skipped homomorphism is pushed one level down by rebuilding the
        // node around the transformed successors.
        if !x.is_one() && self.skip(h, order) {
            return self.descend(ctx, h, order, x);
        }
        match self.hom_node(h).clone() {
            HomNode::Identity => Ok(x),
            HomNode::Constant(c) => Ok(c),
            HomNode::Cons { var, values, next } => {
                let succ = self.apply(ctx, next, &order.next(), x)?;
                self.make_flat(ctx, var, vec![FlatArc { values, succ }])
            }
            HomNode::ConsHier { var, nested, next } => {
                let succ = self.apply(ctx, next, &order.next(), x)?;
                self.make_hier(ctx, var, vec![HierArc { nested, succ }])
            }
            HomNode::Composition { left, right } => {
                let inner = self.apply(ctx, right, order, x)?;
                self.apply(ctx, left, order, inner)
            }
            HomNode::Sum(ops) => {
                let mut results = Vec::with_capacity(ops.len());
                for &op in ops.iter() {
                    results.push(self.apply(ctx, op, order, x)?);
                }
                self.union_all(ctx, results)
            }
            HomNode::Intersection(ops) => {
                let mut acc = self.apply(ctx, ops[0], order, x)?;
                for &op in ops[1..].iter() {
                    let r = self.apply(ctx, op, order, x)?;
                    acc = self.intersection(ctx, acc, r)?;
                }
                Ok(acc)
            }
            HomNode::Local { hom, .. } => match self.sdd_node(x).clone() {
                SddNode::One => Ok(SddPtr::ONE),
                SddNode::Hier { var, arcs } => {
                    let nested_order = order.nested();
                    let mut new_arcs = Vec::with_capacity(arcs.len());
                    for arc in arcs.iter() {
                        let nested = self.apply(ctx, hom, &nested_order, arc.nested)?;
                        new_arcs.push(HierArc {
                            nested,
                            succ: arc.succ,
                        });
                    }
                    self.make_hier(ctx, var, new_arcs)
                }
                _ => Err(EvaluationError::top(Top { lhs: x, rhs: x })),
            },
            HomNode::Inductive(user) => match self.sdd_node(x).clone() {
                SddNode::One => Ok(user.on_one(self)),
                // The homomorphism the user returns for an arc is applied to
                // the successor at the *current* position: it usually is a
                // `Cons` rebuilding this very level around its continuation.
                SddNode::Flat { var, arcs } => {
                    let mut acc = SddPtr::ZERO;
                    for arc in arcs.iter() {
                        let next_hom = user.on_flat(self, var, &arc.values);
                        let r = self.apply(ctx, next_hom, order, arc.succ)?;
                        acc = self.union(ctx, acc, r)?;
                    }
                    Ok(acc)
                }
                SddNode::Hier { var, arcs } => {
                    let mut acc = SddPtr::ZERO;
                    for arc in arcs.iter() {
                        let next_hom = user.on_hier(self, var, arc.nested);
                        let r = self.apply(ctx, next_hom, order, arc.succ)?;
                        acc = self.union(ctx, acc, r)?;
                    }
                    Ok(acc)
                }
                SddNode::Zero => Ok(SddPtr::ZERO),
            },
            HomNode::Fixpoint(inner) => {
                let mut cur = x;
                let mut rounds = 0usize;
                loop {
                    if ctx.interrupted() {
                        return Err(EvaluationError::interrupted());
                    }
                    let next = self.apply(ctx, inner, order, cur)?;
                    rounds += 1;
                    if next == cur {
                        trace!("fixpoint of {} stabilized after {} rounds", inner, rounds);
                        return Ok(cur);
                    }
                    cur = next;
                }
            }
            HomNode::ValuesFunction { var, f } => match self.sdd_node(x).clone() {
                SddNode::One => Ok(SddPtr::ONE),
                SddNode::Flat { var: node_var, arcs } if node_var == var => {
                    let mut new_arcs = Vec::with_capacity(arcs.len());
                    for arc in arcs.iter() {
                        new_arcs.push(FlatArc {
                            values: f.apply(&arc.values),
                            succ: arc.succ,
                        });
                    }
                    self.make_flat(ctx, var, new_arcs)
                }
                _ => Err(EvaluationError::top(Top { lhs: x, rhs: x })),
            },
            HomNode::SaturationFixpoint { f, g, l, .. } => {
                let mut cur = x;
                loop {
                    if ctx.interrupted() {
                        return Err(EvaluationError::interrupted());
                    }
                    let prev = cur;
                    // F and L embed the identity, so they only ever grow the
                    // set; the G operands are joined in explicitly.
                    if let Some(fh) = f {
                        cur = self.apply(ctx, fh, order, cur)?;
                    }
                    if let Some(lh) = l {
                        cur = self.apply(ctx, lh, order, cur)?;
                    }
                    for &gh in g.iter() {
                        let r = self.apply(ctx, gh, order, cur)?;
                        cur = self.union(ctx, cur, r)?;
                    }
                    if cur == prev {
                        return Ok(cur);
                    }
                }
            }
            HomNode::SaturationSum { f, g, l, .. } => {
                let mut acc = SddPtr::ZERO;
                if let Some(fh) = f {
                    let r = self.apply(ctx, fh, order, x)?;
                    acc = self.union(ctx, acc, r)?;
                }
                if let Some(lh) = l {
                    let r = self.apply(ctx, lh, order, x)?;
                    acc = self.union(ctx, acc, r)?;
                }
                for &gh in g.iter() {
                    let r = self.apply(ctx, gh, order, x)?;
                    acc = self.union(ctx, acc, r)?;
                }
                Ok(acc)
            }
        }
    }

    /// Rebuild `x` with `h` applied to every successor at the next level.
    fn descend(
        &mut self,
        ctx: &mut Context,
        h: HomPtr,
        order: &Order<C>,
        x: SddPtr,
    ) -> Result<SddPtr, EvaluationError> {
        let next_order = order.next();
        match self.sdd_node(x).clone() {
            SddNode::Flat { var, arcs } => {
                let mut new_arcs = Vec::with_capacity(arcs.len());
                for arc in arcs.iter() {
                    let succ = self.apply(ctx, h, &next_order, arc.succ)?;
                    new_arcs.push(FlatArc {
                        values: arc.values.clone(),
                        succ,
                    });
                }
                self.make_flat(ctx, var, new_arcs)
            }
            SddNode::Hier { var, arcs } => {
                let mut new_arcs = Vec::with_capacity(arcs.len());
                for arc in arcs.iter() {
                    let succ = self.apply(ctx, h, &next_order, arc.succ)?;
                    new_arcs.push(HierArc {
                        nested: arc.nested,
                        succ,
                    });
                }
                self.make_hier(ctx, var, new_arcs)
            }
            SddNode::Zero | SddNode::One => unreachable!("skip descent on a terminal"),
        }
    }
}
