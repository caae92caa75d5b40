//! The three SDD binary operations: union, intersection, difference. Each
//! resolves its terminal cases directly, then co-traverses both arc lists
//! through the SDD operation cache, combining labels with the values algebra
//! on flat nodes and with the SDD algebra itself on hierarchical ones.

use crate::builder::{Context, Manager};
use crate::cache::CachedOperation;
use crate::config::Config;
use crate::error::{EvaluationError, Step, Top};
use crate::repr::sdd::{FlatArc, HierArc, SddNode, SddPtr};
use crate::repr::values::ValueSet;
use crate::repr::var_label::VarLabel;

/// A cacheable SDD operation. Union and intersection are keyed with sorted
/// operands; difference is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SddOp {
    Union(SddPtr, SddPtr),
    Inter(SddPtr, SddPtr),
    Diff(SddPtr, SddPtr),
}

impl CachedOperation for SddOp {
    type Output = SddPtr;

    fn step(&self) -> Step {
        Step::SddOp(*self)
    }
}

impl<C: Config> Manager<C> {
    /// The union of the sets `a` and `b` encode.
    pub fn union(
        &mut self,
        ctx: &mut Context,
        a: SddPtr,
        b: SddPtr,
    ) -> Result<SddPtr, EvaluationError> {
        if a == b {
            return Ok(a);
        }
        if a.is_zero() {
            return Ok(b);
        }
        if b.is_zero() {
            return Ok(a);
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        self.cached_sdd_op(ctx, SddOp::Union(a, b))
    }

    /// The intersection of the sets `a` and `b` encode.
    pub fn intersection(
        &mut self,
        ctx: &mut Context,
        a: SddPtr,
        b: SddPtr,
    ) -> Result<SddPtr, EvaluationError> {
        if a == b {
            return Ok(a);
        }
        if a.is_zero() || b.is_zero() {
            return Ok(SddPtr::ZERO);
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        self.cached_sdd_op(ctx, SddOp::Inter(a, b))
    }

    /// The set `a` encodes minus the set `b` encodes.
    pub fn difference(
        &mut self,
        ctx: &mut Context,
        a: SddPtr,
        b: SddPtr,
    ) -> Result<SddPtr, EvaluationError> {
        if a == b || a.is_zero() {
            return Ok(SddPtr::ZERO);
        }
        if b.is_zero() {
            return Ok(a);
        }
        self.cached_sdd_op(ctx, SddOp::Diff(a, b))
    }

    /// Union of arbitrarily many operands, folded through the cached binary
    /// operation.
    pub fn union_all<I>(&mut self, ctx: &mut Context, items: I) -> Result<SddPtr, EvaluationError>
    where
        I: IntoIterator<Item = SddPtr>,
    {
        let mut acc = SddPtr::ZERO;
        for x in items {
            acc = self.union(ctx, acc, x)?;
        }
        Ok(acc)
    }

    fn cached_sdd_op(&mut self, ctx: &mut Context, op: SddOp) -> Result<SddPtr, EvaluationError> {
        if !ctx.sdd_cache.is_cacheable(&op) {
            return match self.compute_sdd_op(ctx, op) {
                Ok(r) => {
                    ctx.sdd_cache.note_filtered();
                    Ok(r)
                }
                Err(mut e) => {
                    e.push_step(op.step());
                    Err(e)
                }
            };
        }
        if let Some(r) = ctx.sdd_cache.get(&op) {
            return Ok(r);
        }
        match self.compute_sdd_op(ctx, op) {
            Ok(r) => {
                ctx.sdd_cache.insert(op, r);
                Ok(r)
            }
            Err(mut e) => {
                e.push_step(op.step());
                Err(e)
            }
        }
    }

    fn compute_sdd_op(&mut self, ctx: &mut Context, op: SddOp) -> Result<SddPtr, EvaluationError> {
        let (a, b) = match op {
            SddOp::Union(a, b) | SddOp::Inter(a, b) | SddOp::Diff(a, b) => (a, b),
        };
        // Zero and equal operands never reach the cache; a One operand
        // against an interior node is a level clash like any other mismatch.
        match (self.sdd_node(a).clone(), self.sdd_node(b).clone()) {
            (SddNode::Flat { var: va, arcs: aa }, SddNode::Flat { var: vb, arcs: ab })
                if va == vb =>
            {
                match op {
                    SddOp::Union(..) => self.flat_union(ctx, va, &aa, &ab),
                    SddOp::Inter(..) => self.flat_intersection(ctx, va, &aa, &ab),
                    SddOp::Diff(..) => self.flat_difference(ctx, va, &aa, &ab),
                }
            }
            (SddNode::Hier { var: va, arcs: aa }, SddNode::Hier { var: vb, arcs: ab })
                if va == vb =>
            {
                match op {
                    SddOp::Union(..) => self.hier_union(ctx, va, &aa, &ab),
                    SddOp::Inter(..) => self.hier_intersection(ctx, va, &aa, &ab),
                    SddOp::Diff(..) => self.hier_difference(ctx, va, &aa, &ab),
                }
            }
            _ => Err(EvaluationError::top(Top { lhs: a, rhs: b })),
        }
    }

    fn flat_union(
        &mut self,
        ctx: &mut Context,
        var: VarLabel,
        aa: &[FlatArc<C::Values>],
        ab: &[FlatArc<C::Values>],
    ) -> Result<SddPtr, EvaluationError> {
        let mut parts: Vec<FlatArc<C::Values>> = Vec::new();
        let mut b_arcs: Vec<FlatArc<C::Values>> = ab.to_vec();
        for arc_a in aa {
            let mut rem = arc_a.values.clone();
            for arc_b in b_arcs.iter_mut() {
                if rem.is_empty() {
                    break;
                }
                let common = rem.intersection(&arc_b.values);
                if common.is_empty() {
                    continue;
                }
                let succ = self.union(ctx, arc_a.succ, arc_b.succ)?;
                rem = rem.difference(&common);
                arc_b.values = arc_b.values.difference(&common);
                parts.push(FlatArc {
                    values: common,
                    succ,
                });
            }
            if !rem.is_empty() {
                parts.push(FlatArc {
                    values: rem,
                    succ: arc_a.succ,
                });
            }
        }
        for arc_b in b_arcs {
            if !arc_b.values.is_empty() {
                parts.push(arc_b);
            }
        }
        self.make_flat(ctx, var, parts)
    }

    fn flat_intersection(
        &mut self,
        ctx: &mut Context,
        var: VarLabel,
        aa: &[FlatArc<C::Values>],
        ab: &[FlatArc<C::Values>],
    ) -> Result<SddPtr, EvaluationError> {
        let mut parts: Vec<FlatArc<C::Values>> = Vec::new();
        for arc_a in aa {
            for arc_b in ab {
                let common = arc_a.values.intersection(&arc_b.values);
                if common.is_empty() {
                    continue;
                }
                let succ = self.intersection(ctx, arc_a.succ, arc_b.succ)?;
                parts.push(FlatArc {
                    values: common,
                    succ,
                });
            }
        }
        self.make_flat(ctx, var, parts)
    }

    fn flat_difference(
        &mut self,
        ctx: &mut Context,
        var: VarLabel,
        aa: &[FlatArc<C::Values>],
        ab: &[FlatArc<C::Values>],
    ) -> Result<SddPtr, EvaluationError> {
        let mut parts: Vec<FlatArc<C::Values>> = Vec::new();
        for arc_a in aa {
            let mut rem = arc_a.values.clone();
            for arc_b in ab {
                if rem.is_empty() {
                    break;
                }
                let common = rem.intersection(&arc_b.values);
                if common.is_empty() {
                    continue;
                }
                let succ = self.difference(ctx, arc_a.succ, arc_b.succ)?;
                rem = rem.difference(&common);
                parts.push(FlatArc {
                    values: common,
                    succ,
                });
            }
            if !rem.is_empty() {
                parts.push(FlatArc {
                    values: rem,
                    succ: arc_a.succ,
                });
            }
        }
        self.make_flat(ctx, var, parts)
    }

    fn hier_union(
        &mut self,
        ctx: &mut Context,
        var: VarLabel,
        aa: &[HierArc],
        ab: &[HierArc],
    ) -> Result<SddPtr, EvaluationError> {
        let mut parts: Vec<HierArc> = Vec::new();
        let mut b_arcs: Vec<HierArc> = ab.to_vec();
        for arc_a in aa {
            let mut rem = arc_a.nested;
            for arc_b in b_arcs.iter_mut() {
                if rem.is_zero() {
                    break;
                }
                let common = self.intersection(ctx, rem, arc_b.nested)?;
                if common.is_zero() {
                    continue;
                }
                let succ = self.union(ctx, arc_a.succ, arc_b.succ)?;
                rem = self.difference(ctx, rem, common)?;
                arc_b.nested = self.difference(ctx, arc_b.nested, common)?;
                parts.push(HierArc {
                    nested: common,
                    succ,
                });
            }
            if !rem.is_zero() {
                parts.push(HierArc {
                    nested: rem,
                    succ: arc_a.succ,
                });
            }
        }
        for arc_b in b_arcs {
            if !arc_b.nested.is_zero() {
                parts.push(arc_b);
            }
        }
        self.make_hier(ctx, var, parts)
    }

    fn hier_intersection(
        &mut self,
        ctx: &mut Context,
        var: VarLabel,
        aa: &[HierArc],
        ab: &[HierArc],
    ) -> Result<SddPtr, EvaluationError> {
        let mut parts: Vec<HierArc> = Vec::new();
        for arc_a in aa {
            for arc_b in ab {
                let common = self.intersection(ctx, arc_a.nested, arc_b.nested)?;
                if common.is_zero() {
                    continue;
                }
                let succ = self.intersection(ctx, arc_a.succ, arc_b.succ)?;
                parts.push(HierArc {
                    nested: common,
                    succ,
                });
            }
        }
        self.make_hier(ctx, var, parts)
    }

    fn hier_difference(
        &mut self,
        ctx: &mut Context,
        var: VarLabel,
        aa: &[HierArc],
        ab: &[HierArc],
    ) -> Result<SddPtr, EvaluationError> {
        let mut parts: Vec<HierArc> = Vec::new();
        for arc_a in aa {
            let mut rem = arc_a.nested;
            for arc_b in ab {
                if rem.is_zero() {
                    break;
                }
                let common = self.intersection(ctx, rem, arc_b.nested)?;
                if common.is_zero() {
                    continue;
                }
                let succ = self.difference(ctx, arc_a.succ, arc_b.succ)?;
                rem = self.difference(ctx, rem, common)?;
                parts.push(HierArc {
                    nested: common,
                    succ,
                });
            }
            if !rem.is_zero() {
                parts.push(HierArc {
                    nested: rem,
                    succ: arc_a.succ,
                });
            }
        }
        self.make_hier(ctx, var, parts)
    }
}
