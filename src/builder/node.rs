//! The smart constructors for interior SDD nodes. They are the only way
//! interior nodes come to exist, and they establish every canonicity
//! invariant: no `Zero` successor, one arc per successor, pairwise-disjoint
//! labels, arcs sorted by successor handle.

use crate::builder::{Context, Manager};
use crate::config::Config;
use crate::error::EvaluationError;
use crate::repr::sdd::{FlatArc, HierArc, SddNode, SddPtr};
use crate::repr::values::ValueSet;
use crate::repr::var_label::VarLabel;
use rustc_hash::FxHashMap;

impl<C: Config> Manager<C> {
    /// Build the canonical flat node for `var` from an arbitrary arc list.
    /// Overlapping labels are partitioned; the overlap region maps to the
    /// union of the successors involved, which is where the context's SDD
    /// cache comes in. An empty result collapses to `Zero`.
    pub fn make_flat(
        &mut self,
        ctx: &mut Context,
        var: VarLabel,
        arcs: Vec<FlatArc<C::Values>>,
    ) -> Result<SddPtr, EvaluationError> {
        let arcs = arcs
            .into_iter()
            .filter(|arc| !arc.succ.is_zero() && !arc.values.is_empty());
        let grouped = group_flat(arcs);

        // Partition against the already-admitted arcs, which stay pairwise
        // disjoint throughout: an overlap is carved out of both sides and
        // mapped to the union of their successors.
        let mut disjoint: Vec<FlatArc<C::Values>> = Vec::new();
        for arc in grouped {
            let mut rem = arc.values;
            let mut i = 0;
            while i < disjoint.len() && !rem.is_empty() {
                let common = rem.intersection(&disjoint[i].values);
                if common.is_empty() {
                    i += 1;
                    continue;
                }
                let existing = disjoint[i].clone();
                let merged = self.union(ctx, existing.succ, arc.succ)?;
                let existing_rest = existing.values.difference(&common);
                if existing_rest.is_empty() {
                    disjoint[i] = FlatArc {
                        values: common.clone(),
                        succ: merged,
                    };
                    i += 1;
                } else {
                    disjoint[i] = FlatArc {
                        values: existing_rest,
                        succ: existing.succ,
                    };
                    i += 1;
                    // The carved-out region is a subset of an admitted
                    // label, hence already disjoint from every other arc.
                    disjoint.insert(
                        i,
                        FlatArc {
                            values: common.clone(),
                            succ: merged,
                        },
                    );
                    i += 1;
                }
                rem = rem.difference(&common);
            }
            if !rem.is_empty() {
                disjoint.push(FlatArc {
                    values: rem,
                    succ: arc.succ,
                });
            }
        }

        // Merged successors may coincide with other arcs' successors.
        let mut arcs = group_flat(disjoint.into_iter());
        if arcs.is_empty() {
            return Ok(SddPtr::ZERO);
        }
        arcs.sort_by_key(|arc| arc.succ);
        Ok(self.intern_sdd(SddNode::Flat {
            var,
            arcs: arcs.into_boxed_slice(),
        }))
    }

    /// Build the canonical hierarchical node for `var`. Identical to
    /// [`Manager::make_flat`] except that the label algebra is the SDD
    /// algebra itself: nested diagrams are split with intersection and
    /// difference, recursively through the same caches.
    pub fn make_hier(
        &mut self,
        ctx: &mut Context,
        var: VarLabel,
        arcs: Vec<HierArc>,
    ) -> Result<SddPtr, EvaluationError> {
        let arcs: Vec<HierArc> = arcs
            .into_iter()
            .filter(|arc| !arc.succ.is_zero() && !arc.nested.is_zero())
            .collect();
        debug_assert!(
            arcs.iter().all(|arc| !arc.nested.is_one()),
            "a hierarchical arc cannot nest the One terminal"
        );
        let mut grouped: Vec<HierArc> = Vec::new();
        for arc in arcs {
            self.group_hier(ctx, &mut grouped, arc)?;
        }

        let mut disjoint: Vec<HierArc> = Vec::new();
        for arc in grouped {
            let mut rem = arc.nested;
            let mut i = 0;
            while i < disjoint.len() && !rem.is_zero() {
                let common = self.intersection(ctx, rem, disjoint[i].nested)?;
                if common.is_zero() {
                    i += 1;
                    continue;
                }
                let existing = disjoint[i];
                let merged = self.union(ctx, existing.succ, arc.succ)?;
                let existing_rest = self.difference(ctx, existing.nested, common)?;
                if existing_rest.is_zero() {
                    disjoint[i] = HierArc {
                        nested: common,
                        succ: merged,
                    };
                    i += 1;
                } else {
                    disjoint[i] = HierArc {
                        nested: existing_rest,
                        succ: existing.succ,
                    };
                    i += 1;
                    disjoint.insert(
                        i,
                        HierArc {
                            nested: common,
                            succ: merged,
                        },
                    );
                    i += 1;
                }
                rem = self.difference(ctx, rem, common)?;
            }
            if !rem.is_zero() {
                disjoint.push(HierArc {
                    nested: rem,
                    succ: arc.succ,
                });
            }
        }

        let mut arcs: Vec<HierArc> = Vec::new();
        for arc in disjoint {
            self.group_hier(ctx, &mut arcs, arc)?;
        }
        if arcs.is_empty() {
            return Ok(SddPtr::ZERO);
        }
        arcs.sort_by_key(|arc| arc.succ);
        Ok(self.intern_sdd(SddNode::Hier {
            var,
            arcs: arcs.into_boxed_slice(),
        }))
    }

    /// Fold `arc` into `out`, joining nested labels of arcs that share a
    /// successor.
    fn group_hier(
        &mut self,
        ctx: &mut Context,
        out: &mut Vec<HierArc>,
        arc: HierArc,
    ) -> Result<(), EvaluationError> {
        for existing in out.iter_mut() {
            if existing.succ == arc.succ {
                existing.nested = self.union(ctx, existing.nested, arc.nested)?;
                return Ok(());
            }
        }
        out.push(arc);
        Ok(())
    }
}

/// Join the labels of arcs sharing a successor, keeping first-seen order.
fn group_flat<V, I>(arcs: I) -> Vec<FlatArc<V>>
where
    V: ValueSet,
    I: Iterator<Item = FlatArc<V>>,
{
    let mut out: Vec<FlatArc<V>> = Vec::new();
    let mut by_succ: FxHashMap<SddPtr, usize> = FxHashMap::default();
    for arc in arcs {
        match by_succ.get(&arc.succ) {
            Some(&i) => out[i].values = out[i].values.union(&arc.values),
            None => {
                by_succ.insert(arc.succ, out.len());
                out.push(arc);
            }
        }
    }
    out
}
