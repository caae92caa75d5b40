//! The manager owning the hash-consed node universes, the evaluation
//! context owning the operation caches, and everything built on top of them:
//! smart constructors, SDD operations, homomorphism evaluation, and the
//! saturation rewriter.

pub mod eval;
pub mod hom;
pub mod node;
pub mod ops;
pub mod rewrite;

use crate::backing_store::UniqueTable;
use crate::cache::{Cache, CacheStatistics};
use crate::config::Config;
use crate::error::EvaluationError;
use crate::repr::hom::{HomNode, HomPtr};
use crate::repr::order::Order;
use crate::repr::sdd::{FlatArc, HierArc, SddNode, SddPtr, TupleEntry};
use crate::repr::values::ValueSet;
use bit_set::BitSet;
use log::debug;
use self::eval::{CachedHom, HOM_CACHE_FILTERS};
use self::ops::SddOp;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The recognized configuration options of a [`Context`].
#[derive(Debug, Clone)]
pub struct Options {
    /// Capacity of the SDD-operation cache.
    pub initial_sdd_cache_size: usize,
    /// Capacity of the homomorphism evaluation cache.
    pub initial_hom_cache_size: usize,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            initial_sdd_cache_size: 1 << 18,
            initial_hom_cache_size: 1 << 17,
        }
    }
}

/// An evaluation context: the two operation caches plus the cooperative
/// interrupt token. Contexts are disposable; dropping one discards its
/// memoized results but never touches the unique tables.
pub struct Context {
    pub(crate) sdd_cache: Cache<SddOp>,
    pub(crate) hom_cache: Cache<CachedHom>,
    interrupt: Arc<AtomicBool>,
}

impl Context {
    pub fn new(options: &Options) -> Context {
        Context {
            sdd_cache: Cache::new("sdd operation cache", options.initial_sdd_cache_size),
            hom_cache: Cache::with_filters(
                "homomorphism cache",
                options.initial_hom_cache_size,
                &HOM_CACHE_FILTERS,
            ),
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The token evaluation polls before descending. Setting it to `true`
    /// makes the running evaluation fail with an interrupted error at its
    /// next check point.
    pub fn interrupt_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub(crate) fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Discard all memoized results, keeping statistics.
    pub fn clear(&mut self) {
        self.sdd_cache.clear();
        self.hom_cache.clear();
    }

    pub fn sdd_cache_statistics(&self) -> &CacheStatistics {
        self.sdd_cache.statistics()
    }

    pub fn hom_cache_statistics(&self) -> &CacheStatistics {
        self.hom_cache.statistics()
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new(&Options::default())
    }
}

/// The owner of both hash-consed node universes. All node construction,
/// operations and evaluation go through it; handles are only meaningful
/// against the manager that minted them.
pub struct Manager<C: Config> {
    sdd_tbl: UniqueTable<SddNode<C::Values>>,
    hom_tbl: UniqueTable<HomNode<C>>,
    /// Memoized rewrites, keyed by homomorphism and order position. The key
    /// keeps the order spine alive so positions cannot be recycled.
    pub(crate) rewrites: FxHashMap<(HomPtr, Order<C>), HomPtr>,
}

impl<C: Config> Manager<C> {
    pub fn new() -> Manager<C> {
        let mut man = Manager {
            sdd_tbl: UniqueTable::new(),
            hom_tbl: UniqueTable::new(),
            rewrites: FxHashMap::default(),
        };
        // Terminals and the identity occupy fixed slots.
        let zero = man.sdd_tbl.get_or_insert(SddNode::Zero);
        let one = man.sdd_tbl.get_or_insert(SddNode::One);
        let id = man.hom_tbl.get_or_insert(HomNode::Identity);
        debug_assert_eq!(zero, SddPtr::ZERO.index());
        debug_assert_eq!(one, SddPtr::ONE.index());
        debug_assert_eq!(id, HomPtr::IDENTITY.index());
        man
    }

    /// A fresh context sized by the default [`Options`].
    pub fn initial_context(&self) -> Context {
        Context::default()
    }

    pub fn zero(&self) -> SddPtr {
        SddPtr::ZERO
    }

    pub fn one(&self) -> SddPtr {
        SddPtr::ONE
    }

    /// The node behind a handle.
    pub fn sdd_node(&self, x: SddPtr) -> &SddNode<C::Values> {
        self.sdd_tbl.get(x.index())
    }

    /// The homomorphism node behind a handle.
    pub fn hom_node(&self, h: HomPtr) -> &HomNode<C> {
        self.hom_tbl.get(h.index())
    }

    pub(crate) fn intern_sdd(&mut self, node: SddNode<C::Values>) -> SddPtr {
        SddPtr::new(self.sdd_tbl.get_or_insert(node))
    }

    pub(crate) fn intern_hom(&mut self, node: HomNode<C>) -> HomPtr {
        HomPtr::new(self.hom_tbl.get_or_insert(node))
    }

    /// Live SDD nodes, terminals included.
    pub fn num_sdd_nodes(&self) -> usize {
        self.sdd_tbl.len()
    }

    /// Live homomorphism nodes, identity included.
    pub fn num_hom_nodes(&self) -> usize {
        self.hom_tbl.len()
    }

    /// Build the SDD of one cube: each flat identifier of `order` maps to
    /// the value set `f` gives it, hierarchical levels recurse through their
    /// nested order. Returns `Zero` as soon as any value set is empty.
    pub fn sdd_from_order<F>(
        &mut self,
        ctx: &mut Context,
        order: &Order<C>,
        f: &F,
    ) -> Result<SddPtr, EvaluationError>
    where
        F: Fn(&C::Identifier) -> C::Values,
    {
        if order.is_empty() {
            return Ok(SddPtr::ONE);
        }
        let succ = self.sdd_from_order(ctx, &order.next(), f)?;
        let var = order.variable();
        let nested_order = order.nested();
        if !nested_order.is_empty() {
            let nested = self.sdd_from_order(ctx, &nested_order, f)?;
            self.make_hier(ctx, var, vec![HierArc { nested, succ }])
        } else {
            let id = match order.identifier() {
                Some(id) => id.clone(),
                None => panic!("cannot build an SDD through an artificial order node"),
            };
            self.make_flat(
                ctx,
                var,
                vec![FlatArc {
                    values: f(&id),
                    succ,
                }],
            )
        }
    }

    /// The number of distinct interior nodes reachable from `x`.
    pub fn size(&self, x: SddPtr) -> usize {
        let mut seen: FxHashSet<SddPtr> = FxHashSet::default();
        let mut stack = vec![x];
        while let Some(p) = stack.pop() {
            if p.is_terminal() || !seen.insert(p) {
                continue;
            }
            match self.sdd_node(p) {
                SddNode::Flat { arcs, .. } => {
                    for arc in arcs.iter() {
                        stack.push(arc.succ);
                    }
                }
                SddNode::Hier { arcs, .. } => {
                    for arc in arcs.iter() {
                        stack.push(arc.nested);
                        stack.push(arc.succ);
                    }
                }
                _ => {}
            }
        }
        seen.len()
    }

    /// The number of tuples `x` encodes.
    pub fn count_tuples(&self, x: SddPtr) -> u128 {
        fn count<C: Config>(
            man: &Manager<C>,
            x: SddPtr,
            memo: &mut FxHashMap<SddPtr, u128>,
        ) -> u128 {
            if let Some(&n) = memo.get(&x) {
                return n;
            }
            let n = match man.sdd_node(x) {
                SddNode::Zero => 0,
                SddNode::One => 1,
                SddNode::Flat { arcs, .. } => arcs
                    .iter()
                    .map(|arc| arc.values.len() as u128 * count(man, arc.succ, memo))
                    .sum(),
                SddNode::Hier { arcs, .. } => arcs
                    .iter()
                    .map(|arc| count(man, arc.nested, memo) * count(man, arc.succ, memo))
                    .sum(),
            };
            memo.insert(x, n);
            n
        }
        count(self, x, &mut FxHashMap::default())
    }

    /// A lazy iterator over every tuple `x` encodes. Restartable: each call
    /// starts a fresh traversal.
    pub fn tuples(&self, x: SddPtr) -> Box<dyn Iterator<Item = Vec<TupleEntry>> + '_> {
        match self.sdd_node(x) {
            SddNode::Zero => Box::new(std::iter::empty()),
            SddNode::One => Box::new(std::iter::once(Vec::new())),
            SddNode::Flat { arcs, .. } => Box::new(arcs.iter().flat_map(move |arc| {
                arc.values.iter().flat_map(move |v| {
                    self.tuples(arc.succ).map(move |mut rest| {
                        rest.insert(0, TupleEntry::Value(v));
                        rest
                    })
                })
            })),
            SddNode::Hier { arcs, .. } => Box::new(arcs.iter().flat_map(move |arc| {
                self.tuples(arc.nested).flat_map(move |prefix| {
                    self.tuples(arc.succ).map(move |mut rest| {
                        rest.insert(0, TupleEntry::Nested(prefix.clone()));
                        rest
                    })
                })
            })),
        }
    }

    /// A `Display` adapter listing the tuples of `x`. Debugging only: the
    /// listing is exponential in the diagram size.
    pub fn fmt_sdd(&self, x: SddPtr) -> SddDisplay<'_, C> {
        SddDisplay { man: self, x }
    }

    /// Reclaim every node unreachable from the given roots. Homomorphism
    /// roots also pin the SDDs they embed (constants, hierarchical cons).
    /// Both caches and the rewrite memo are discarded, since their entries
    /// may name freed slots. Collection only ever happens here.
    pub fn collect(
        &mut self,
        ctx: &mut Context,
        sdd_roots: &[SddPtr],
        hom_roots: &[HomPtr],
    ) {
        let mut sdd_marks = BitSet::with_capacity(self.sdd_tbl.capacity());
        let mut hom_marks = BitSet::with_capacity(self.hom_tbl.capacity());
        let mut sdd_stack: Vec<SddPtr> = sdd_roots.to_vec();
        let mut hom_stack: Vec<HomPtr> = hom_roots.to_vec();

        hom_marks.insert(HomPtr::IDENTITY.index() as usize);
        while let Some(h) = hom_stack.pop() {
            if !hom_marks.insert(h.index() as usize) {
                continue;
            }
            match self.hom_node(h) {
                HomNode::Identity => {}
                HomNode::Constant(c) => sdd_stack.push(*c),
                HomNode::Cons { next, .. } => hom_stack.push(*next),
                HomNode::ConsHier { nested, next, .. } => {
                    sdd_stack.push(*nested);
                    hom_stack.push(*next);
                }
                HomNode::Composition { left, right } => {
                    hom_stack.push(*left);
                    hom_stack.push(*right);
                }
                HomNode::Sum(ops) | HomNode::Intersection(ops) => hom_stack.extend(ops.iter()),
                HomNode::Local { hom, .. } => hom_stack.push(*hom),
                HomNode::Inductive(_) | HomNode::ValuesFunction { .. } => {}
                HomNode::Fixpoint(inner) => hom_stack.push(*inner),
                HomNode::SaturationFixpoint { f, g, l, .. }
                | HomNode::SaturationSum { f, g, l, .. } => {
                    hom_stack.extend(f.iter());
                    hom_stack.extend(g.iter());
                    hom_stack.extend(l.iter());
                }
            }
        }

        sdd_marks.insert(SddPtr::ZERO.index() as usize);
        sdd_marks.insert(SddPtr::ONE.index() as usize);
        while let Some(x) = sdd_stack.pop() {
            if !sdd_marks.insert(x.index() as usize) {
                continue;
            }
            match self.sdd_node(x) {
                SddNode::Flat { arcs, .. } => {
                    for arc in arcs.iter() {
                        sdd_stack.push(arc.succ);
                    }
                }
                SddNode::Hier { arcs, .. } => {
                    for arc in arcs.iter() {
                        sdd_stack.push(arc.nested);
                        sdd_stack.push(arc.succ);
                    }
                }
                _ => {}
            }
        }

        let mut freed_sdds = 0;
        for i in 0..self.sdd_tbl.capacity() as u32 {
            if self.sdd_tbl.is_live(i) && !sdd_marks.contains(i as usize) {
                self.sdd_tbl.remove(i);
                freed_sdds += 1;
            }
        }
        let mut freed_homs = 0;
        for i in 0..self.hom_tbl.capacity() as u32 {
            if self.hom_tbl.is_live(i) && !hom_marks.contains(i as usize) {
                self.hom_tbl.remove(i);
                freed_homs += 1;
            }
        }

        // Cached results and memoized rewrites may name freed slots.
        ctx.clear();
        self.rewrites.clear();
        debug!(
            "collected {} SDD nodes and {} homomorphisms",
            freed_sdds, freed_homs
        );
    }
}

impl<C: Config> Default for Manager<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Displays an SDD as its tuple listing.
pub struct SddDisplay<'a, C: Config> {
    man: &'a Manager<C>,
    x: SddPtr,
}

impl<C: Config> Display for SddDisplay<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, tuple) in self.man.tuples(self.x).enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " <")?;
            for (j, entry) in tuple.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", entry)?;
            }
            write!(f, ">")?;
        }
        write!(f, " }}")
    }
}
