//! The bounded operation cache shared by the SDD operations and the
//! homomorphism evaluator. Memoizing every `(operation, input)` pair is what
//! turns the exponential recursions into algorithms polynomial in the number
//! of unique nodes.
//!
//! The cache is sized once at construction and never rehashes: when it
//! fills, the least-frequently-used half is evicted. Statistics are kept in
//! rounds, one per cleanup, so the working set of each phase of a long
//! computation stays visible.

use crate::error::Step;
use log::debug;
use rustc_hash::FxHashMap;
use std::hash::Hash;

/// An operation that can be memoized: a value key plus the type of its
/// result and the breadcrumb it leaves when an evaluation fails through it.
pub trait CachedOperation: Clone + Eq + Hash {
    type Output: Clone;

    fn step(&self) -> Step;
}

/// Counters between two cleanups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Round {
    pub hits: usize,
    pub misses: usize,
    pub filtered: usize,
}

/// The statistics of a cache: one [`Round`] per cleanup, newest last.
#[derive(Debug, Clone, Default)]
pub struct CacheStatistics {
    rounds: Vec<Round>,
}

impl CacheStatistics {
    fn new() -> CacheStatistics {
        CacheStatistics {
            rounds: vec![Round::default()],
        }
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// The number of cleanups performed so far.
    pub fn cleanups(&self) -> usize {
        self.rounds.len() - 1
    }

    /// Counters summed over all rounds.
    pub fn total(&self) -> Round {
        let mut total = Round::default();
        for r in &self.rounds {
            total.hits += r.hits;
            total.misses += r.misses;
            total.filtered += r.filtered;
        }
        total
    }

    fn current(&mut self) -> &mut Round {
        self.rounds
            .last_mut()
            .expect("statistics always have an open round")
    }
}

struct CacheEntry<R> {
    result: R,
    /// Access count driving the LFU eviction.
    nb_hits: u32,
}

/// A named, bounded map from operation to result with LFU eviction.
pub struct Cache<O: CachedOperation + 'static> {
    name: &'static str,
    max_size: usize,
    entries: FxHashMap<O, CacheEntry<O::Output>>,
    /// Operations rejected by any filter are evaluated without caching. A
    /// filter must be deterministic for a given operation.
    filters: &'static [fn(&O) -> bool],
    stats: CacheStatistics,
}

impl<O: CachedOperation + 'static> Cache<O> {
    pub fn new(name: &'static str, max_size: usize) -> Cache<O> {
        Cache::with_filters(name, max_size, &[])
    }

    /// The whole capacity is allocated up front; eviction keeps the entry
    /// count strictly below `max_size`, so the map never rehashes.
    pub fn with_filters(
        name: &'static str,
        max_size: usize,
        filters: &'static [fn(&O) -> bool],
    ) -> Cache<O> {
        Cache {
            name,
            max_size: max_size.max(2),
            entries: FxHashMap::with_capacity_and_hasher(max_size.max(2), Default::default()),
            filters,
            stats: CacheStatistics::new(),
        }
    }

    /// Whether `op` passes every filter. Uncacheable operations should be
    /// evaluated directly and reported through [`Cache::note_filtered`].
    pub fn is_cacheable(&self, op: &O) -> bool {
        self.filters.iter().all(|f| f(op))
    }

    /// Record one filtered (evaluated but uncached) operation.
    pub fn note_filtered(&mut self) {
        self.stats.current().filtered += 1;
    }

    /// Look up a previously computed result. A hit bumps both the round
    /// counter and the entry's own count.
    pub fn get(&mut self, op: &O) -> Option<O::Output> {
        match self.entries.get_mut(op) {
            Some(entry) => {
                entry.nb_hits += 1;
                self.stats.current().hits += 1;
                Some(entry.result.clone())
            }
            None => None,
        }
    }

    /// Record a miss and store its freshly evaluated result, evicting the
    /// least-used half first if the cache is full. Only successful
    /// evaluations reach this point, so the counters stay accurate on error
    /// paths without any correction.
    pub fn insert(&mut self, op: O, result: O::Output) {
        self.stats.current().misses += 1;
        if self.entries.len() >= self.max_size {
            self.cleanup();
        }
        self.entries.insert(op, CacheEntry { result, nb_hits: 0 });
    }

    /// Evict the half of the cache with the lowest access counts (ties
    /// broken arbitrarily) and open a new statistics round.
    pub fn cleanup(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let cut = self.entries.len() / 2;
        if cut > 0 {
            let mut by_hits: Vec<(O, u32)> = self
                .entries
                .iter()
                .map(|(op, e)| (op.clone(), e.nb_hits))
                .collect();
            by_hits.select_nth_unstable_by_key(cut, |p| p.1);
            for (op, _) in by_hits.drain(..cut) {
                self.entries.remove(&op);
            }
        }
        debug!(
            "{}: cleanup #{} evicted {} entries, {} remain",
            self.name,
            self.stats.cleanups() + 1,
            cut,
            self.entries.len()
        );
        self.stats.rounds.push(Round::default());
    }

    /// Discard every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether a result for `op` is present, without touching any counter.
    pub fn contains(&self, op: &O) -> bool {
        self.entries.contains_key(op)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn statistics(&self) -> &CacheStatistics {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::hom::HomPtr;
    use crate::repr::sdd::SddPtr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct TestOp(u32);

    impl CachedOperation for TestOp {
        type Output = u32;

        fn step(&self) -> Step {
            Step::Hom {
                hom: HomPtr::IDENTITY,
                sdd: SddPtr::ZERO,
            }
        }
    }

    fn lookup(cache: &mut Cache<TestOp>, op: TestOp) -> u32 {
        if let Some(r) = cache.get(&op) {
            return r;
        }
        let r = op.0 * 10;
        cache.insert(op, r);
        r
    }

    #[test]
    fn hits_and_misses_are_counted() {
        let mut cache = Cache::new("test", 64);
        assert_eq!(lookup(&mut cache, TestOp(1)), 10);
        assert_eq!(lookup(&mut cache, TestOp(1)), 10);
        assert_eq!(lookup(&mut cache, TestOp(2)), 20);
        let total = cache.statistics().total();
        assert_eq!(total.hits, 1);
        assert_eq!(total.misses, 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn filters_bypass_the_cache() {
        static FILTERS: [fn(&TestOp) -> bool; 1] = [|op| op.0 % 2 == 0];
        let mut cache = Cache::with_filters("test", 64, &FILTERS);
        let odd = TestOp(3);
        assert!(!cache.is_cacheable(&odd));
        cache.note_filtered();
        assert!(cache.is_cacheable(&TestOp(4)));
        lookup(&mut cache, TestOp(4));
        let total = cache.statistics().total();
        assert_eq!(total.filtered, 1);
        assert_eq!(total.misses, 1);
        assert!(!cache.contains(&odd));
    }

    #[test]
    fn lfu_eviction_keeps_the_most_used_half_plus_the_newest() {
        let max = 8;
        let mut cache = Cache::new("test", max);
        for i in 0..max as u32 {
            lookup(&mut cache, TestOp(i));
        }
        // Heterogeneous frequencies: op i gets i extra hits.
        for i in 0..max as u32 {
            for _ in 0..i {
                cache.get(&TestOp(i));
            }
        }
        // One more distinct insert forces the cleanup.
        lookup(&mut cache, TestOp(99));
        assert_eq!(cache.len(), max / 2 + 1);
        for i in 4..8 {
            assert!(cache.contains(&TestOp(i)), "most-hit op {} evicted", i);
        }
        assert!(cache.contains(&TestOp(99)), "the newest op must survive");
        assert_eq!(cache.statistics().cleanups(), 1);
        assert_eq!(cache.statistics().rounds().len(), 2);
    }

    #[test]
    fn clear_keeps_statistics() {
        let mut cache = Cache::new("test", 8);
        lookup(&mut cache, TestOp(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.statistics().total().misses, 1);
        assert_eq!(lookup(&mut cache, TestOp(1)), 10);
        assert_eq!(cache.statistics().total().misses, 2);
    }
}
