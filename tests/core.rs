//! End-to-end behavior of the SDD and homomorphism algebras: construction,
//! canonicity, the binary operations against a reference model, evaluation,
//! saturation, and the failure paths.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rshdd::*;
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::atomic::Ordering;

fn setup() -> (Manager<Conf64>, Context) {
    let man = Manager::new();
    let ctx = man.initial_context();
    (man, ctx)
}

fn order3() -> Order<Conf64> {
    Order::from_identifiers(["a", "b", "c"].map(String::from))
}

/// One cube over `order`: each listed identifier maps to the given values,
/// everything else to the empty set.
fn cube(
    man: &mut Manager<Conf64>,
    ctx: &mut Context,
    order: &Order<Conf64>,
    map: &[(&str, &[u32])],
) -> SddPtr {
    let table: HashMap<String, Bitset64> = map
        .iter()
        .map(|(k, vs)| (k.to_string(), vs.iter().copied().collect()))
        .collect();
    man.sdd_from_order(ctx, order, &|id: &String| {
        table.get(id).copied().unwrap_or_else(Bitset64::empty)
    })
    .expect("cube construction")
}

fn flat_tuples(man: &Manager<Conf64>, x: SddPtr) -> BTreeSet<Vec<u32>> {
    man.tuples(x)
        .map(|t| {
            t.into_iter()
                .map(|e| match e {
                    TupleEntry::Value(v) => v,
                    TupleEntry::Nested(_) => panic!("expected a flat tuple"),
                })
                .collect()
        })
        .collect()
}

fn sdd_of_set(
    man: &mut Manager<Conf64>,
    ctx: &mut Context,
    order: &Order<Conf64>,
    set: &BTreeSet<Vec<u32>>,
) -> SddPtr {
    let ids = ["a", "b", "c"];
    let mut acc = SddPtr::ZERO;
    for tuple in set {
        let single = man
            .sdd_from_order(ctx, order, &|id: &String| {
                let i = ids.iter().position(|x| x == id).expect("known id");
                Bitset64::singleton(tuple[i])
            })
            .expect("singleton construction");
        acc = man.union(ctx, acc, single).expect("union");
    }
    acc
}

fn random_set(rng: &mut SmallRng) -> BTreeSet<Vec<u32>> {
    let amount = rng.gen_range(0..12);
    (0..amount)
        .map(|_| (0..3).map(|_| rng.gen_range(0..4u32)).collect())
        .collect()
}

/// Toggles the values 0 and 1, leaving everything else in place.
#[derive(Debug)]
struct Flip;

impl ValuesFn<Bitset64> for Flip {
    fn apply(&self, values: &Bitset64) -> Bitset64 {
        values
            .iter()
            .map(|v| match v {
                0 => 1,
                1 => 0,
                other => other,
            })
            .collect()
    }

    fn eq_dyn(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<Flip>().is_some()
    }

    fn hash_dyn(&self) -> u64 {
        0x466c_6970
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An inductive homomorphism flipping every flat level it meets.
#[derive(Debug)]
struct FlipEverything;

impl Inductive<Conf64> for FlipEverything {
    fn skip(&self, _var: VarLabel) -> bool {
        false
    }

    fn on_flat(&self, man: &mut Manager<Conf64>, var: VarLabel, values: &Bitset64) -> HomPtr {
        let cont = man.inductive(Rc::new(FlipEverything));
        man.cons(var, Flip.apply(values), cont)
    }

    fn on_hier(&self, man: &mut Manager<Conf64>, var: VarLabel, nested: SddPtr) -> HomPtr {
        let cont = man.inductive(Rc::new(FlipEverything));
        man.cons_hier(var, nested, cont)
    }

    fn on_one(&self, man: &mut Manager<Conf64>) -> SddPtr {
        man.one()
    }

    fn eq_dyn(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<FlipEverything>().is_some()
    }

    fn hash_dyn(&self) -> u64 {
        0x696e_6475
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn terminal_operations() {
    let (mut man, mut ctx) = setup();
    let zero = man.zero();
    let one = man.one();
    assert_eq!(man.union(&mut ctx, zero, zero).unwrap(), zero);
    assert_eq!(man.union(&mut ctx, one, one).unwrap(), one);
    assert_eq!(man.intersection(&mut ctx, one, zero).unwrap(), zero);
    assert_eq!(man.difference(&mut ctx, one, one).unwrap(), zero);
    assert_eq!(man.count_tuples(zero), 0);
    assert_eq!(man.count_tuples(one), 1);
}

#[test]
fn singleton_tuple_is_idempotent() {
    let (mut man, mut ctx) = setup();
    let o = order3();
    let x = cube(&mut man, &mut ctx, &o, &[("a", &[1]), ("b", &[0]), ("c", &[1])]);
    assert_eq!(man.union(&mut ctx, x, x).unwrap(), x);
    assert_eq!(man.intersection(&mut ctx, x, x).unwrap(), x);
    assert_eq!(man.difference(&mut ctx, x, x).unwrap(), SddPtr::ZERO);
    assert_eq!(man.count_tuples(x), 1);
    assert_eq!(man.size(x), 3);
    assert_eq!(format!("{}", man.fmt_sdd(x)), "{ <1 0 1> }");
}

#[test]
fn union_of_two_tuples() {
    let (mut man, mut ctx) = setup();
    let o = order3();
    let x = cube(&mut man, &mut ctx, &o, &[("a", &[1]), ("b", &[0]), ("c", &[1])]);
    let y = cube(&mut man, &mut ctx, &o, &[("a", &[0]), ("b", &[0]), ("c", &[1])]);
    let u = man.union(&mut ctx, x, y).unwrap();
    assert_eq!(man.count_tuples(u), 2);
    let expected: BTreeSet<Vec<u32>> = [vec![1, 0, 1], vec![0, 0, 1]].into_iter().collect();
    assert_eq!(flat_tuples(&man, u), expected);
    // The two arcs share a successor, so they collapse into one.
    match man.sdd_node(u) {
        SddNode::Flat { arcs, .. } => assert_eq!(arcs.len(), 1),
        node => panic!("expected a flat node, got {:?}", node),
    }
}

#[test]
fn hash_consing_shares_structurally_equal_nodes() {
    let (mut man, mut ctx) = setup();
    let o = order3();
    let x1 = cube(&mut man, &mut ctx, &o, &[("a", &[1]), ("b", &[0]), ("c", &[1])]);
    let x2 = cube(&mut man, &mut ctx, &o, &[("a", &[1]), ("b", &[0]), ("c", &[1])]);
    assert_eq!(x1, x2);

    // Arc order at construction is irrelevant.
    let v0 = VarLabel::new(0);
    let s1 = man
        .make_flat(
            &mut ctx,
            v0,
            vec![FlatArc {
                values: Bitset64::singleton(0),
                succ: SddPtr::ONE,
            }],
        )
        .unwrap();
    let s2 = man
        .make_flat(
            &mut ctx,
            v0,
            vec![FlatArc {
                values: Bitset64::singleton(1),
                succ: SddPtr::ONE,
            }],
        )
        .unwrap();
    let v1 = VarLabel::new(1);
    let arcs_fwd = vec![
        FlatArc {
            values: Bitset64::singleton(3),
            succ: s1,
        },
        FlatArc {
            values: Bitset64::singleton(4),
            succ: s2,
        },
    ];
    let arcs_rev = arcs_fwd.iter().rev().cloned().collect();
    let n1 = man.make_flat(&mut ctx, v1, arcs_fwd).unwrap();
    let n2 = man.make_flat(&mut ctx, v1, arcs_rev).unwrap();
    assert_eq!(n1, n2);
}

#[test]
fn overlapping_arcs_are_partitioned() {
    let (mut man, mut ctx) = setup();
    let v0 = VarLabel::new(0);
    let v1 = VarLabel::new(1);
    let s1 = man
        .make_flat(
            &mut ctx,
            v0,
            vec![FlatArc {
                values: Bitset64::singleton(0),
                succ: SddPtr::ONE,
            }],
        )
        .unwrap();
    let s2 = man
        .make_flat(
            &mut ctx,
            v0,
            vec![FlatArc {
                values: Bitset64::singleton(1),
                succ: SddPtr::ONE,
            }],
        )
        .unwrap();
    let n = man
        .make_flat(
            &mut ctx,
            v1,
            vec![
                FlatArc {
                    values: [0, 1].into_iter().collect(),
                    succ: s1,
                },
                FlatArc {
                    values: [1, 2].into_iter().collect(),
                    succ: s2,
                },
                FlatArc {
                    values: Bitset64::singleton(7),
                    succ: SddPtr::ZERO,
                },
            ],
        )
        .unwrap();
    match man.sdd_node(n) {
        SddNode::Flat { arcs, .. } => {
            assert_eq!(arcs.len(), 3);
            for (i, arc) in arcs.iter().enumerate() {
                assert!(!arc.succ.is_zero(), "no arc may lead to Zero");
                assert!(!arc.values.is_empty());
                for other in &arcs[i + 1..] {
                    assert!(
                        arc.values.intersection(&other.values).is_empty(),
                        "labels must be pairwise disjoint"
                    );
                }
            }
            assert!(
                arcs.windows(2).all(|w| w[0].succ < w[1].succ),
                "arcs must be sorted by successor handle"
            );
        }
        node => panic!("expected a flat node, got {:?}", node),
    }
    assert_eq!(man.count_tuples(n), 4);
}

#[test]
fn random_sets_match_the_model() {
    let mut rng = SmallRng::seed_from_u64(0xdecaf);
    for _ in 0..25 {
        let (mut man, mut ctx) = setup();
        let o = order3();
        let (sa, sb, sc) = (
            random_set(&mut rng),
            random_set(&mut rng),
            random_set(&mut rng),
        );
        let a = sdd_of_set(&mut man, &mut ctx, &o, &sa);
        let b = sdd_of_set(&mut man, &mut ctx, &o, &sb);
        let c = sdd_of_set(&mut man, &mut ctx, &o, &sc);

        let u = man.union(&mut ctx, a, b).unwrap();
        assert_eq!(
            flat_tuples(&man, u),
            sa.union(&sb).cloned().collect::<BTreeSet<_>>()
        );
        let i = man.intersection(&mut ctx, a, b).unwrap();
        assert_eq!(
            flat_tuples(&man, i),
            sa.intersection(&sb).cloned().collect::<BTreeSet<_>>()
        );
        let d = man.difference(&mut ctx, a, b).unwrap();
        assert_eq!(
            flat_tuples(&man, d),
            sa.difference(&sb).cloned().collect::<BTreeSet<_>>()
        );
        assert_eq!(man.count_tuples(a), sa.len() as u128);

        // Algebraic laws, as handle identities.
        assert_eq!(man.union(&mut ctx, b, a).unwrap(), u);
        assert_eq!(man.union(&mut ctx, a, a).unwrap(), a);
        assert_eq!(man.intersection(&mut ctx, b, a).unwrap(), i);
        assert_eq!(man.union(&mut ctx, a, SddPtr::ZERO).unwrap(), a);
        assert_eq!(
            man.intersection(&mut ctx, a, SddPtr::ZERO).unwrap(),
            SddPtr::ZERO
        );
        let ab_c = {
            let ab = man.union(&mut ctx, a, b).unwrap();
            man.union(&mut ctx, ab, c).unwrap()
        };
        let a_bc = {
            let bc = man.union(&mut ctx, b, c).unwrap();
            man.union(&mut ctx, a, bc).unwrap()
        };
        assert_eq!(ab_c, a_bc);
    }
}

#[test]
fn homomorphism_constructor_identities() {
    let (mut man, mut ctx) = setup();
    let o = order3();
    let x = cube(&mut man, &mut ctx, &o, &[("a", &[0]), ("b", &[0]), ("c", &[1])]);
    let id = man.identity();
    let flip_a = man.values_function(o.variable(), Rc::new(Flip));

    assert_eq!(man.composition(id, flip_a), flip_a);
    assert_eq!(man.composition(flip_a, id), flip_a);
    assert_eq!(man.fixpoint(id), id);
    let fix = {
        let s = man.sum(&o, [id, flip_a]);
        man.fixpoint(s)
    };
    assert_eq!(man.fixpoint(fix), fix);

    let s1 = man.sum(&o, [id, flip_a]);
    let s2 = man.sum(&o, [flip_a, id, flip_a]);
    assert_eq!(s1, s2, "sums are canonical sorted sets");
    let single = man.sum(&o, [flip_a]);
    assert_eq!(single, flip_a, "a singleton sum collapses");

    // Fixpoint commutes with Local.
    let inner = Order::from_identifiers(["x"].map(String::from));
    let oh = Order::<Conf64>::new().add_nested("A".to_string(), &inner);
    let flip_x = man.values_function(inner.variable(), Rc::new(Flip));
    let local = man.local("A".to_string(), &oh, flip_x);
    let fix_local = man.fixpoint(local);
    assert!(matches!(man.hom_node(fix_local), HomNode::Local { .. }));

    assert_eq!(man.apply(&mut ctx, id, &o, x).unwrap(), x);
}

#[test]
fn skip_and_selector_predicates() {
    let (mut man, _ctx) = setup();
    let o = order3();
    let id = man.identity();
    let flip_a = man.values_function(o.variable(), Rc::new(Flip));
    assert!(!man.skip(flip_a, &o));
    assert!(man.skip(flip_a, &o.next()));
    assert!(man.skip(id, &o));
    let s = man.sum(&o, [id, flip_a]);
    assert!(!man.skip(s, &o), "a sum skips only if every operand does");

    assert!(man.selector(id));
    assert!(!man.selector(flip_a), "Flip does not claim to shrink");
    let one = man.one();
    let constant = man.constant(one);
    assert!(!man.selector(constant));
}

#[test]
fn fixpoint_reachability_flips_one_variable() {
    let (mut man, mut ctx) = setup();
    let o = order3();
    let x = cube(&mut man, &mut ctx, &o, &[("a", &[0]), ("b", &[0]), ("c", &[1])]);
    let id = man.identity();
    let flip_a = man.values_function(o.variable(), Rc::new(Flip));
    let fix = {
        let s = man.sum(&o, [id, flip_a]);
        man.fixpoint(s)
    };
    let reached = man.apply(&mut ctx, fix, &o, x).unwrap();
    let expected = cube(
        &mut man,
        &mut ctx,
        &o,
        &[("a", &[0, 1]), ("b", &[0]), ("c", &[1])],
    );
    assert_eq!(reached, expected);

    // Fixpoints are idempotent on their own output.
    assert_eq!(man.apply(&mut ctx, fix, &o, reached).unwrap(), reached);
}

#[test]
fn local_transforms_the_nested_level() {
    let (mut man, mut ctx) = setup();
    let inner = Order::from_identifiers(["x", "y"].map(String::from));
    let o = Order::<Conf64>::new().add_nested("A".to_string(), &inner);
    let x = cube(&mut man, &mut ctx, &o, &[("x", &[0]), ("y", &[0])]);
    let flip_x = man.values_function(inner.variable(), Rc::new(Flip));
    let local = man.local("A".to_string(), &o, flip_x);
    let r = man.apply(&mut ctx, local, &o, x).unwrap();
    let expected = cube(&mut man, &mut ctx, &o, &[("x", &[1]), ("y", &[0])]);
    assert_eq!(r, expected);
    let tuples: Vec<_> = man.tuples(r).collect();
    assert_eq!(
        tuples,
        vec![vec![TupleEntry::Nested(vec![
            TupleEntry::Value(1),
            TupleEntry::Value(0)
        ])]]
    );
}

#[test]
fn anonymous_levels_are_crossed_by_skip_and_never_matched_by_local() {
    let (mut man, mut ctx) = setup();
    let inner = Order::from_identifiers(["x", "y"].map(String::from));
    let o = Order::<Conf64>::new()
        .add("b".to_string())
        .add_anonymous(&inner);
    let x = cube(
        &mut man,
        &mut ctx,
        &o,
        &[("x", &[0]), ("y", &[1]), ("b", &[0])],
    );
    assert_eq!(man.count_tuples(x), 1);

    // A local over an identifier buried inside the anonymous grouping skips
    // the whole spine: no level is named "x", so nothing is transformed.
    let flip_x = man.values_function(inner.variable(), Rc::new(Flip));
    let local_x = man.local("x".to_string(), &o, flip_x);
    assert!(man.skip(local_x, &o));
    assert_eq!(man.apply(&mut ctx, local_x, &o, x).unwrap(), x);

    // Levels below the grouping stay reachable through skip descent.
    let flip_b = man.values_function(o.next().variable(), Rc::new(Flip));
    assert!(man.skip(flip_b, &o));
    let r = man.apply(&mut ctx, flip_b, &o, x).unwrap();
    let expected = cube(
        &mut man,
        &mut ctx,
        &o,
        &[("x", &[0]), ("y", &[1]), ("b", &[1])],
    );
    assert_eq!(r, expected);
}

#[test]
#[should_panic(expected = "artificial order node")]
fn anonymous_flat_levels_cannot_be_valuated() {
    let (mut man, mut ctx) = setup();
    let o = Order::<Conf64>::new().add_anonymous(&Order::new());
    let _ = man.sdd_from_order(&mut ctx, &o, &|_: &String| Bitset64::singleton(0));
}

#[test]
fn inductive_flips_every_level() {
    let (mut man, mut ctx) = setup();
    let o = order3();
    let x = cube(&mut man, &mut ctx, &o, &[("a", &[1]), ("b", &[0]), ("c", &[1])]);
    let ind = man.inductive(Rc::new(FlipEverything));
    let r = man.apply(&mut ctx, ind, &o, x).unwrap();
    let expected = cube(&mut man, &mut ctx, &o, &[("a", &[0]), ("b", &[1]), ("c", &[0])]);
    assert_eq!(r, expected);

    // Structurally equal user callables intern to the same homomorphism.
    let ind2 = man.inductive(Rc::new(FlipEverything));
    assert_eq!(ind, ind2);
}

#[test]
fn saturation_rewrite_is_denotationally_equal() {
    let (mut man, mut ctx) = setup();
    let oa = Order::from_identifiers(["x"].map(String::from));
    let ob = Order::from_identifiers(["y"].map(String::from));
    let o = Order::<Conf64>::new()
        .add_nested("B".to_string(), &ob)
        .add_nested("A".to_string(), &oa);

    let x = cube(&mut man, &mut ctx, &o, &[("x", &[0]), ("y", &[0])]);
    let id = man.identity();
    let flip_x = man.values_function(oa.variable(), Rc::new(Flip));
    let flip_y = man.values_function(ob.variable(), Rc::new(Flip));
    let la = man.local("A".to_string(), &o, flip_x);
    let lb = man.local("B".to_string(), &o, flip_y);
    let h = {
        let s = man.sum(&o, [id, la, lb]);
        man.fixpoint(s)
    };

    let rewritten = man.rewrite(h, &o);
    assert_ne!(rewritten, h);
    assert!(matches!(
        man.hom_node(rewritten),
        HomNode::SaturationFixpoint { .. }
    ));
    // Rewriting is memoized.
    assert_eq!(man.rewrite(h, &o), rewritten);

    let plain = man.apply(&mut ctx, h, &o, x).unwrap();
    let saturated = man.apply(&mut ctx, rewritten, &o, x).unwrap();
    assert_eq!(plain, saturated);
    let expected = cube(
        &mut man,
        &mut ctx,
        &o,
        &[("x", &[0, 1]), ("y", &[0, 1])],
    );
    assert_eq!(plain, expected);
    assert_eq!(man.count_tuples(plain), 4);
}

#[test]
fn intersection_homomorphism_keeps_the_common_part() {
    let (mut man, mut ctx) = setup();
    let o = order3();
    let x = cube(&mut man, &mut ctx, &o, &[("a", &[0]), ("b", &[0]), ("c", &[1])]);
    let id = man.identity();
    let flip_a = man.values_function(o.variable(), Rc::new(Flip));
    // x and its flip share no tuple, so intersecting the two applications
    // empties the set.
    let meet = man.intersection_hom(&o, [id, flip_a]);
    assert_eq!(man.apply(&mut ctx, meet, &o, x).unwrap(), SddPtr::ZERO);

    // On the flip-closed set both operands are the identity function.
    let closed = cube(
        &mut man,
        &mut ctx,
        &o,
        &[("a", &[0, 1]), ("b", &[0]), ("c", &[1])],
    );
    assert_eq!(man.apply(&mut ctx, meet, &o, closed).unwrap(), closed);
}

#[test]
fn cache_transparency() {
    let (mut man, mut ctx) = setup();
    let o = order3();
    let x = cube(&mut man, &mut ctx, &o, &[("a", &[0]), ("b", &[0]), ("c", &[1])]);
    let id = man.identity();
    let flip_a = man.values_function(o.variable(), Rc::new(Flip));
    let fix = {
        let s = man.sum(&o, [id, flip_a]);
        man.fixpoint(s)
    };

    let r1 = man.apply(&mut ctx, fix, &o, x).unwrap();
    let hits_before = ctx.hom_cache_statistics().total().hits;
    let r2 = man.apply(&mut ctx, fix, &o, x).unwrap();
    assert_eq!(r1, r2);
    assert!(
        ctx.hom_cache_statistics().total().hits > hits_before,
        "the second evaluation must hit the cache"
    );

    // A fresh context recomputes to the identical handle.
    let mut ctx2 = man.initial_context();
    let r3 = man.apply(&mut ctx2, fix, &o, x).unwrap();
    assert_eq!(r1, r3);
}

#[test]
fn error_breadcrumbs_trace_the_recursion() {
    let (mut man, mut ctx) = setup();
    let o3 = order3();
    let o2 = Order::<Conf64>::from_identifiers(["a", "b"].map(String::from));
    let x = cube(&mut man, &mut ctx, &o3, &[("a", &[1]), ("b", &[0]), ("c", &[1])]);
    // Built against a shorter order, so its head variable clashes with x's.
    let y = cube(&mut man, &mut ctx, &o2, &[("a", &[1]), ("b", &[0])]);

    // The first operand touches the head level, so the sum is dispatched
    // right where it stands instead of being pushed down the order.
    let flip_a = man.values_function(o3.variable(), Rc::new(Flip));
    let bad = man.constant(y);
    let s = man.sum(&o3, [flip_a, bad]);
    let comp1 = man.composition(s, s);
    let comp2 = man.composition(s, comp1);

    let flipped = man.apply(&mut ctx, flip_a, &o3, x).unwrap();
    let err = man.apply(&mut ctx, comp2, &o3, x).unwrap_err();
    let top = err.top_operands().expect("a level clash raises Top");
    assert!(
        (top.lhs == flipped && top.rhs == y) || (top.lhs == y && top.rhs == flipped),
        "Top carries the two clashing operands"
    );
    assert_eq!(
        err.steps().len(),
        4,
        "one breadcrumb per operation on the path: union, sum, both compositions"
    );
    assert!(matches!(err.steps()[0], Step::SddOp(_)));
    assert!(matches!(
        err.steps()[3],
        Step::Hom { hom, .. } if hom == comp2
    ));
}

#[test]
fn interruption_aborts_evaluation() {
    let (mut man, mut ctx) = setup();
    let o = order3();
    let x = cube(&mut man, &mut ctx, &o, &[("a", &[0]), ("b", &[0]), ("c", &[1])]);
    let id = man.identity();
    let flip_a = man.values_function(o.variable(), Rc::new(Flip));
    let fix = {
        let s = man.sum(&o, [id, flip_a]);
        man.fixpoint(s)
    };
    ctx.interrupt_token().store(true, Ordering::Relaxed);
    let err = man.apply(&mut ctx, fix, &o, x).unwrap_err();
    assert!(err.is_interrupted());
}

#[test]
fn collection_reclaims_unreachable_nodes() {
    let (mut man, mut ctx) = setup();
    let o = order3();
    let x = cube(&mut man, &mut ctx, &o, &[("a", &[1]), ("b", &[0]), ("c", &[1])]);
    let y = cube(&mut man, &mut ctx, &o, &[("a", &[2]), ("b", &[3]), ("c", &[4])]);
    assert_eq!(man.num_sdd_nodes(), 8);
    assert_eq!(man.count_tuples(y), 1);

    man.collect(&mut ctx, &[x], &[]);
    assert_eq!(man.num_sdd_nodes(), 5, "y's chain is gone, x's remains");
    assert_eq!(man.count_tuples(x), 1);

    // Freed slots are reused and the rebuilt diagram behaves normally.
    let y2 = cube(&mut man, &mut ctx, &o, &[("a", &[2]), ("b", &[3]), ("c", &[4])]);
    assert_eq!(man.num_sdd_nodes(), 8);
    assert_eq!(man.count_tuples(y2), 1);
    let u = man.union(&mut ctx, x, y2).unwrap();
    assert_eq!(man.count_tuples(u), 2);
}

#[test]
fn flat_set_configuration_behaves_like_the_bitset_one() {
    let mut man = Manager::<ConfFlat>::new();
    let mut ctx = man.initial_context();
    let o = Order::<ConfFlat>::from_identifiers(["a", "b"].map(String::from));
    // Values well beyond the 64-bit bitset range.
    let x = man
        .sdd_from_order(&mut ctx, &o, &|id: &String| {
            if id == "a" {
                [1000, 2000].into_iter().collect::<FlatSet>()
            } else {
                FlatSet::singleton(7)
            }
        })
        .unwrap();
    assert_eq!(man.count_tuples(x), 2);
    let same = man.union(&mut ctx, x, x).unwrap();
    assert_eq!(same, x);
    let d = man.difference(&mut ctx, x, x).unwrap();
    assert_eq!(d, SddPtr::ZERO);
}

#[test]
fn constants_generate_and_cons_prepends() {
    let (mut man, mut ctx) = setup();
    let o = order3();
    let suffix = cube(
        &mut man,
        &mut ctx,
        &Order::from_identifiers(["b", "c"].map(String::from)),
        &[("b", &[0]), ("c", &[1])],
    );
    // Cons prepends the `a` level onto a constant generator of the suffix.
    let gen = man.constant(suffix);
    let consed = man.cons(o.variable(), Bitset64::singleton(1), gen);
    let r = man.apply(&mut ctx, consed, &o, SddPtr::ONE).unwrap();
    let expected = cube(&mut man, &mut ctx, &o, &[("a", &[1]), ("b", &[0]), ("c", &[1])]);
    assert_eq!(r, expected);
}
