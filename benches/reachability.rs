use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rshdd::*;
use std::any::Any;
use std::rc::Rc;

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

/// Reachability of an 8-bit toggle system: every variable can flip freely,
/// so the fixpoint explores all 256 states from a single one.
fn reachability(man: &mut Manager<Conf64>, rewrite: bool) -> u128 {
    let mut ctx = man.initial_context();
    let ids: Vec<String> = (0..8).map(|i| format!("p{}", i)).collect();
    let order = Order::from_identifiers(ids.clone());
    let init = man
        .sdd_from_order(&mut ctx, &order, &|_: &String| Bitset64::singleton(0))
        .unwrap();

    let mut ops = vec![man.identity()];
    for name in &ids {
        let var = order.identifier_variable(name).unwrap();
        ops.push(man.values_function(var, Rc::new(Flip)));
    }
    let mut h = {
        let s = man.sum(&order, ops);
        man.fixpoint(s)
    };
    if rewrite {
        h = man.rewrite(h, &order);
    }
    let reached = man.apply(&mut ctx, h, &order, init).unwrap();
    man.count_tuples(reached)
}

fn bench_reachability(c: &mut Criterion) {
    c.bench_function("fixpoint reachability, 8 variables", |b| {
        b.iter(|| {
            let mut man = Manager::<Conf64>::new();
            black_box(reachability(&mut man, false))
        })
    });
    c.bench_function("saturated reachability, 8 variables", |b| {
        b.iter(|| {
            let mut man = Manager::<Conf64>::new();
            black_box(reachability(&mut man, true))
        })
    });
}

criterion_group!(benches, bench_reachability);
criterion_main!(benches);
