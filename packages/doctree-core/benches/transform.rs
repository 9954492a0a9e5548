use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use doctree_core::{transform, transform_sets, Node, Operation, Position, Range, TransformContext};
use serde_json::json;

fn pos(path: &[usize]) -> Position {
    Position::new("main", path.to_vec()).unwrap()
}

/// Alternating inserts, removals and formatting over one paragraph.
fn typing_session(len: usize, base: u64) -> Vec<Operation> {
    (0..len)
        .map(|i| {
            let base = Some(base + i as u64);
            let at = (i * 7) % 40;
            match i % 3 {
                0 => Operation::insert(base, &pos(&[0, at]), Node::text("ab")),
                1 => Operation::remove(base, &pos(&[0, at]), 1),
                _ => Operation::attribute(
                    base,
                    Range::new(pos(&[0, at]), pos(&[0, at + 2])).unwrap(),
                    "bold",
                    None,
                    Some(json!(true)),
                ),
            }
        })
        .collect()
}

fn bench_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    let insert = Operation::insert(Some(0), &pos(&[0, 4]), Node::text("xyz"));
    let remove = Operation::remove(Some(0), &pos(&[0, 2]), 5);
    let moved = Operation::move_range(Some(0), &pos(&[0, 0]), 6, &pos(&[1, 0]));

    group.bench_function("insert_over_remove", |b| {
        b.iter(|| transform(std::hint::black_box(&insert), &remove, TransformContext::default()))
    });
    group.bench_function("remove_over_move", |b| {
        b.iter(|| transform(std::hint::black_box(&remove), &moved, TransformContext::default()))
    });
    group.finish();
}

fn bench_sets(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_sets");
    group.sample_size(20);
    for len in [10usize, 100] {
        let ours = typing_session(len, 0);
        let theirs = typing_session(len, 0);
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| transform_sets(&ours, &theirs, TransformContext::default()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pairs, bench_sets);
criterion_main!(benches);
