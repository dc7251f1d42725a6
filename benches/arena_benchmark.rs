use criterion::{black_box, criterion_group, criterion_main, Criterion};
use latticedex::memory::arena::Arena;

fn tagged_alloc_free_cycle(c: &mut Criterion) {
    let arena = Arena::init(64 * 1024 * 1024).expect("arena init");
    c.bench_function("arena_tagged_alloc_free_16b", |b| {
        b.iter(|| {
            let id = arena.tagged_alloc(1, 16).expect("alloc");
            black_box(arena.get(id));
            arena.tagged_free_index(1, id);
        })
    });
}

fn tagged_alloc_many_then_free_tag(c: &mut Criterion) {
    c.bench_function("arena_1000_allocs_then_free_tag", |b| {
        b.iter(|| {
            let arena = Arena::init(16 * 1024 * 1024).expect("arena init");
            for _ in 0..1000 {
                black_box(arena.tagged_alloc(7, 16).expect("alloc"));
            }
            arena.tagged_free_tag(7);
        })
    });
}

criterion_group!(benches, tagged_alloc_free_cycle, tagged_alloc_many_then_free_tag);
criterion_main!(benches);
