use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rep_tracker::models::{ExerciseKind, Totals, UserCounts};
use rep_tracker::services::build_leaderboard;
use std::hint::black_box;

fn users(count: u64) -> Vec<UserCounts> {
    (0..count)
        .map(|i| {
            // Spread totals so sorting does real work and ties occur.
            let counts: Totals = [
                (ExerciseKind::Push, (i * 7919) % 5000),
                (ExerciseKind::Pull, (i * 104_729) % 3000),
            ]
            .into_iter()
            .collect();
            UserCounts {
                display_name: format!("user-{i:06}"),
                counts,
            }
        })
        .collect()
}

fn benchmark_leaderboard(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaderboard");

    for count in [1_000u64, 100_000] {
        let input = users(count);
        group.bench_function(format!("top_100_of_{count}"), |b| {
            b.iter_batched(
                || input.clone(),
                |users| build_leaderboard(black_box(users), 100),
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_leaderboard);
criterion_main!(benches);
