use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use profile_triage::diff::{compute_deltas, to_percent_map};
use profile_triage::fleet::{rank_hotspots, ServiceObservation};
use profile_triage::profile::{decode, Flamebearer, ProfileType};
use profile_triage::triage::diagnose;

/// Tree of `depth` levels, `width` nodes per level, names reused across levels
fn synthetic_flamebearer(width: usize, depth: usize) -> Flamebearer {
    let names: Vec<String> = (0..width).map(|i| format!("com.acme.service.Component{}.handle", i)).collect();
    let per_node = 10u64;
    let num_ticks = per_node * width as u64 * depth as u64;

    let levels = (0..depth)
        .map(|_| {
            (0..width)
                .flat_map(|i| [0, per_node * 2, per_node, i as u64])
                .collect::<Vec<u64>>()
        })
        .collect();

    Flamebearer {
        names,
        levels,
        num_ticks,
    }
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for width in [100usize, 1_000, 5_000] {
        let flamebearer = synthetic_flamebearer(width, 20);
        group.throughput(Throughput::Elements((width * 20) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &flamebearer, |b, fb| {
            b.iter(|| decode(black_box(fb), 50))
        });
    }

    group.finish();
}

fn bench_diagnose_and_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");

    let baseline = decode(&synthetic_flamebearer(1_000, 10), 500);
    let current = decode(&synthetic_flamebearer(1_200, 10), 500);

    group.bench_function("diagnose_cpu", |b| b.iter(|| diagnose(ProfileType::Cpu, black_box(&current))));

    group.bench_function("compute_deltas", |b| {
        let (baseline, current) = (to_percent_map(&baseline), to_percent_map(&current));
        b.iter(|| compute_deltas(black_box(&baseline), black_box(&current), 20))
    });

    group.finish();
}

fn bench_rank_hotspots(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_hotspots");

    for apps in [10usize, 100] {
        let observations: Vec<(String, Vec<ServiceObservation>)> = (0..500)
            .map(|f| {
                let services = (0..apps)
                    .filter(|a| (a + f) % 3 == 0)
                    .map(|a| ServiceObservation::new(format!("app-{}", a), ((a * 7 + f) % 50) as f64))
                    .collect();
                (format!("shared.Function{}", f), services)
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(apps), &observations, |b, obs| {
            b.iter(|| rank_hotspots(black_box(obs.clone()), 20))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_diagnose_and_diff, bench_rank_hotspots);
criterion_main!(benches);
