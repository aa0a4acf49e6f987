use block_timeline::sequencer::{RecordingClock, Timeline, TimeSignature, Transport};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// Benchmark the cheap path: appending blocks after the last active bar
fn bench_add_block_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_block_append");

    for length in [16usize, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, &length| {
            b.iter(|| {
                let mut timeline =
                    Timeline::with_sequencers(RecordingClock::new(), length, ["A"]).unwrap();
                for bar in 0..length {
                    timeline.add_block(0, black_box(bar)).unwrap();
                }
                black_box(timeline.clock().registrations().len())
            });
        });
    }
    group.finish();
}

/// Benchmark the rebuild path: filling bars back to front
fn bench_add_block_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_block_rebuild");

    for length in [16usize, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, &length| {
            b.iter(|| {
                let mut timeline =
                    Timeline::with_sequencers(RecordingClock::new(), length, ["A"]).unwrap();
                for bar in (0..length).rev() {
                    timeline.add_block(0, black_box(bar)).unwrap();
                }
                black_box(timeline.clock().registrations().len())
            });
        });
    }
    group.finish();
}

/// Benchmark removal, which always rebuilds the track
fn bench_remove_block(c: &mut Criterion) {
    let length = 64;
    let mut timeline = Timeline::with_sequencers(RecordingClock::new(), length, ["A"]).unwrap();
    for bar in 0..length {
        timeline.add_block(0, bar).unwrap();
    }

    c.bench_function("remove_and_restore_block_64", |b| {
        b.iter(|| {
            timeline.remove_block(0, black_box(32)).unwrap();
            timeline.add_block(0, black_box(32)).unwrap();
        });
    });
}

/// Benchmark playback firing over a busy transport
fn bench_transport_advance(c: &mut Criterion) {
    let length = 16;
    let mut timeline =
        Timeline::with_sequencers(Transport::new(), length, ["A", "B", "C", "D"]).unwrap();
    for track in 0..4 {
        for bar in (track..length).step_by(2) {
            timeline.add_block(track, bar).unwrap();
        }
    }
    timeline.clock_mut().play();
    let ticks_per_bar = TimeSignature::four_four().ticks_per_bar();

    c.bench_function("transport_advance_one_bar", |b| {
        b.iter(|| black_box(timeline.clock_mut().advance_ticks(ticks_per_bar)));
    });
}

criterion_group!(
    benches,
    bench_add_block_append,
    bench_add_block_rebuild,
    bench_remove_block,
    bench_transport_advance
);
criterion_main!(benches);
