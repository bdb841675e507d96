//! Benchmarks for the harmonizer hot path
//!
//! Run with: cargo bench --bench chord_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use harmonia::chord::{build_chord, ChordTemplate};
use harmonia::mock_midi::RecordingSink;
use harmonia::quantize::quantize;
use harmonia::router::{NoteRouter, RouterConfig};
use harmonia::scale::{ScaleSelection, ScaleTable};

/// Quantize the whole MIDI range
fn bench_quantize(c: &mut Criterion) {
    let scale = ScaleTable::lookup("ebMajor").unwrap();

    c.bench_function("quantize_all_notes", |b| {
        b.iter(|| {
            for note in 0..=127u8 {
                black_box(quantize(black_box(note), &scale));
            }
        })
    });
}

/// Chord construction per scale
fn bench_build_chord(c: &mut Criterion) {
    let template = ChordTemplate::standard();
    let mut group = c.benchmark_group("build_chord");

    for name in ["cMajor", "gbMajor", "bMajor"] {
        let scale = ScaleTable::lookup(name).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &scale, |b, scale| {
            b.iter(|| {
                for note in 36..=96u8 {
                    black_box(build_chord(black_box(note), scale, &template));
                }
            })
        });
    }

    group.finish();
}

/// Full note-on/note-off cycle through the router
fn bench_router_cycle(c: &mut Criterion) {
    let sink = RecordingSink::new("bench");
    let mut router = NoteRouter::new(
        RouterConfig::default(),
        ChordTemplate::standard(),
        ScaleSelection::default(),
    )
    .unwrap();
    router.bind_output(Box::new(sink.clone()));

    c.bench_function("router_note_cycle", |b| {
        b.iter(|| {
            for note in 48..72u8 {
                router.note_on(black_box(note), 100);
            }
            for note in 48..72u8 {
                router.note_off(black_box(note));
            }
            sink.take();
        })
    });
}

criterion_group!(benches, bench_quantize, bench_build_chord, bench_router_cycle);
criterion_main!(benches);
