//! Criterion benchmarks for command interpretation and batching.
//!
//! Run with: `cargo bench -p quadbatch_core`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use quadbatch_core::testing::{MemoryCodec, RecordingBackend};
use quadbatch_core::{Canvas, CanvasConfig, CommandParser};

/// A sprite-heavy frame: runs of draws from three atlases with transform
/// changes in between, 10 000 commands total.
fn make_frame() -> String {
    let mut frame = String::from("m;");
    for i in 0..2_000 {
        let texture = 1 + (i / 50) % 3;
        let x = (i % 40) * 20;
        let y = (i / 40) * 12;
        frame.push_str(&format!(
            "v;l{x},{y};r0.{r};d{texture},0,0,32,32,0,0,16,16;e;",
            r = i % 10
        ));
    }
    frame
}

fn bench_parse(c: &mut Criterion) {
    let frame = make_frame();
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(frame.len() as u64));
    group.bench_function("10k_commands", |b| {
        b.iter(|| CommandParser::new(black_box(&frame)).count());
    });
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let frame = make_frame();
    let mut backend = RecordingBackend::new(800, 600);
    let atlases: Vec<_> = (0..3).map(|_| backend.external_texture()).collect();
    let mut canvas =
        Canvas::with_codec(backend, MemoryCodec::new(), CanvasConfig::default(), 800, 600);
    for (id, atlas) in (1..).zip(atlases) {
        canvas.add_texture(id, atlas, 256, 256);
    }

    let mut group = c.benchmark_group("render");
    group.throughput(Throughput::Bytes(frame.len() as u64));
    group.bench_function("10k_commands", |b| {
        b.iter(|| {
            canvas.render(black_box(&frame));
            canvas.backend_mut().clear_calls();
        });
    });
    group.bench_function("redraw_previous", |b| {
        b.iter(|| {
            canvas.render(black_box(""));
            canvas.backend_mut().clear_calls();
        });
    });
    group.finish();
}

criterion_group!(benches, bench_parse, bench_render);
criterion_main!(benches);
