use std::hint::black_box;
use std::time::Instant;

use railstream_common::{LodTier, SectionIndex};
use railstream_kernel::SectionRegistry;
use railstream_stream::{
    DetailAssets, LatencyProvider, LodConfig, SectionLod, SectionStreamer, StreamingConfig,
};

fn make_streamer(sections: u32, latency: f32) -> SectionStreamer<LatencyProvider> {
    SectionStreamer::new(
        StreamingConfig::default(),
        SectionRegistry::uniform(sections, 50.0),
        LatencyProvider::new(latency),
    )
}

fn bench_walk(sections: u32, iterations: usize) {
    let mut streamer = make_streamer(sections, 0.0);

    let start = Instant::now();
    for i in 0..iterations {
        // Walk end to end and back.
        let lap = (i as u32) % (sections * 2);
        let index = if lap < sections { lap } else { sections * 2 - lap - 1 };
        streamer.enter_section(black_box(SectionIndex(index)));
        let _ = black_box(streamer.drain_events());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  walk ({sections} sections, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_update(sections: u32, iterations: usize) {
    let mut streamer = make_streamer(sections, 0.05);

    let start = Instant::now();
    for i in 0..iterations {
        if i % 30 == 0 {
            let index = (i as u32 / 30) % sections;
            streamer.enter_section(SectionIndex(index));
        }
        streamer.update(black_box(1.0 / 60.0));
        let _ = black_box(streamer.drain_events());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  update with latency ({sections} sections, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_lod_refresh(sections: u32, iterations: usize) {
    let mut lod = SectionLod::new(LodConfig::default());
    for i in 0..sections {
        lod.register_section(SectionIndex(i), DetailAssets::default(), [1.0; 4]);
    }

    let start = Instant::now();
    for i in 0..iterations {
        lod.set_active_section(black_box(SectionIndex(i as u32 % sections)));
        let _ = black_box(lod.drain_events());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    let full = lod.iter().filter(|e| e.tier == LodTier::Full).count();
    println!(
        "  lod refresh ({sections} sections, {iterations} iters, {full} full): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn main() {
    println!("=== Section Window Benchmarks ===\n");

    println!("Enter section:");
    bench_walk(15, 10000);
    bench_walk(100, 10000);
    bench_walk(1000, 10000);

    println!("\nPer-frame update:");
    bench_update(100, 10000);
    bench_update(1000, 10000);

    println!("\nLOD refresh:");
    bench_lod_refresh(100, 10000);
    bench_lod_refresh(1000, 1000);

    println!("\n=== Done ===");
}
