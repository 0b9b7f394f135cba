// PPU Benchmarks
// Performance benchmarks for scanline rendering

use criterion::{criterion_group, criterion_main, Criterion};
use gba_rs::interrupt::InterruptController;
use gba_rs::ppu::Ppu;
use std::hint::black_box;

const CYCLES_PER_LINE: u32 = 1232;

fn harness() -> (Ppu, Vec<u8>, Vec<u8>, Vec<u8>, InterruptController) {
    let mut ppu = Ppu::new();
    // Mode 3 (16bpp bitmap), BG2 on, so `tick` exercises the pixel path
    // instead of bailing out early on forced blank / no enabled layers.
    ppu.dispcnt = 0x0403;
    (
        ppu,
        vec![0xFF; 0x400],
        vec![0xAA; 0x1_8000],
        vec![0; 0x400],
        InterruptController::new(),
    )
}

fn bench_ppu_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("ppu_tick");
    group.sample_size(20);

    group.bench_function("single_scanline", |b| {
        let (mut ppu, palette, vram, oam, mut ic) = harness();

        b.iter(|| {
            black_box(ppu.tick(CYCLES_PER_LINE, &palette, &vram, &oam, &mut ic));
        });
    });

    group.bench_function("full_frame", |b| {
        let (mut ppu, palette, vram, oam, mut ic) = harness();

        b.iter(|| {
            for _ in 0..228 {
                ppu.tick(CYCLES_PER_LINE, &palette, &vram, &oam, &mut ic);
            }
            black_box(&ppu.framebuffer);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_ppu_tick);
criterion_main!(benches);
