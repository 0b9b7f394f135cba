// CPU Benchmarks
// Performance benchmarks for ARM7TDMI instruction execution

use criterion::{criterion_group, criterion_main, Criterion};
use gba_rs::System;
use std::hint::black_box;

/// `MOV R0, R0` (cond=AL) - the canonical ARM NOP encoding, 1S cycle.
const ARM_NOP: u32 = 0xE1A0_0000;
/// `B $` (branch to self, cond=AL) - infinite loop, exercises the branch
/// pipeline-flush path every step.
const ARM_BRANCH_SELF: u32 = 0xEAFF_FFFE;

fn rom_of(word: u32, words: usize) -> Vec<u8> {
    let mut rom = Vec::with_capacity(words * 4);
    for _ in 0..words {
        rom.extend_from_slice(&word.to_le_bytes());
    }
    rom
}

fn booted_system(rom: Vec<u8>) -> System {
    let mut system = System::new();
    system.bus.load_rom(&rom);
    system.skip_bios_boot();
    system
}

fn bench_cpu_instructions(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_instructions");

    group.bench_function("arm_nop", |b| {
        let mut system = booted_system(rom_of(ARM_NOP, 4096));

        b.iter(|| {
            gba_rs::cpu::step(black_box(&mut system));
        });
    });

    group.bench_function("arm_branch_self", |b| {
        let mut system = booted_system(rom_of(ARM_BRANCH_SELF, 1));

        b.iter(|| {
            gba_rs::cpu::step(black_box(&mut system));
        });
    });

    group.finish();
}

/// Benchmark CPU execution over a whole visible frame's worth of cycles,
/// the unit `System::run_frame` actually drives in the host loop.
fn bench_frame_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_execution");
    group.sample_size(20);

    group.bench_function("one_frame", |b| {
        let rom = rom_of(ARM_NOP, 64 * 1024 / 4);

        b.iter_batched(
            || booted_system(rom.clone()),
            |mut system| {
                system.run_frame();
                black_box(&system);
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_cpu_instructions, bench_frame_execution);
criterion_main!(benches);
