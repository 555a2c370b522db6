use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emu_core::cpu_z80::{CpuZ80, MemoryZ80};

/// Flat RAM holding a short arithmetic/memory/loop program at 0x0000
struct BenchMemory {
    ram: Vec<u8>,
}

impl BenchMemory {
    fn new() -> Self {
        let mut ram = vec![0; 0x10000];
        let program = [
            0x31, 0xF0, 0xDF, // LD SP,0xDFF0
            0x21, 0x00, 0xC0, // LD HL,0xC000
            0x06, 0x10, // LD B,0x10
            0x3E, 0x01, // loop: LD A,1
            0x86, // ADD A,(HL)
            0x77, // LD (HL),A
            0x23, // INC HL
            0xCB, 0x27, // SLA A
            0xDD, 0x21, 0x00, 0xC1, // LD IX,0xC100
            0xDD, 0x77, 0x02, // LD (IX+2),A
            0xC5, // PUSH BC
            0xC1, // POP BC
            0x10, 0xEE, // DJNZ loop
            0xC3, 0x00, 0x00, // JP 0
        ];
        ram[..program.len()].copy_from_slice(&program);
        Self { ram }
    }
}

impl MemoryZ80 for BenchMemory {
    fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.ram[addr as usize] = val;
    }
}

fn bench_cpu_step(c: &mut Criterion) {
    c.bench_function("cpu_z80_single_instruction", |b| {
        b.iter(|| {
            let mut cpu = CpuZ80::new(BenchMemory::new());
            let _ = cpu.step();
            black_box(cpu.regs.sp);
        });
    });
}

fn bench_cpu_multiple_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_z80_multiple_steps");

    for step_count in [100, 1000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(step_count),
            step_count,
            |b, &count| {
                let mut cpu = CpuZ80::new(BenchMemory::new());
                b.iter(|| {
                    cpu.reset();
                    for _ in 0..count {
                        let _ = cpu.step();
                    }
                    black_box(cpu.cycles);
                });
            },
        );
    }

    group.finish();
}

/// Roughly one NTSC frame worth of cycles
fn bench_cpu_frame(c: &mut Criterion) {
    c.bench_function("cpu_z80_frame_59736_cycles", |b| {
        let mut cpu = CpuZ80::new(BenchMemory::new());
        b.iter(|| {
            cpu.reset();
            while cpu.cycles < 59_736 {
                let _ = cpu.step();
            }
            black_box(cpu.regs.af.get());
        });
    });
}

criterion_group!(
    benches,
    bench_cpu_step,
    bench_cpu_multiple_steps,
    bench_cpu_frame
);
criterion_main!(benches);
