//! Tests for the Z80 CPU implementation
//!
//! - `tests_8bit`: 8-bit loads, ALU and register operations
//! - `tests_16bit`: register pairs, stack and 16-bit arithmetic
//! - `tests_flags`: flag edge cases (DAA, rotates, BIT, copy bits)
//! - `tests_jumps`: jumps, calls, returns and restarts
//! - `tests_prefixed`: CB/ED/DD/FD pages, block instructions and I/O
//! - `tests_interrupts`: IRQ/NMI acceptance, EI delay and HALT


use super::{CpuZ80, MemoryZ80};

/// Flat 64K RAM with a port log and directly driven interrupt lines
pub(super) struct ArrayMemory {
    pub ram: Box<[u8; 65536]>,
    pub ports: [u8; 256],
    pub port_writes: Vec<(u16, u8)>,
    pub irq: bool,
    pub nmi: bool,
}

impl MemoryZ80 for ArrayMemory {
    fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.ram[addr as usize] = val;
    }

    fn io_read(&mut self, port: u16) -> u8 {
        self.ports[(port & 0xFF) as usize]
    }

    fn io_write(&mut self, port: u16, val: u8) {
        self.port_writes.push((port, val));
    }

    fn irq_pending(&self) -> bool {
        self.irq
    }

    fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi)
    }
}

pub(super) fn make_cpu() -> CpuZ80<ArrayMemory> {
    CpuZ80::new(ArrayMemory {
        ram: Box::new([0; 65536]),
        ports: [0xFF; 256],
        port_writes: Vec::new(),
        irq: false,
        nmi: false,
    })
}

/// CPU with `program` loaded at 0x0000 and SP at 0xDFF0
pub(super) fn cpu_with_program(program: &[u8]) -> CpuZ80<ArrayMemory> {
    let mut cpu = make_cpu();
    cpu.memory.ram[..program.len()].copy_from_slice(program);
    cpu.regs.sp = 0xDFF0;
    cpu
}

pub(super) fn step(cpu: &mut CpuZ80<ArrayMemory>) -> u32 {
    cpu.step().expect("instruction should decode")
}
