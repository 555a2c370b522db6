//! Zilog Z80 CPU core implementation
//!
//! The Z80 extends the 8080 with a shadow register bank, two index registers,
//! prefixed instruction pages (CB/ED/DD/FD) and three interrupt modes. This
//! module provides a reusable Z80 that any system can drive by implementing
//! [`MemoryZ80`].
//!
//! # Execution model
//!
//! Each call to [`CpuZ80::step`] does exactly one of:
//! - accept a pending NMI or maskable interrupt,
//! - burn 4 cycles while halted,
//! - fetch, decode and execute one instruction (including all its prefixes).
//!
//! The two undocumented flag bits (3 and 5) are always cleared before `step`
//! returns.

mod alu;
mod execute;
mod prefixed;
pub mod registers;

#[cfg(test)]
mod tests;

use crate::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use registers::{Register16, Registers, ShadowRegisters};

/// Carry
pub const FLAG_C: u8 = 0b0000_0001;
/// Add/Subtract
pub const FLAG_N: u8 = 0b0000_0010;
/// Parity/Overflow
pub const FLAG_PV: u8 = 0b0000_0100;
/// Undocumented copy of result bit 3
pub const FLAG_X: u8 = 0b0000_1000;
/// Half carry
pub const FLAG_H: u8 = 0b0001_0000;
/// Undocumented copy of result bit 5
pub const FLAG_Y: u8 = 0b0010_0000;
/// Zero
pub const FLAG_Z: u8 = 0b0100_0000;
/// Sign
pub const FLAG_S: u8 = 0b1000_0000;

const COPY_BITS: u8 = FLAG_X | FLAG_Y;

/// Restart address for the non-maskable interrupt
pub const NMI_VECTOR: u16 = 0x0066;
/// Restart address for maskable interrupts in IM 0 / IM 1
pub const IRQ_VECTOR: u16 = 0x0038;

/// Memory and I/O interface for the Z80 CPU
///
/// The CPU owns its implementation of this trait; every memory access, port
/// access and interrupt poll goes through it.
pub trait MemoryZ80 {
    /// Read a byte from memory
    fn read(&self, addr: u16) -> u8;

    /// Write a byte to memory
    fn write(&mut self, addr: u16, val: u8);

    /// Read from an I/O port. The full 16-bit address bus is supplied; most
    /// systems decode only the low byte.
    fn io_read(&mut self, port: u16) -> u8 {
        let _ = port;
        0xFF
    }

    /// Write to an I/O port
    fn io_write(&mut self, port: u16, val: u8) {
        let _ = (port, val);
    }

    /// Level of the /INT line, sampled once per step
    fn irq_pending(&self) -> bool {
        false
    }

    /// Consume an edge on the /NMI line
    fn take_nmi(&mut self) -> bool {
        false
    }
}

/// Errors that stop execution because emulation can no longer be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Z80Error {
    #[error("unknown opcode {prefix:02X} {opcode:02X} at PC={pc:04X}")]
    UnknownOpcode { pc: u16, prefix: u8, opcode: u8 },
}

/// Maskable interrupt response mode selected by IM 0/1/2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterruptMode {
    #[default]
    Mode0,
    Mode1,
    Mode2,
}

/// Which register stands in for HL while executing an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Index {
    Hl,
    Ix,
    Iy,
}

/// Zilog Z80 CPU state
#[derive(Debug)]
pub struct CpuZ80<M: MemoryZ80> {
    pub regs: Registers,

    /// Interrupt enable flip-flops
    pub iff1: bool,
    pub iff2: bool,
    pub im: InterruptMode,

    /// Set by EI; the next step may not accept a maskable interrupt
    pub ei_pending: bool,

    /// Set when a DD/FD prefix was followed by another prefix; the next step
    /// continues that prefix chain and accepts no interrupt
    pub prefix_pending: bool,

    pub halted: bool,

    /// Total cycles executed
    pub cycles: u64,

    /// Memory interface
    pub memory: M,
}

impl<M: MemoryZ80> CpuZ80<M> {
    /// Create a new Z80 CPU
    pub fn new(memory: M) -> Self {
        Self {
            regs: Registers::default(),
            iff1: false,
            iff2: false,
            im: InterruptMode::Mode0,
            ei_pending: false,
            prefix_pending: false,
            halted: false,
            cycles: 0,
            memory,
        }
    }

    /// Reset the CPU (PC, I, R cleared, interrupts disabled, IM 0)
    pub fn reset(&mut self) {
        self.regs = Registers::default();
        self.iff1 = false;
        self.iff2 = false;
        self.im = InterruptMode::Mode0;
        self.ei_pending = false;
        self.prefix_pending = false;
        self.halted = false;
        self.cycles = 0;
    }

    /// Execute one step and return the cycles it took
    pub fn step(&mut self) -> Result<u32, Z80Error> {
        let cycles = match self.poll_interrupts() {
            Some(cycles) => cycles,
            None if self.halted => {
                self.regs.increment_refresh();
                4
            }
            None => {
                let opcode = self.fetch_opcode();
                self.execute(opcode)?
            }
        };

        let f = self.regs.f();
        self.regs.set_f(f & !COPY_BITS);
        self.cycles += cycles as u64;
        Ok(cycles)
    }

    /// Accept an NMI or maskable interrupt if one is due
    fn poll_interrupts(&mut self) -> Option<u32> {
        let ei_delay = std::mem::take(&mut self.ei_pending);
        if std::mem::take(&mut self.prefix_pending) {
            return None;
        }

        if self.memory.take_nmi() {
            log(LogCategory::Interrupts, LogLevel::Trace, || {
                format!("Z80: NMI accepted at PC={:04X}", self.regs.pc)
            });
            self.iff2 = self.iff1;
            self.iff1 = false;
            self.halted = false;
            self.regs.increment_refresh();
            self.push_u16(self.regs.pc);
            self.regs.pc = NMI_VECTOR;
            return Some(11);
        }

        if ei_delay || !self.iff1 || !self.memory.irq_pending() {
            return None;
        }

        log(LogCategory::Interrupts, LogLevel::Trace, || {
            format!(
                "Z80: IRQ accepted at PC={:04X} ({:?})",
                self.regs.pc, self.im
            )
        });
        self.iff1 = false;
        self.iff2 = false;
        self.halted = false;
        self.regs.increment_refresh();
        self.push_u16(self.regs.pc);

        match self.im {
            // The SMS data bus floats to 0xFF, which IM 0 executes as RST 38h
            InterruptMode::Mode0 | InterruptMode::Mode1 => {
                self.regs.pc = IRQ_VECTOR;
                Some(13)
            }
            InterruptMode::Mode2 => {
                let table = ((self.regs.ir.hi() as u16) << 8) | 0xFF;
                self.regs.pc = self.read_u16(table);
                Some(19)
            }
        }
    }

    // Fetch helpers

    /// Opcode fetch (M1 cycle): bumps the refresh counter
    fn fetch_opcode(&mut self) -> u8 {
        self.regs.increment_refresh();
        self.read_pc()
    }

    fn read_pc(&mut self) -> u8 {
        let val = self.memory.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        val
    }

    fn read_pc_u16(&mut self) -> u16 {
        let lo = self.read_pc() as u16;
        let hi = self.read_pc() as u16;
        (hi << 8) | lo
    }

    fn read_u16(&self, addr: u16) -> u16 {
        let lo = self.memory.read(addr) as u16;
        let hi = self.memory.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn write_u16(&mut self, addr: u16, val: u16) {
        self.memory.write(addr, val as u8);
        self.memory.write(addr.wrapping_add(1), (val >> 8) as u8);
    }

    fn push_u16(&mut self, val: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.memory.write(self.regs.sp, (val >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.memory.write(self.regs.sp, val as u8);
    }

    fn pop_u16(&mut self) -> u16 {
        let lo = self.memory.read(self.regs.sp) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.memory.read(self.regs.sp) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    // Flag operations

    #[inline]
    pub fn get_flag(&self, flag: u8) -> bool {
        self.regs.f() & flag != 0
    }

    #[inline]
    fn set_flag(&mut self, flag: u8, val: bool) {
        let f = self.regs.f();
        self.regs.set_f(if val { f | flag } else { f & !flag });
    }

    /// Evaluate condition code `cc` (NZ, Z, NC, C, PO, PE, P, M)
    fn condition(&self, cc: u8) -> bool {
        match cc & 0x07 {
            0 => !self.get_flag(FLAG_Z),
            1 => self.get_flag(FLAG_Z),
            2 => !self.get_flag(FLAG_C),
            3 => self.get_flag(FLAG_C),
            4 => !self.get_flag(FLAG_PV),
            5 => self.get_flag(FLAG_PV),
            6 => !self.get_flag(FLAG_S),
            _ => self.get_flag(FLAG_S),
        }
    }

    // Register decoding

    fn index_reg(&self, idx: Index) -> Register16 {
        match idx {
            Index::Hl => self.regs.hl,
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    fn index_reg_mut(&mut self, idx: Index) -> &mut Register16 {
        match idx {
            Index::Hl => &mut self.regs.hl,
            Index::Ix => &mut self.regs.ix,
            Index::Iy => &mut self.regs.iy,
        }
    }

    /// 8-bit register by its 3-bit encoding (B C D E H L - A). Under a DD/FD
    /// prefix H and L select the index register halves. Code 6 is the memory
    /// operand and must be resolved by the caller.
    fn reg8(&self, r: u8, idx: Index) -> u8 {
        match r {
            0 => self.regs.bc.hi(),
            1 => self.regs.bc.lo(),
            2 => self.regs.de.hi(),
            3 => self.regs.de.lo(),
            4 => self.index_reg(idx).hi(),
            5 => self.index_reg(idx).lo(),
            7 => self.regs.a(),
            _ => unreachable!("memory operand decoded as register"),
        }
    }

    fn set_reg8(&mut self, r: u8, idx: Index, val: u8) {
        match r {
            0 => self.regs.bc.set_hi(val),
            1 => self.regs.bc.set_lo(val),
            2 => self.regs.de.set_hi(val),
            3 => self.regs.de.set_lo(val),
            4 => self.index_reg_mut(idx).set_hi(val),
            5 => self.index_reg_mut(idx).set_lo(val),
            7 => self.regs.set_a(val),
            _ => unreachable!("memory operand decoded as register"),
        }
    }

    /// 16-bit register pair by encoding (BC DE HL SP)
    fn rp(&self, p: u8, idx: Index) -> u16 {
        match p & 0x03 {
            0 => self.regs.bc.get(),
            1 => self.regs.de.get(),
            2 => self.index_reg(idx).get(),
            _ => self.regs.sp,
        }
    }

    fn set_rp(&mut self, p: u8, idx: Index, val: u16) {
        match p & 0x03 {
            0 => self.regs.bc.set(val),
            1 => self.regs.de.set(val),
            2 => self.index_reg_mut(idx).set(val),
            _ => self.regs.sp = val,
        }
    }

    /// Register pair for PUSH/POP (BC DE HL AF)
    fn rp2(&self, p: u8, idx: Index) -> u16 {
        match p & 0x03 {
            3 => self.regs.af.get(),
            p => self.rp(p, idx),
        }
    }

    fn set_rp2(&mut self, p: u8, idx: Index, val: u16) {
        match p & 0x03 {
            3 => self.regs.af.set(val),
            p => self.set_rp(p, idx, val),
        }
    }

    /// Resolve the `(HL)` operand: HL itself, or IX/IY plus a signed
    /// displacement fetched from the instruction stream. Returns the address and
    /// the extra cycles the displacement costs.
    fn memory_operand(&mut self, idx: Index) -> (u16, u32) {
        match idx {
            Index::Hl => (self.regs.hl.get(), 0),
            _ => {
                let d = self.read_pc() as i8;
                let base = self.index_reg(idx).get();
                (base.wrapping_add(d as i16 as u16), 8)
            }
        }
    }
}
