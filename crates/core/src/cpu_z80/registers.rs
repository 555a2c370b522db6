//! Z80 register file
//!
//! Register pairs are stored as a single `u16`; the 8-bit halves are views
//! computed with shifts and masks, so a write through either side is visible
//! through the other.

use serde::{Deserialize, Serialize};

/// A 16-bit register pair with independently addressable halves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register16(u16);

impl Register16 {
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn get(self) -> u16 {
        self.0
    }

    #[inline]
    pub fn set(&mut self, value: u16) {
        self.0 = value;
    }

    /// High byte (B of BC, A of AF, ...)
    #[inline]
    pub const fn hi(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Low byte (C of BC, F of AF, ...)
    #[inline]
    pub const fn lo(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub fn set_hi(&mut self, value: u8) {
        self.0 = (self.0 & 0x00FF) | ((value as u16) << 8);
    }

    #[inline]
    pub fn set_lo(&mut self, value: u8) {
        self.0 = (self.0 & 0xFF00) | value as u16;
    }
}

/// The alternate AF'/BC'/DE'/HL' bank
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowRegisters {
    pub af: Register16,
    pub bc: Register16,
    pub de: Register16,
    pub hl: Register16,
}

/// Complete programmer-visible register state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub af: Register16,
    pub bc: Register16,
    pub de: Register16,
    pub hl: Register16,
    pub ix: Register16,
    pub iy: Register16,
    /// I in the high byte, R in the low byte
    pub ir: Register16,
    pub shadow: ShadowRegisters,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    #[inline]
    pub fn a(&self) -> u8 {
        self.af.hi()
    }

    #[inline]
    pub fn set_a(&mut self, value: u8) {
        self.af.set_hi(value);
    }

    #[inline]
    pub fn f(&self) -> u8 {
        self.af.lo()
    }

    #[inline]
    pub fn set_f(&mut self, value: u8) {
        self.af.set_lo(value);
    }

    /// EX AF,AF'
    pub fn exchange_af(&mut self) {
        std::mem::swap(&mut self.af, &mut self.shadow.af);
    }

    /// EXX
    pub fn exchange_main(&mut self) {
        std::mem::swap(&mut self.bc, &mut self.shadow.bc);
        std::mem::swap(&mut self.de, &mut self.shadow.de);
        std::mem::swap(&mut self.hl, &mut self.shadow.hl);
    }

    /// Bump the 7 refresh bits of R, leaving bit 7 alone
    #[inline]
    pub fn increment_refresh(&mut self) {
        let r = self.ir.lo();
        self.ir.set_lo((r & 0x80) | (r.wrapping_add(1) & 0x7F));
    }
}
