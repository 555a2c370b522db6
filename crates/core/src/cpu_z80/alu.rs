//! Arithmetic, logic and rotate operations with Z80 flag semantics

use super::{
    CpuZ80, MemoryZ80, FLAG_C, FLAG_H, FLAG_N, FLAG_PV, FLAG_S, FLAG_Z,
};
use crate::bit_util::{even_parity, test_bit};

/// S, Z and P/V(parity) for a logic or rotate result
#[inline]
fn sz_parity(val: u8) -> u8 {
    let mut f = val & FLAG_S;
    if val == 0 {
        f |= FLAG_Z;
    }
    if even_parity(val) {
        f |= FLAG_PV;
    }
    f
}

#[inline]
fn sz(val: u8) -> u8 {
    let mut f = val & FLAG_S;
    if val == 0 {
        f |= FLAG_Z;
    }
    f
}

impl<M: MemoryZ80> CpuZ80<M> {
    /// Dispatch the eight accumulator operations by their 3-bit encoding
    /// (ADD ADC SUB SBC AND XOR OR CP)
    pub(super) fn alu_op(&mut self, op: u8, val: u8) {
        match op & 0x07 {
            0 => self.add8(val, false),
            1 => self.add8(val, self.get_flag(FLAG_C)),
            2 => self.sub8(val, false),
            3 => self.sub8(val, self.get_flag(FLAG_C)),
            4 => self.and8(val),
            5 => self.xor8(val),
            6 => self.or8(val),
            _ => self.cp8(val),
        }
    }

    pub(super) fn add8(&mut self, val: u8, carry: bool) {
        let a = self.regs.a();
        let c = carry as u16;
        let result = a as u16 + val as u16 + c;
        let r = result as u8;

        let mut f = sz(r);
        if (a & 0x0F) + (val & 0x0F) + c as u8 > 0x0F {
            f |= FLAG_H;
        }
        if (a ^ val) & 0x80 == 0 && (a ^ r) & 0x80 != 0 {
            f |= FLAG_PV;
        }
        if result > 0xFF {
            f |= FLAG_C;
        }
        self.regs.set_f(f);
        self.regs.set_a(r);
    }

    /// A - val - carry, flags set, result returned without storing
    fn sub8_flags(&mut self, val: u8, carry: bool) -> u8 {
        let a = self.regs.a();
        let c = carry as u8;
        let r = a.wrapping_sub(val).wrapping_sub(c);

        let mut f = sz(r) | FLAG_N;
        if (a & 0x0F) < (val & 0x0F) + c {
            f |= FLAG_H;
        }
        if (a ^ val) & 0x80 != 0 && (a ^ r) & 0x80 != 0 {
            f |= FLAG_PV;
        }
        if (a as u16) < val as u16 + c as u16 {
            f |= FLAG_C;
        }
        self.regs.set_f(f);
        r
    }

    pub(super) fn sub8(&mut self, val: u8, carry: bool) {
        let r = self.sub8_flags(val, carry);
        self.regs.set_a(r);
    }

    pub(super) fn cp8(&mut self, val: u8) {
        self.sub8_flags(val, false);
    }

    pub(super) fn and8(&mut self, val: u8) {
        let r = self.regs.a() & val;
        self.regs.set_a(r);
        self.regs.set_f(sz_parity(r) | FLAG_H);
    }

    pub(super) fn or8(&mut self, val: u8) {
        let r = self.regs.a() | val;
        self.regs.set_a(r);
        self.regs.set_f(sz_parity(r));
    }

    pub(super) fn xor8(&mut self, val: u8) {
        let r = self.regs.a() ^ val;
        self.regs.set_a(r);
        self.regs.set_f(sz_parity(r));
    }

    /// INC r: carry is preserved
    pub(super) fn inc8(&mut self, val: u8) -> u8 {
        let r = val.wrapping_add(1);
        let mut f = (self.regs.f() & FLAG_C) | sz(r);
        if val & 0x0F == 0x0F {
            f |= FLAG_H;
        }
        if val == 0x7F {
            f |= FLAG_PV;
        }
        self.regs.set_f(f);
        r
    }

    /// DEC r: carry is preserved
    pub(super) fn dec8(&mut self, val: u8) -> u8 {
        let r = val.wrapping_sub(1);
        let mut f = (self.regs.f() & FLAG_C) | sz(r) | FLAG_N;
        if val & 0x0F == 0x00 {
            f |= FLAG_H;
        }
        if val == 0x80 {
            f |= FLAG_PV;
        }
        self.regs.set_f(f);
        r
    }

    pub(super) fn neg(&mut self) {
        let a = self.regs.a();
        self.regs.set_a(0);
        self.sub8(a, false);
    }

    /// ADD HL,rp (also IX/IY): S, Z and P/V untouched
    pub(super) fn add16(&mut self, lhs: u16, rhs: u16) -> u16 {
        let result = lhs as u32 + rhs as u32;
        self.set_flag(FLAG_H, (lhs & 0x0FFF) + (rhs & 0x0FFF) > 0x0FFF);
        self.set_flag(FLAG_N, false);
        self.set_flag(FLAG_C, result > 0xFFFF);
        result as u16
    }

    pub(super) fn adc16(&mut self, lhs: u16, rhs: u16) -> u16 {
        let c = self.get_flag(FLAG_C) as u32;
        let result = lhs as u32 + rhs as u32 + c;
        let r = result as u16;

        let mut f = ((r >> 8) as u8) & FLAG_S;
        if r == 0 {
            f |= FLAG_Z;
        }
        if (lhs & 0x0FFF) as u32 + (rhs & 0x0FFF) as u32 + c > 0x0FFF {
            f |= FLAG_H;
        }
        if (lhs ^ rhs) & 0x8000 == 0 && (lhs ^ r) & 0x8000 != 0 {
            f |= FLAG_PV;
        }
        if result > 0xFFFF {
            f |= FLAG_C;
        }
        self.regs.set_f(f);
        r
    }

    pub(super) fn sbc16(&mut self, lhs: u16, rhs: u16) -> u16 {
        let c = self.get_flag(FLAG_C) as u32;
        let r = (lhs as u32).wrapping_sub(rhs as u32).wrapping_sub(c) as u16;

        let mut f = (((r >> 8) as u8) & FLAG_S) | FLAG_N;
        if r == 0 {
            f |= FLAG_Z;
        }
        if ((lhs & 0x0FFF) as u32) < (rhs & 0x0FFF) as u32 + c {
            f |= FLAG_H;
        }
        if (lhs ^ rhs) & 0x8000 != 0 && (lhs ^ r) & 0x8000 != 0 {
            f |= FLAG_PV;
        }
        if (lhs as u32) < rhs as u32 + c {
            f |= FLAG_C;
        }
        self.regs.set_f(f);
        r
    }

    pub(super) fn daa(&mut self) {
        let a = self.regs.a();
        let n = self.get_flag(FLAG_N);
        let h = self.get_flag(FLAG_H);
        let mut carry = self.get_flag(FLAG_C);

        let mut correction = 0u8;
        if h || (a & 0x0F) > 9 {
            correction |= 0x06;
        }
        if carry || a > 0x99 {
            correction |= 0x60;
            carry = true;
        }

        let r = if n {
            a.wrapping_sub(correction)
        } else {
            a.wrapping_add(correction)
        };
        let half = if n {
            h && (a & 0x0F) < 6
        } else {
            (a & 0x0F) > 9
        };

        let mut f = sz_parity(r) | (self.regs.f() & FLAG_N);
        if half {
            f |= FLAG_H;
        }
        if carry {
            f |= FLAG_C;
        }
        self.regs.set_a(r);
        self.regs.set_f(f);
    }

    // Accumulator rotates: only C changes (H and N reset)

    pub(super) fn rlca(&mut self) {
        let a = self.regs.a().rotate_left(1);
        self.regs.set_a(a);
        self.set_accumulator_rotate_flags(a & 0x01 != 0);
    }

    pub(super) fn rrca(&mut self) {
        let a = self.regs.a();
        self.regs.set_a(a.rotate_right(1));
        self.set_accumulator_rotate_flags(a & 0x01 != 0);
    }

    pub(super) fn rla(&mut self) {
        let a = self.regs.a();
        let carry_in = self.get_flag(FLAG_C) as u8;
        self.regs.set_a((a << 1) | carry_in);
        self.set_accumulator_rotate_flags(a & 0x80 != 0);
    }

    pub(super) fn rra(&mut self) {
        let a = self.regs.a();
        let carry_in = (self.get_flag(FLAG_C) as u8) << 7;
        self.regs.set_a((a >> 1) | carry_in);
        self.set_accumulator_rotate_flags(a & 0x01 != 0);
    }

    fn set_accumulator_rotate_flags(&mut self, carry: bool) {
        let f = self.regs.f() & (FLAG_S | FLAG_Z | FLAG_PV);
        self.regs.set_f(if carry { f | FLAG_C } else { f });
    }

    /// CB-page rotate/shift selected by `op` (RLC RRC RL RR SLA SRA SLL SRL)
    pub(super) fn rotate_shift(&mut self, op: u8, val: u8) -> u8 {
        let carry_in = self.get_flag(FLAG_C) as u8;
        let (r, carry) = match op & 0x07 {
            0 => (val.rotate_left(1), val & 0x80 != 0),
            1 => (val.rotate_right(1), val & 0x01 != 0),
            2 => ((val << 1) | carry_in, val & 0x80 != 0),
            3 => ((val >> 1) | (carry_in << 7), val & 0x01 != 0),
            4 => (val << 1, val & 0x80 != 0),
            5 => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
            6 => ((val << 1) | 0x01, val & 0x80 != 0),
            _ => (val >> 1, val & 0x01 != 0),
        };
        let mut f = sz_parity(r);
        if carry {
            f |= FLAG_C;
        }
        self.regs.set_f(f);
        r
    }

    /// BIT b,val: Z (and P/V) mirror the inverted bit, carry preserved
    pub(super) fn bit(&mut self, bit: u8, val: u8) {
        let set = test_bit(val, bit);
        let mut f = (self.regs.f() & FLAG_C) | FLAG_H;
        if !set {
            f |= FLAG_Z | FLAG_PV;
        }
        if bit == 7 && set {
            f |= FLAG_S;
        }
        self.regs.set_f(f);
    }

    /// Flags after IN r,(C) and the LD A,I / LD A,R family: carry preserved
    pub(super) fn set_in_flags(&mut self, val: u8) {
        let f = (self.regs.f() & FLAG_C) | sz_parity(val);
        self.regs.set_f(f);
    }

    pub(super) fn set_ld_air_flags(&mut self, val: u8) {
        let mut f = (self.regs.f() & FLAG_C) | sz(val);
        if self.iff2 {
            f |= FLAG_PV;
        }
        self.regs.set_f(f);
    }
}
