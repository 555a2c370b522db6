//! CB (bit/rotate), DD CB / FD CB (indexed bit/rotate) and ED (extended) pages

use super::{
    CpuZ80, Index, InterruptMode, MemoryZ80, Z80Error, FLAG_C, FLAG_H, FLAG_N, FLAG_PV,
    FLAG_S, FLAG_Z,
};
use crate::bit_util::{clear_bit, set_bit};
use crate::logging::{log, LogCategory, LogLevel};

impl<M: MemoryZ80> CpuZ80<M> {
    pub(super) fn execute_cb(&mut self) -> u32 {
        let opcode = self.fetch_opcode();
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;

        if z == 6 {
            let addr = self.regs.hl.get();
            let val = self.memory.read(addr);
            if opcode >> 6 == 1 {
                self.bit(y, val);
                return 12;
            }
            let result = self.cb_operation(opcode, val);
            self.memory.write(addr, result);
            return 15;
        }

        let val = self.reg8(z, Index::Hl);
        if opcode >> 6 == 1 {
            self.bit(y, val);
        } else {
            let result = self.cb_operation(opcode, val);
            self.set_reg8(z, Index::Hl, result);
        }
        8
    }

    /// DD CB d op / FD CB d op. Neither the displacement nor the final opcode
    /// is an M1 fetch.
    pub(super) fn execute_index_cb(&mut self, idx: Index) -> u32 {
        let d = self.read_pc() as i8;
        let opcode = self.read_pc();
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;

        let addr = self.index_reg(idx).get().wrapping_add(d as i16 as u16);
        let val = self.memory.read(addr);

        if opcode >> 6 == 1 {
            self.bit(y, val);
            return 20;
        }

        let result = self.cb_operation(opcode, val);
        self.memory.write(addr, result);
        // Undocumented: the result is also copied into a register
        if z != 6 {
            self.set_reg8(z, Index::Hl, result);
        }
        23
    }

    fn cb_operation(&mut self, opcode: u8, val: u8) -> u8 {
        let y = (opcode >> 3) & 0x07;
        match opcode >> 6 {
            0 => self.rotate_shift(y, val),
            2 => clear_bit(val, y),
            _ => set_bit(val, y),
        }
    }

    pub(super) fn execute_ed(&mut self) -> Result<u32, Z80Error> {
        let pc = self.regs.pc.wrapping_sub(1);
        let opcode = self.fetch_opcode();
        let y = (opcode >> 3) & 0x07;
        let p = (opcode >> 4) & 0x03;

        let cycles = match opcode {
            // IN r,(C); r=6 only sets flags
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                let val = self.memory.io_read(self.regs.bc.get());
                self.set_in_flags(val);
                if y != 6 {
                    self.set_reg8(y, Index::Hl, val);
                }
                12
            }

            // OUT (C),r; r=6 outputs zero
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                let val = if y == 6 { 0 } else { self.reg8(y, Index::Hl) };
                self.memory.io_write(self.regs.bc.get(), val);
                12
            }

            // SBC HL,rp / ADC HL,rp
            0x42 | 0x52 | 0x62 | 0x72 => {
                let val = self.sbc16(self.regs.hl.get(), self.rp(p, Index::Hl));
                self.regs.hl.set(val);
                15
            }
            0x4A | 0x5A | 0x6A | 0x7A => {
                let val = self.adc16(self.regs.hl.get(), self.rp(p, Index::Hl));
                self.regs.hl.set(val);
                15
            }

            // LD (nn),rp / LD rp,(nn)
            0x43 | 0x53 | 0x63 | 0x73 => {
                let addr = self.read_pc_u16();
                let val = self.rp(p, Index::Hl);
                self.write_u16(addr, val);
                20
            }
            0x4B | 0x5B | 0x6B | 0x7B => {
                let addr = self.read_pc_u16();
                let val = self.read_u16(addr);
                self.set_rp(p, Index::Hl, val);
                20
            }

            // NEG
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => {
                self.neg();
                8
            }

            // RETN / RETI
            0x45 | 0x4D | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => {
                self.iff1 = self.iff2;
                self.regs.pc = self.pop_u16();
                14
            }

            // IM 0/1/2
            0x46 | 0x4E | 0x66 | 0x6E => {
                self.im = InterruptMode::Mode0;
                8
            }
            0x56 | 0x76 => {
                self.im = InterruptMode::Mode1;
                8
            }
            0x5E | 0x7E => {
                self.im = InterruptMode::Mode2;
                8
            }

            // LD I,A / LD R,A / LD A,I / LD A,R
            0x47 => {
                let a = self.regs.a();
                self.regs.ir.set_hi(a);
                9
            }
            0x4F => {
                let a = self.regs.a();
                self.regs.ir.set_lo(a);
                9
            }
            0x57 => {
                let val = self.regs.ir.hi();
                self.regs.set_a(val);
                self.set_ld_air_flags(val);
                9
            }
            0x5F => {
                let val = self.regs.ir.lo();
                self.regs.set_a(val);
                self.set_ld_air_flags(val);
                9
            }

            // RRD / RLD
            0x67 => {
                let addr = self.regs.hl.get();
                let mem = self.memory.read(addr);
                let a = self.regs.a();
                self.memory.write(addr, (a << 4) | (mem >> 4));
                let a = (a & 0xF0) | (mem & 0x0F);
                self.regs.set_a(a);
                self.set_in_flags(a);
                18
            }
            0x6F => {
                let addr = self.regs.hl.get();
                let mem = self.memory.read(addr);
                let a = self.regs.a();
                self.memory.write(addr, (mem << 4) | (a & 0x0F));
                let a = (a & 0xF0) | (mem >> 4);
                self.regs.set_a(a);
                self.set_in_flags(a);
                18
            }

            0xA0 => self.block_load(1, false),
            0xA8 => self.block_load(-1, false),
            0xB0 => self.block_load(1, true),
            0xB8 => self.block_load(-1, true),

            0xA1 => self.block_compare(1, false),
            0xA9 => self.block_compare(-1, false),
            0xB1 => self.block_compare(1, true),
            0xB9 => self.block_compare(-1, true),

            0xA2 => self.block_in(1, false),
            0xAA => self.block_in(-1, false),
            0xB2 => self.block_in(1, true),
            0xBA => self.block_in(-1, true),

            0xA3 => self.block_out(1, false),
            0xAB => self.block_out(-1, false),
            0xB3 => self.block_out(1, true),
            0xBB => self.block_out(-1, true),

            _ => {
                log(LogCategory::CPU, LogLevel::Error, || {
                    format!("Z80: unknown opcode ED {:02X} at PC={:04X}", opcode, pc)
                });
                return Err(Z80Error::UnknownOpcode {
                    pc,
                    prefix: 0xED,
                    opcode,
                });
            }
        };

        Ok(cycles)
    }

    /// Rewind PC onto the ED prefix so a repeating block instruction runs again
    fn repeat_block(&mut self) -> u32 {
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        21
    }

    /// LDI / LDD / LDIR / LDDR
    fn block_load(&mut self, step: i16, repeat: bool) -> u32 {
        let hl = self.regs.hl.get();
        let de = self.regs.de.get();
        let val = self.memory.read(hl);
        self.memory.write(de, val);

        self.regs.hl.set(hl.wrapping_add(step as u16));
        self.regs.de.set(de.wrapping_add(step as u16));
        let bc = self.regs.bc.get().wrapping_sub(1);
        self.regs.bc.set(bc);

        self.set_flag(FLAG_H, false);
        self.set_flag(FLAG_N, false);
        self.set_flag(FLAG_PV, bc != 0);

        if repeat && bc != 0 {
            self.repeat_block()
        } else {
            16
        }
    }

    /// CPI / CPD / CPIR / CPDR: carry preserved
    fn block_compare(&mut self, step: i16, repeat: bool) -> u32 {
        let hl = self.regs.hl.get();
        let val = self.memory.read(hl);
        let a = self.regs.a();
        let result = a.wrapping_sub(val);

        self.regs.hl.set(hl.wrapping_add(step as u16));
        let bc = self.regs.bc.get().wrapping_sub(1);
        self.regs.bc.set(bc);

        let mut f = (self.regs.f() & FLAG_C) | FLAG_N | (result & FLAG_S);
        if result == 0 {
            f |= FLAG_Z;
        }
        if (a & 0x0F) < (val & 0x0F) {
            f |= FLAG_H;
        }
        if bc != 0 {
            f |= FLAG_PV;
        }
        self.regs.set_f(f);

        if repeat && bc != 0 && result != 0 {
            self.repeat_block()
        } else {
            16
        }
    }

    /// INI / IND / INIR / INDR
    fn block_in(&mut self, step: i16, repeat: bool) -> u32 {
        let val = self.memory.io_read(self.regs.bc.get());
        let hl = self.regs.hl.get();
        self.memory.write(hl, val);
        self.regs.hl.set(hl.wrapping_add(step as u16));

        let b = self.regs.bc.hi().wrapping_sub(1);
        self.regs.bc.set_hi(b);
        self.set_flag(FLAG_Z, b == 0);
        self.set_flag(FLAG_N, true);

        if repeat && b != 0 {
            self.repeat_block()
        } else {
            16
        }
    }

    /// OUTI / OUTD / OTIR / OTDR. B is decremented before it reaches the
    /// port address.
    fn block_out(&mut self, step: i16, repeat: bool) -> u32 {
        let hl = self.regs.hl.get();
        let val = self.memory.read(hl);
        let b = self.regs.bc.hi().wrapping_sub(1);
        self.regs.bc.set_hi(b);
        self.memory.io_write(self.regs.bc.get(), val);
        self.regs.hl.set(hl.wrapping_add(step as u16));

        self.set_flag(FLAG_Z, b == 0);
        self.set_flag(FLAG_N, true);

        if repeat && b != 0 {
            self.repeat_block()
        } else {
            16
        }
    }
}
