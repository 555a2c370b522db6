//! Unprefixed opcode table, shared with the DD/FD index pages
//!
//! DD and FD re-run this table with IX or IY standing in for HL. Instructions
//! that never touch HL behave as if unprefixed and just pay the 4-cycle prefix
//! fetch.

use super::{CpuZ80, Index, MemoryZ80, Z80Error, FLAG_C, FLAG_H, FLAG_N};

impl<M: MemoryZ80> CpuZ80<M> {
    pub(super) fn execute(&mut self, opcode: u8) -> Result<u32, Z80Error> {
        self.execute_main(opcode, Index::Hl)
    }

    fn execute_indexed(&mut self, idx: Index) -> Result<u32, Z80Error> {
        // A prefix followed by another prefix acts as a NOP; the next step
        // starts over from the second prefix without an interrupt in between
        let next = self.memory.read(self.regs.pc);
        if matches!(next, 0xDD | 0xED | 0xFD) {
            self.prefix_pending = true;
            return Ok(4);
        }

        let opcode = self.fetch_opcode();
        if opcode == 0xCB {
            return Ok(self.execute_index_cb(idx));
        }
        Ok(4 + self.execute_main(opcode, idx)?)
    }

    fn execute_main(&mut self, opcode: u8, idx: Index) -> Result<u32, Z80Error> {
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;
        let p = (opcode >> 4) & 0x03;

        let cycles = match opcode {
            // NOP
            0x00 => 4,

            // LD rp,nn
            0x01 | 0x11 | 0x21 | 0x31 => {
                let val = self.read_pc_u16();
                self.set_rp(p, idx, val);
                10
            }

            // LD (BC),A / LD (DE),A
            0x02 => {
                self.memory.write(self.regs.bc.get(), self.regs.a());
                7
            }
            0x12 => {
                self.memory.write(self.regs.de.get(), self.regs.a());
                7
            }

            // LD A,(BC) / LD A,(DE)
            0x0A => {
                let val = self.memory.read(self.regs.bc.get());
                self.regs.set_a(val);
                7
            }
            0x1A => {
                let val = self.memory.read(self.regs.de.get());
                self.regs.set_a(val);
                7
            }

            // INC rp / DEC rp
            0x03 | 0x13 | 0x23 | 0x33 => {
                let val = self.rp(p, idx).wrapping_add(1);
                self.set_rp(p, idx, val);
                6
            }
            0x0B | 0x1B | 0x2B | 0x3B => {
                let val = self.rp(p, idx).wrapping_sub(1);
                self.set_rp(p, idx, val);
                6
            }

            // INC r / DEC r
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => {
                let val = self.inc8(self.reg8(y, idx));
                self.set_reg8(y, idx, val);
                4
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => {
                let val = self.dec8(self.reg8(y, idx));
                self.set_reg8(y, idx, val);
                4
            }
            0x34 => {
                let (addr, extra) = self.memory_operand(idx);
                let val = self.inc8(self.memory.read(addr));
                self.memory.write(addr, val);
                11 + extra
            }
            0x35 => {
                let (addr, extra) = self.memory_operand(idx);
                let val = self.dec8(self.memory.read(addr));
                self.memory.write(addr, val);
                11 + extra
            }

            // LD r,n
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => {
                let val = self.read_pc();
                self.set_reg8(y, idx, val);
                7
            }
            // LD (HL),n: the displacement precedes the immediate
            0x36 => {
                let (addr, extra) = self.memory_operand(idx);
                let val = self.read_pc();
                self.memory.write(addr, val);
                if extra == 0 {
                    10
                } else {
                    15
                }
            }

            0x07 => {
                self.rlca();
                4
            }
            0x0F => {
                self.rrca();
                4
            }
            0x17 => {
                self.rla();
                4
            }
            0x1F => {
                self.rra();
                4
            }

            // EX AF,AF'
            0x08 => {
                self.regs.exchange_af();
                4
            }

            // ADD HL,rp
            0x09 | 0x19 | 0x29 | 0x39 => {
                let lhs = self.index_reg(idx).get();
                let rhs = self.rp(p, idx);
                let val = self.add16(lhs, rhs);
                self.index_reg_mut(idx).set(val);
                11
            }

            // DJNZ e
            0x10 => {
                let offset = self.read_pc() as i8;
                let b = self.regs.bc.hi().wrapping_sub(1);
                self.regs.bc.set_hi(b);
                if b != 0 {
                    self.jump_relative(offset);
                    13
                } else {
                    8
                }
            }

            // JR e
            0x18 => {
                let offset = self.read_pc() as i8;
                self.jump_relative(offset);
                12
            }

            // JR cc,e (NZ Z NC C only)
            0x20 | 0x28 | 0x30 | 0x38 => {
                let offset = self.read_pc() as i8;
                if self.condition(y - 4) {
                    self.jump_relative(offset);
                    12
                } else {
                    7
                }
            }

            // LD (nn),HL / LD HL,(nn)
            0x22 => {
                let addr = self.read_pc_u16();
                let val = self.index_reg(idx).get();
                self.write_u16(addr, val);
                16
            }
            0x2A => {
                let addr = self.read_pc_u16();
                let val = self.read_u16(addr);
                self.index_reg_mut(idx).set(val);
                16
            }

            // LD (nn),A / LD A,(nn)
            0x32 => {
                let addr = self.read_pc_u16();
                self.memory.write(addr, self.regs.a());
                13
            }
            0x3A => {
                let addr = self.read_pc_u16();
                let val = self.memory.read(addr);
                self.regs.set_a(val);
                13
            }

            0x27 => {
                self.daa();
                4
            }
            // CPL
            0x2F => {
                let a = !self.regs.a();
                self.regs.set_a(a);
                self.set_flag(FLAG_H, true);
                self.set_flag(FLAG_N, true);
                4
            }
            // SCF
            0x37 => {
                self.set_flag(FLAG_C, true);
                self.set_flag(FLAG_H, false);
                self.set_flag(FLAG_N, false);
                4
            }
            // CCF
            0x3F => {
                let carry = self.get_flag(FLAG_C);
                self.set_flag(FLAG_H, carry);
                self.set_flag(FLAG_C, !carry);
                self.set_flag(FLAG_N, false);
                4
            }

            // HALT
            0x76 => {
                self.halted = true;
                4
            }

            // LD r,r'. With a memory operand the other side is always plain H/L.
            0x40..=0x7F => {
                if z == 6 {
                    let (addr, extra) = self.memory_operand(idx);
                    let val = self.memory.read(addr);
                    self.set_reg8(y, Index::Hl, val);
                    7 + extra
                } else if y == 6 {
                    let (addr, extra) = self.memory_operand(idx);
                    let val = self.reg8(z, Index::Hl);
                    self.memory.write(addr, val);
                    7 + extra
                } else {
                    let val = self.reg8(z, idx);
                    self.set_reg8(y, idx, val);
                    4
                }
            }

            // ALU A,r
            0x80..=0xBF => {
                if z == 6 {
                    let (addr, extra) = self.memory_operand(idx);
                    let val = self.memory.read(addr);
                    self.alu_op(y, val);
                    7 + extra
                } else {
                    let val = self.reg8(z, idx);
                    self.alu_op(y, val);
                    4
                }
            }

            // RET cc
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                if self.condition(y) {
                    self.regs.pc = self.pop_u16();
                    11
                } else {
                    5
                }
            }

            // POP rp2
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let val = self.pop_u16();
                self.set_rp2(p, idx, val);
                10
            }

            // JP cc,nn
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let addr = self.read_pc_u16();
                if self.condition(y) {
                    self.regs.pc = addr;
                }
                10
            }

            // JP nn
            0xC3 => {
                self.regs.pc = self.read_pc_u16();
                10
            }

            // CALL cc,nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let addr = self.read_pc_u16();
                if self.condition(y) {
                    self.push_u16(self.regs.pc);
                    self.regs.pc = addr;
                    17
                } else {
                    10
                }
            }

            // PUSH rp2
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                let val = self.rp2(p, idx);
                self.push_u16(val);
                11
            }

            // ALU A,n
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let val = self.read_pc();
                self.alu_op(y, val);
                7
            }

            // RST p
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.push_u16(self.regs.pc);
                self.regs.pc = (opcode & 0x38) as u16;
                11
            }

            // RET
            0xC9 => {
                self.regs.pc = self.pop_u16();
                10
            }

            // CALL nn
            0xCD => {
                let addr = self.read_pc_u16();
                self.push_u16(self.regs.pc);
                self.regs.pc = addr;
                17
            }

            // OUT (n),A: A drives the upper address lines
            0xD3 => {
                let port = self.read_pc() as u16 | ((self.regs.a() as u16) << 8);
                self.memory.io_write(port, self.regs.a());
                11
            }

            // IN A,(n)
            0xDB => {
                let port = self.read_pc() as u16 | ((self.regs.a() as u16) << 8);
                let val = self.memory.io_read(port);
                self.regs.set_a(val);
                11
            }

            // EXX
            0xD9 => {
                self.regs.exchange_main();
                4
            }

            // EX (SP),HL
            0xE3 => {
                let sp = self.regs.sp;
                let from_stack = self.read_u16(sp);
                let val = self.index_reg(idx).get();
                self.write_u16(sp, val);
                self.index_reg_mut(idx).set(from_stack);
                19
            }

            // JP (HL)
            0xE9 => {
                self.regs.pc = self.index_reg(idx).get();
                4
            }

            // EX DE,HL never swaps an index register
            0xEB => {
                std::mem::swap(&mut self.regs.de, &mut self.regs.hl);
                4
            }

            // DI / EI
            0xF3 => {
                self.iff1 = false;
                self.iff2 = false;
                4
            }
            0xFB => {
                self.iff1 = true;
                self.iff2 = true;
                self.ei_pending = true;
                4
            }

            // LD SP,HL
            0xF9 => {
                self.regs.sp = self.index_reg(idx).get();
                6
            }

            0xCB => self.execute_cb(),
            0xED => return self.execute_ed(),
            0xDD => return self.execute_indexed(Index::Ix),
            0xFD => return self.execute_indexed(Index::Iy),
        };

        Ok(cycles)
    }

    fn jump_relative(&mut self, offset: i8) {
        self.regs.pc = self.regs.pc.wrapping_add(offset as i16 as u16);
    }
}
