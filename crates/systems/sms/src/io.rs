//! I/O port decoding and the hardware aggregate seen by the CPU
//!
//! The SMS decodes only the low byte of the port address, and only partially:
//!
//! | Ports     | Even                 | Odd                    |
//! |-----------|----------------------|------------------------|
//! | 0x00-0x3F | memory control (W)   | I/O control (W)        |
//! | 0x40-0x7F | V counter (R) / PSG  | H counter (R) / PSG    |
//! | 0x80-0xBF | VDP data             | VDP control / status   |
//! | 0xC0-0xFF | joypad port A (R)    | joypad port B (R)      |

use emu_core::apu::{Sn76489Psg, TimingMode};
use emu_core::cpu_z80::MemoryZ80;
use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

use crate::bus::MemoryBus;
use crate::joypad::Joypad;
use crate::vdp::Vdp;

/// All TH/TR pins inputs
const IO_CONTROL_POWER_ON: u8 = 0xFF;

/// Routes CPU port accesses to the chip behind them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoPortRouter {
    vdp: Vdp,
    psg: Sn76489Psg,
    joypad: Joypad,
    io_control: u8,
}

impl IoPortRouter {
    pub fn new(timing: TimingMode) -> Self {
        Self {
            vdp: Vdp::with_timing(timing),
            psg: Sn76489Psg::new(timing),
            joypad: Joypad::new(),
            io_control: IO_CONTROL_POWER_ON,
        }
    }

    pub fn write(&mut self, bus: &mut MemoryBus, port: u16, val: u8) {
        let port = port as u8;
        let even = port & 1 == 0;
        match port {
            0x00..=0x3F if even => bus.write_memory_control(val),
            0x00..=0x3F => {
                log(LogCategory::IO, LogLevel::Debug, || {
                    format!("IO: control {:02X}", val)
                });
                self.io_control = val;
            }
            0x40..=0x7F => self.psg.write(val),
            0x80..=0xBF if even => self.vdp.write_data(val),
            0x80..=0xBF => self.vdp.write_control(val),
            _ => log(LogCategory::IO, LogLevel::Trace, || {
                format!("IO: write {:02X} to read-only port {:02X}", val, port)
            }),
        }
    }

    pub fn read(&mut self, port: u16) -> u8 {
        let even = port & 1 == 0;
        match port as u8 {
            // nothing drives the data bus here
            0x00..=0x3F => (port >> 8) as u8,
            0x40..=0x7F if even => self.vdp.read_vcounter(),
            0x40..=0x7F => self.vdp.read_hcounter(),
            0x80..=0xBF if even => self.vdp.read_data(),
            0x80..=0xBF => self.vdp.read_status(),
            0xC0..=0xFF if even => self.joypad.read_port_a(),
            0xC0..=0xFF => self.joypad.read_port_b(self.io_control),
        }
    }

    pub fn reset(&mut self) {
        let timing = self.vdp.timing();
        *self = Self::new(timing);
    }

    pub fn vdp(&self) -> &Vdp {
        &self.vdp
    }

    pub fn vdp_mut(&mut self) -> &mut Vdp {
        &mut self.vdp
    }

    pub fn psg(&self) -> &Sn76489Psg {
        &self.psg
    }

    pub fn psg_mut(&mut self) -> &mut Sn76489Psg {
        &mut self.psg
    }

    pub fn joypad(&self) -> &Joypad {
        &self.joypad
    }

    pub fn joypad_mut(&mut self) -> &mut Joypad {
        &mut self.joypad
    }

    pub fn io_control(&self) -> u8 {
        self.io_control
    }
}

/// Everything on the far side of the Z80's pins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsHardware {
    pub bus: MemoryBus,
    pub io: IoPortRouter,
}

impl SmsHardware {
    pub fn new(timing: TimingMode) -> Self {
        Self {
            bus: MemoryBus::new(),
            io: IoPortRouter::new(timing),
        }
    }
}

impl MemoryZ80 for SmsHardware {
    fn read(&self, addr: u16) -> u8 {
        self.bus.read(addr)
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.bus.write(addr, val);
    }

    fn io_read(&mut self, port: u16) -> u8 {
        self.io.read(port)
    }

    fn io_write(&mut self, port: u16, val: u8) {
        self.io.write(&mut self.bus, port, val);
    }

    fn irq_pending(&self) -> bool {
        self.io.vdp.has_pending_interrupt()
    }

    fn take_nmi(&mut self) -> bool {
        self.io.joypad.take_nmi()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MEMORY_CONTROL_BIOS, MEMORY_CONTROL_CART};
    use crate::joypad::Button;

    fn hardware() -> SmsHardware {
        SmsHardware::new(TimingMode::Ntsc)
    }

    #[test]
    fn test_vdp_ports_and_mirrors() {
        let mut hw = hardware();
        // VRAM write setup at 0x0000 through a mirror of 0xBF
        hw.io_write(0x81, 0x00);
        hw.io_write(0x81, 0x40);
        hw.io_write(0xBE, 0x12);
        hw.io_write(0x80, 0x34);
        assert_eq!(hw.io.vdp().vram()[0], 0x12);
        assert_eq!(hw.io.vdp().vram()[1], 0x34);

        // status read through a mirror
        assert_eq!(hw.io_read(0xBD) & 0x1F, 0x1F);
    }

    #[test]
    fn test_register_write_through_port() {
        let mut hw = hardware();
        hw.io_write(0xBF, 0x36);
        hw.io_write(0xBF, 0x80);
        assert_eq!(hw.io.vdp().register(0), 0x36);
    }

    #[test]
    fn test_memory_control_port() {
        let mut hw = hardware();
        hw.bus.load_bios(&[0x00; 16]);
        assert_eq!(hw.bus.memory_control(), MEMORY_CONTROL_BIOS);
        hw.io_write(0x3E, MEMORY_CONTROL_CART);
        assert_eq!(hw.bus.memory_control(), MEMORY_CONTROL_CART);
    }

    #[test]
    fn test_psg_port() {
        let mut hw = hardware();
        hw.io_write(0x7F, 0x92);
        assert_eq!(hw.io.psg().volume(0), 2);
        hw.io_write(0x40, 0xB7);
        assert_eq!(hw.io.psg().volume(1), 7);
    }

    #[test]
    fn test_joypad_ports() {
        let mut hw = hardware();
        assert_eq!(hw.io_read(0xDC), 0xFF);
        assert_eq!(hw.io_read(0xDD), 0xFF);

        hw.io.joypad_mut().set_button(Button::Left, true);
        hw.io.joypad_mut().set_button(Button::A, true);
        assert_eq!(hw.io_read(0xDC), 0xEB);
        // mirrored across 0xC0-0xFF
        assert_eq!(hw.io_read(0xC0), 0xEB);
    }

    #[test]
    fn test_io_control_th_mirror() {
        let mut hw = hardware();
        // TH A and TH B as outputs, both driven low
        hw.io_write(0x3F, 0x05);
        assert_eq!(hw.io.io_control(), 0x05);
        assert_eq!(hw.io_read(0xDD) & 0xC0, 0x00);
        hw.io_write(0x3F, 0xF5);
        assert_eq!(hw.io_read(0xDD) & 0xC0, 0xC0);
    }

    #[test]
    fn test_counter_ports() {
        let mut hw = hardware();
        hw.io.vdp_mut().advance(228 * 10 + 100).unwrap();
        assert_eq!(hw.io_read(0x7E), 10);
        assert_eq!(hw.io_read(0x7F), 75);
    }

    #[test]
    fn test_open_bus_low_ports() {
        let mut hw = hardware();
        assert_eq!(hw.io_read(0x123E), 0x12);
        assert_eq!(hw.io_read(0x0000), 0x00);
    }

    #[test]
    fn test_writes_to_joypad_ports_ignored() {
        let mut hw = hardware();
        hw.io_write(0xDC, 0x00);
        assert_eq!(hw.io_read(0xDC), 0xFF);
    }

    #[test]
    fn test_irq_line_follows_vdp() {
        let mut hw = hardware();
        hw.io_write(0xBF, 0x20);
        hw.io_write(0xBF, 0x81);
        assert!(!hw.irq_pending());
        hw.io.vdp_mut().advance(228 * 193).unwrap();
        assert!(hw.irq_pending());
        hw.io_read(0xBF);
        assert!(!hw.irq_pending());
    }

    #[test]
    fn test_pause_raises_nmi() {
        let mut hw = hardware();
        assert!(!hw.take_nmi());
        hw.io.joypad_mut().set_button(Button::Pause, true);
        assert!(hw.take_nmi());
        assert!(!hw.take_nmi());
    }
}
