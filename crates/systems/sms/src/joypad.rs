//! Controller ports
//!
//! Port A (0xDC): bits 0-5 are pad 1 Up, Down, Left, Right, Button 1, Button 2.
//! Port B (0xDD): bit 4 is the console reset key, bits 6-7 read back the TH
//! lines. Everything is active low; no second pad is emulated so its lines
//! read high.
//!
//! The pause key is not on either port. It drives the Z80 NMI line.

use serde::{Deserialize, Serialize};

const PORT_B_RESET: u8 = 0x10;
const PORT_B_TH_A: u8 = 0x40;
const PORT_B_TH_B: u8 = 0x80;

/// I/O control (port 0x3F) bits
const IO_TH_A_INPUT: u8 = 0x02;
const IO_TH_B_INPUT: u8 = 0x08;
const IO_TH_A_LEVEL: u8 = 0x20;
const IO_TH_B_LEVEL: u8 = 0x80;

/// Host-visible buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    /// Button 1
    A,
    /// Button 2
    B,
    /// Console pause key (NMI)
    Pause,
    /// Console reset key
    Reset,
}

impl Button {
    /// Port A bit for pad buttons
    fn port_a_mask(self) -> Option<u8> {
        match self {
            Button::Up => Some(0x01),
            Button::Down => Some(0x02),
            Button::Left => Some(0x04),
            Button::Right => Some(0x08),
            Button::A => Some(0x10),
            Button::B => Some(0x20),
            Button::Pause | Button::Reset => None,
        }
    }
}

/// Active-low button latch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Joypad {
    port_a: u8,
    port_b: u8,
    pause_held: bool,
    nmi_pending: bool,
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Joypad {
    pub fn new() -> Self {
        Self {
            port_a: 0xFF,
            port_b: 0xFF,
            pause_held: false,
            nmi_pending: false,
        }
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        match button {
            Button::Pause => {
                // edge triggered: holding the key raises one NMI
                if pressed && !self.pause_held {
                    self.nmi_pending = true;
                }
                self.pause_held = pressed;
            }
            Button::Reset => set_line(&mut self.port_b, PORT_B_RESET, pressed),
            _ => {
                if let Some(mask) = button.port_a_mask() {
                    set_line(&mut self.port_a, mask, pressed);
                }
            }
        }
    }

    pub fn read_port_a(&self) -> u8 {
        self.port_a
    }

    /// Port B, with TH lines configured as outputs reading back their
    /// programmed level
    pub fn read_port_b(&self, io_control: u8) -> u8 {
        let mut value = self.port_b;
        if io_control & IO_TH_A_INPUT == 0 {
            set_line(&mut value, PORT_B_TH_A, io_control & IO_TH_A_LEVEL == 0);
        }
        if io_control & IO_TH_B_INPUT == 0 {
            set_line(&mut value, PORT_B_TH_B, io_control & IO_TH_B_LEVEL == 0);
        }
        value
    }

    /// Consume a pending pause NMI
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_pending)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Pull a line low when active, release it high otherwise
fn set_line(port: &mut u8, mask: u8, low: bool) {
    if low {
        *port &= !mask;
    } else {
        *port |= mask;
    }
}
