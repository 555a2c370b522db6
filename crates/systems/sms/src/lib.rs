//! Sega Master System emulator implementation
//!
//! # Architecture
//!
//! - **CPU**: Zilog Z80A @ 3.58 MHz (NTSC) / 3.55 MHz (PAL)
//! - **VDP**: Sega 315-5124, Mode 4 only
//! - **PSG**: Texas Instruments SN76489 (Sega variant)
//! - **RAM**: 8 KB main RAM, mirrored at 0xE000
//! - **VRAM**: 16 KB video RAM, 32 bytes of CRAM
//! - **Mapper**: Sega mapper with control registers at 0xFFFC-0xFFFF
//!
//! The CPU owns [`io::SmsHardware`], which owns the [`bus::MemoryBus`] and
//! the [`io::IoPortRouter`]; the router owns the VDP, PSG and joypad. The
//! driver in [`system`] steps the CPU and feeds the elapsed cycles to the VDP.

pub mod bus;
pub mod cartridge;
pub mod io;
pub mod joypad;
pub mod system;
pub mod vdp;

pub use cartridge::{Cartridge, CartridgeSize};
pub use joypad::Button;
pub use system::SmsSystem;
pub use vdp::{Vdp, VdpError};

use emu_core::cpu_z80::Z80Error;
use thiserror::Error;

/// SMS emulator errors
#[derive(Debug, Error)]
pub enum SmsError {
    #[error("Invalid mount point: {0}")]
    InvalidMountPoint(String),
    #[error("Unsupported cartridge size: {0:#X} bytes")]
    UnsupportedCartridgeSize(usize),
    #[error("No cartridge loaded")]
    NoCartridge,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CPU error: {0}")]
    Cpu(#[from] Z80Error),
    #[error("VDP error: {0}")]
    Vdp(#[from] VdpError),
}
