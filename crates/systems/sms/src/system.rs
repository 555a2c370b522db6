//! Sega Master System main system implementation

use std::fs;
use std::path::Path;

use emu_core::apu::TimingMode;
use emu_core::cpu_z80::{CpuZ80, InterruptMode, Registers};
use emu_core::renderer::Renderer;
use emu_core::types::Frame;
use emu_core::{MountPointInfo, System};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cartridge::Cartridge;
use crate::io::SmsHardware;
use crate::joypad::Button;
use crate::SmsError;

const STATE_VERSION: u64 = 1;
const STATE_SYSTEM: &str = "sms";

const CARTRIDGE_SLOT: &str = "Cartridge";
const BIOS_SLOT: &str = "BIOS";

/// CPU fields carried in a save state
#[derive(Debug, Serialize, Deserialize)]
struct CpuState {
    regs: Registers,
    iff1: bool,
    iff2: bool,
    im: InterruptMode,
    ei_pending: bool,
    #[serde(default)]
    prefix_pending: bool,
    halted: bool,
    cycles: u64,
}

/// Sega Master System emulator
pub struct SmsSystem {
    cpu: CpuZ80<SmsHardware>,
    timing: TimingMode,
    frames: u64,
}

impl Default for SmsSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SmsSystem {
    /// NTSC console with nothing inserted
    pub fn new() -> Self {
        Self::with_timing(TimingMode::Ntsc)
    }

    pub fn with_timing(timing: TimingMode) -> Self {
        Self {
            cpu: CpuZ80::new(SmsHardware::new(timing)),
            timing,
            frames: 0,
        }
    }

    pub fn timing(&self) -> TimingMode {
        self.timing
    }

    /// Run until the VDP finishes the active display and return that frame.
    /// Interrupts raised at the end of the frame are taken on the next call.
    pub fn run_one_frame(&mut self) -> Result<Frame, SmsError> {
        loop {
            let cycles = self.cpu.step()?;
            let vdp = self.cpu.memory.io.vdp_mut();
            vdp.advance(cycles)?;
            if vdp.take_frame_complete() {
                break;
            }
        }
        self.frames += 1;
        Ok(self.cpu.memory.io.vdp().get_frame().clone())
    }

    /// Insert a cartridge image and power cycle
    pub fn load_rom(&mut self, rom: Vec<u8>) -> Result<(), SmsError> {
        let cartridge = Cartridge::from_bytes(rom)?;
        self.insert_cartridge(cartridge);
        Ok(())
    }

    /// Load a ROM file (with its `.sav` sibling, if any) and power cycle
    pub fn load_rom_from_path(&mut self, path: impl AsRef<Path>) -> Result<(), SmsError> {
        let cartridge = Cartridge::load_from_path(path)?;
        self.insert_cartridge(cartridge);
        Ok(())
    }

    fn insert_cartridge(&mut self, cartridge: Cartridge) {
        self.cpu.memory.bus.load_cartridge(cartridge);
        self.reset();
    }

    /// Install a BIOS image and power cycle; the console boots through it
    pub fn load_bios(&mut self, data: &[u8]) {
        self.cpu.memory.bus.load_bios(data);
        self.reset();
    }

    pub fn load_bios_from_path(&mut self, path: impl AsRef<Path>) -> Result<(), SmsError> {
        let data = fs::read(path)?;
        self.load_bios(&data);
        Ok(())
    }

    /// Write battery RAM back next to the ROM file. Returns whether the
    /// cartridge had anything to save.
    pub fn save_sram(&self) -> Result<bool, SmsError> {
        self.cpu
            .memory
            .bus
            .cartridge()
            .ok_or(SmsError::NoCartridge)?
            .save_sram()
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.cpu.memory.io.joypad_mut().set_button(button, pressed);
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cpu.memory.bus.cartridge()
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn cpu(&self) -> &CpuZ80<SmsHardware> {
        &self.cpu
    }

    pub fn hardware(&self) -> &SmsHardware {
        &self.cpu.memory
    }

    pub fn hardware_mut(&mut self) -> &mut SmsHardware {
        &mut self.cpu.memory
    }

    fn cpu_state(&self) -> CpuState {
        CpuState {
            regs: self.cpu.regs,
            iff1: self.cpu.iff1,
            iff2: self.cpu.iff2,
            im: self.cpu.im,
            ei_pending: self.cpu.ei_pending,
            prefix_pending: self.cpu.prefix_pending,
            halted: self.cpu.halted,
            cycles: self.cpu.cycles,
        }
    }
}

fn invalid_state(msg: &str) -> serde_json::Error {
    <serde_json::Error as serde::de::Error>::custom(msg)
}

impl System for SmsSystem {
    type Error = SmsError;

    fn reset(&mut self) {
        self.cpu.reset();
        self.cpu.memory.bus.reset();
        self.cpu.memory.io.reset();
        self.frames = 0;
    }

    fn step_frame(&mut self) -> Result<Frame, Self::Error> {
        self.run_one_frame()
    }

    fn save_state(&self) -> Value {
        let sram = self
            .cartridge()
            .filter(|cart| cart.uses_sram())
            .map(|cart| cart.sram().to_vec());

        serde_json::json!({
            "version": STATE_VERSION,
            "system": STATE_SYSTEM,
            "frames": self.frames,
            "cpu": self.cpu_state(),
            "hardware": self.cpu.memory,
            "sram": sram,
        })
    }

    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error> {
        if v["version"].as_u64() != Some(STATE_VERSION) {
            return Err(invalid_state("unsupported save state version"));
        }
        if v["system"].as_str() != Some(STATE_SYSTEM) {
            return Err(invalid_state("save state is not for this system"));
        }

        let frames: u64 = serde_json::from_value(v["frames"].clone())?;
        let cpu: CpuState = serde_json::from_value(v["cpu"].clone())?;
        let mut hardware: SmsHardware = serde_json::from_value(v["hardware"].clone())?;
        let sram: Option<Vec<u8>> = serde_json::from_value(v["sram"].clone())?;

        // ROM, BIOS and framebuffers are not part of the state
        hardware.bus.take_media_from(&mut self.cpu.memory.bus);
        let restored_vdp = std::mem::take(hardware.io.vdp_mut());
        let mut vdp = std::mem::take(self.cpu.memory.io.vdp_mut());
        vdp.restore_from(restored_vdp);
        *hardware.io.vdp_mut() = vdp;

        if let (Some(data), Some(cart)) = (sram, hardware.bus.cartridge_mut()) {
            cart.load_sram(&data);
        }

        self.timing = hardware.io.vdp().timing();
        self.cpu.memory = hardware;
        self.cpu.regs = cpu.regs;
        self.cpu.iff1 = cpu.iff1;
        self.cpu.iff2 = cpu.iff2;
        self.cpu.im = cpu.im;
        self.cpu.ei_pending = cpu.ei_pending;
        self.cpu.prefix_pending = cpu.prefix_pending;
        self.cpu.halted = cpu.halted;
        self.cpu.cycles = cpu.cycles;
        self.frames = frames;
        Ok(())
    }

    fn supports_save_states(&self) -> bool {
        true
    }

    fn mount_points(&self) -> Vec<MountPointInfo> {
        vec![
            MountPointInfo {
                id: CARTRIDGE_SLOT.to_string(),
                name: "Cartridge Slot".to_string(),
                extensions: vec!["sms".to_string()],
                required: true,
            },
            MountPointInfo {
                id: BIOS_SLOT.to_string(),
                name: "BIOS ROM".to_string(),
                extensions: vec!["sms".to_string(), "bin".to_string(), "rom".to_string()],
                required: false,
            },
        ]
    }

    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
        match mount_point_id {
            CARTRIDGE_SLOT => self.load_rom(data.to_vec()),
            BIOS_SLOT => {
                self.load_bios(data);
                Ok(())
            }
            other => Err(SmsError::InvalidMountPoint(other.to_string())),
        }
    }

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error> {
        match mount_point_id {
            CARTRIDGE_SLOT => {
                self.cpu.memory.bus.eject_cartridge();
            }
            BIOS_SLOT => self.cpu.memory.bus.unload_bios(),
            other => return Err(SmsError::InvalidMountPoint(other.to_string())),
        }
        self.reset();
        Ok(())
    }

    fn is_mounted(&self, mount_point_id: &str) -> bool {
        match mount_point_id {
            CARTRIDGE_SLOT => self.cpu.memory.bus.cartridge().is_some(),
            BIOS_SLOT => self.cpu.memory.bus.has_bios(),
            _ => false,
        }
    }
}
