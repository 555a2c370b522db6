//! SMS cartridge image and battery-backed RAM
//!
//! Cartridges are plain ROM dumps of 32 KB up to 512 KB. The header sits at
//! the end of the first 32 KB; the high nibble of its last byte (0x7FFF) is the
//! region code. Carts with battery RAM carry 32 KB of it as two 16 KB pages,
//! persisted next to the ROM in a `.sav` file.

use std::fs;
use std::path::{Path, PathBuf};

use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

use crate::SmsError;

/// Size of one mapper bank
pub const BANK_SIZE: usize = 0x4000;

/// Battery RAM, two 16 KB pages
pub const SRAM_SIZE: usize = 0x8000;

const REGION_BYTE: usize = 0x7FFF;

/// Supported ROM sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartridgeSize {
    Kb32,
    Kb64,
    Kb128,
    Kb256,
    Kb512,
}

impl CartridgeSize {
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            0x8000 => Some(Self::Kb32),
            0x10000 => Some(Self::Kb64),
            0x20000 => Some(Self::Kb128),
            0x40000 => Some(Self::Kb256),
            0x80000 => Some(Self::Kb512),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            Self::Kb32 => 0x8000,
            Self::Kb64 => 0x10000,
            Self::Kb128 => 0x20000,
            Self::Kb256 => 0x40000,
            Self::Kb512 => 0x80000,
        }
    }

    /// Number of 16 KB banks
    pub fn bank_count(self) -> usize {
        self.bytes() / BANK_SIZE
    }
}

/// An inserted cartridge
#[derive(Debug, Clone)]
pub struct Cartridge {
    rom: Vec<u8>,
    size: CartridgeSize,
    region: u8,
    sram: Vec<u8>,
    uses_sram: bool,
    /// Where battery RAM is written back, when loaded from disk
    save_path: Option<PathBuf>,
}

impl Cartridge {
    /// Build a cartridge from a ROM image
    pub fn from_bytes(rom: Vec<u8>) -> Result<Self, SmsError> {
        let size = CartridgeSize::from_len(rom.len())
            .ok_or(SmsError::UnsupportedCartridgeSize(rom.len()))?;
        let region = (rom[REGION_BYTE] >> 4) & 0x0F;

        log(LogCategory::Bus, LogLevel::Info, || {
            format!(
                "Cartridge: {} KB, {} banks, region {:X}",
                size.bytes() / 1024,
                size.bank_count(),
                region
            )
        });

        Ok(Self {
            rom,
            size,
            region,
            sram: vec![0; SRAM_SIZE],
            uses_sram: false,
            save_path: None,
        })
    }

    /// Load a ROM file and, when a sibling `.sav` file exists, its battery RAM
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, SmsError> {
        let path = path.as_ref();
        let mut cart = Self::from_bytes(fs::read(path)?)?;

        let save_path = path.with_extension("sav");
        if save_path.exists() {
            match fs::read(&save_path) {
                Ok(data) => {
                    cart.load_sram(&data);
                    log(LogCategory::Bus, LogLevel::Info, || {
                        format!("Cartridge: battery RAM loaded from {}", save_path.display())
                    });
                }
                Err(e) => log(LogCategory::Bus, LogLevel::Warn, || {
                    format!(
                        "Cartridge: cannot read {} ({}), starting with blank battery RAM",
                        save_path.display(),
                        e
                    )
                }),
            }
        }
        cart.save_path = Some(save_path);

        Ok(cart)
    }

    /// Fill battery RAM from a save image and mark it in use
    pub fn load_sram(&mut self, data: &[u8]) {
        let len = data.len().min(SRAM_SIZE);
        self.sram[..len].copy_from_slice(&data[..len]);
        self.uses_sram = true;
    }

    /// Write battery RAM back to the `.sav` sibling. Returns whether anything
    /// was written.
    pub fn save_sram(&self) -> Result<bool, SmsError> {
        match &self.save_path {
            Some(path) if self.uses_sram => {
                fs::write(path, &self.sram)?;
                log(LogCategory::Bus, LogLevel::Info, || {
                    format!("Cartridge: battery RAM saved to {}", path.display())
                });
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// ROM byte at a physical offset; out of range reads return 0
    #[inline]
    pub fn read_rom(&self, offset: usize) -> u8 {
        self.rom.get(offset).copied().unwrap_or(0)
    }

    #[inline]
    pub fn read_sram(&self, offset: usize) -> u8 {
        self.sram[offset % SRAM_SIZE]
    }

    pub fn write_sram(&mut self, offset: usize, val: u8) {
        self.sram[offset % SRAM_SIZE] = val;
        self.uses_sram = true;
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    pub fn sram(&self) -> &[u8] {
        &self.sram
    }

    pub fn size(&self) -> CartridgeSize {
        self.size
    }

    pub fn bank_count(&self) -> usize {
        self.size.bank_count()
    }

    pub fn region(&self) -> u8 {
        self.region
    }

    pub fn uses_sram(&self) -> bool {
        self.uses_sram
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("emu_sms_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_region_from_header() {
        let mut rom = vec![0; 0x8000];
        rom[0x7FFF] = 0x4C;
        let cart = Cartridge::from_bytes(rom).unwrap();
        assert_eq!(cart.region(), 0x4);
        assert_eq!(cart.size(), CartridgeSize::Kb32);
        assert_eq!(cart.bank_count(), 2);
        assert!(!cart.uses_sram());
    }

    #[test]
    fn test_all_supported_sizes() {
        for kb in [32usize, 64, 128, 256, 512] {
            let cart = Cartridge::from_bytes(vec![0; kb * 1024]).unwrap();
            assert_eq!(cart.size().bytes(), kb * 1024);
        }
    }

    #[test]
    fn test_unsupported_size() {
        let err = Cartridge::from_bytes(vec![0; 0x9000]).unwrap_err();
        assert!(matches!(err, SmsError::UnsupportedCartridgeSize(0x9000)));
        assert!(Cartridge::from_bytes(Vec::new()).is_err());
    }

    #[test]
    fn test_sram_write_marks_used() {
        let mut cart = Cartridge::from_bytes(vec![0; 0x8000]).unwrap();
        cart.write_sram(0x4001, 0x5A);
        assert!(cart.uses_sram());
        assert_eq!(cart.read_sram(0x4001), 0x5A);
        assert_eq!(cart.read_sram(0xC001), 0x5A);
    }

    #[test]
    fn test_load_with_save_file() {
        let dir = scratch_dir("load_sav");
        let rom_path = dir.join("game.sms");
        fs::write(&rom_path, vec![0u8; 0x10000]).unwrap();
        fs::write(dir.join("game.sav"), [1u8, 2, 3]).unwrap();

        let cart = Cartridge::load_from_path(&rom_path).unwrap();
        assert!(cart.uses_sram());
        assert_eq!(&cart.sram()[..4], &[1, 2, 3, 0]);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_unreadable_save_file_gives_blank_sram() {
        let dir = scratch_dir("bad_sav");
        let rom_path = dir.join("game.sms");
        fs::write(&rom_path, vec![0u8; 0x8000]).unwrap();
        // a directory where the save file should be cannot be read
        fs::create_dir_all(dir.join("game.sav")).unwrap();

        let cart = Cartridge::load_from_path(&rom_path).unwrap();
        assert!(!cart.uses_sram());
        assert!(cart.sram().iter().all(|&b| b == 0));
        assert_eq!(cart.save_path(), Some(dir.join("game.sav").as_path()));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_save_round_trip_on_disk() {
        let dir = scratch_dir("save_sav");
        let rom_path = dir.join("game.sms");
        fs::write(&rom_path, vec![0u8; 0x8000]).unwrap();

        let mut cart = Cartridge::load_from_path(&rom_path).unwrap();
        assert!(!cart.uses_sram());
        assert!(!cart.save_sram().unwrap());

        cart.write_sram(0x10, 0x99);
        assert!(cart.save_sram().unwrap());
        let saved = fs::read(dir.join("game.sav")).unwrap();
        assert_eq!(saved.len(), SRAM_SIZE);
        assert_eq!(saved[0x10], 0x99);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Cartridge::load_from_path("/nonexistent/rom.sms").unwrap_err();
        assert!(matches!(err, SmsError::Io(_)));
    }
}
