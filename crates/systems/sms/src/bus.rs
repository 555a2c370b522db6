//! Sega Master System memory bus
//!
//! Memory Map:
//! - 0x0000-0x03FF: ROM, never paged
//! - 0x0400-0x3FFF: ROM mapper slot 0
//! - 0x4000-0x7FFF: ROM mapper slot 1
//! - 0x8000-0xBFFF: ROM mapper slot 2, or cartridge RAM
//! - 0xC000-0xDFFF: System RAM (8KB)
//! - 0xE000-0xFFFF: System RAM mirror
//!
//! Mapper control (written through to RAM as well):
//! - 0xFFFC: cartridge RAM control (bit 3 map RAM into slot 2, bit 2 page)
//! - 0xFFFD-0xFFFF: bank select for slots 0-2
//!
//! While the BIOS is enabled it shadows 0x0000-0x1FFF. 32 KB cartridges have
//! no mapper and appear directly at 0x0000-0x7FFF.

use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

use crate::cartridge::{Cartridge, CartridgeSize, BANK_SIZE};

pub const RAM_SIZE: usize = 0x2000;
pub const BIOS_SIZE: usize = 0x2000;

/// First KB of ROM ignores the slot 0 bank register
const UNPAGED_END: u16 = 0x0400;

const RAM_CONTROL: u16 = 0xFFFC;

/// 0xFFFC bits
const CART_RAM_MAPPED: u8 = 0x08;
const CART_RAM_PAGE: u8 = 0x04;

/// Memory control (port 0x3E) bits, active low
const MC_BIOS_DISABLE: u8 = 0x08;
const MC_RAM_DISABLE: u8 = 0x10;
const MC_CART_DISABLE: u8 = 0x40;

/// Power-on memory control: BIOS mapped, cartridge unmapped
pub const MEMORY_CONTROL_BIOS: u8 = 0xE3;
/// Power-on memory control without a BIOS: cartridge mapped
pub const MEMORY_CONTROL_CART: u8 = 0xAB;

const POWER_ON_BANKS: [u8; 3] = [0, 1, 2];

/// SMS memory bus: system RAM, BIOS shadow and the cartridge behind the
/// Sega mapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBus {
    ram: Vec<u8>,

    /// RAM control byte at 0xFFFC
    ram_control: u8,
    /// Bank registers for slots 0-2 (0xFFFD-0xFFFF)
    banks: [u8; 3],

    memory_control: u8,

    #[serde(skip)]
    bios: Option<Vec<u8>>,
    #[serde(skip)]
    cartridge: Option<Cartridge>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            ram: vec![0; RAM_SIZE],
            ram_control: 0,
            banks: POWER_ON_BANKS,
            memory_control: MEMORY_CONTROL_CART,
            bios: None,
            cartridge: None,
        }
    }

    /// Insert a cartridge; mapper registers return to power-on values
    pub fn load_cartridge(&mut self, cartridge: Cartridge) {
        self.cartridge = Some(cartridge);
        self.ram_control = 0;
        self.banks = POWER_ON_BANKS;
    }

    pub fn eject_cartridge(&mut self) -> Option<Cartridge> {
        self.cartridge.take()
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    pub fn cartridge_mut(&mut self) -> Option<&mut Cartridge> {
        self.cartridge.as_mut()
    }

    /// Install a BIOS image (first 8 KB used) and map it in place of the
    /// cartridge
    pub fn load_bios(&mut self, data: &[u8]) {
        let mut bios = vec![0; BIOS_SIZE];
        let len = data.len().min(BIOS_SIZE);
        bios[..len].copy_from_slice(&data[..len]);
        self.bios = Some(bios);
        self.memory_control = MEMORY_CONTROL_BIOS;
        log(LogCategory::Bus, LogLevel::Info, || {
            format!("Bus: BIOS installed ({} bytes)", data.len())
        });
    }

    pub fn unload_bios(&mut self) {
        self.bios = None;
        self.memory_control = MEMORY_CONTROL_CART;
    }

    pub fn has_bios(&self) -> bool {
        self.bios.is_some()
    }

    /// Power-on state: RAM cleared, mapper reset, memory control chosen by
    /// whether a BIOS is present. Media stay inserted.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.ram_control = 0;
        self.banks = POWER_ON_BANKS;
        self.memory_control = if self.bios.is_some() {
            MEMORY_CONTROL_BIOS
        } else {
            MEMORY_CONTROL_CART
        };
    }

    /// Move media from another bus into this one (used after restoring state)
    pub fn take_media_from(&mut self, other: &mut MemoryBus) {
        self.bios = other.bios.take();
        self.cartridge = other.cartridge.take();
    }

    pub fn memory_control(&self) -> u8 {
        self.memory_control
    }

    /// Port 0x3E write
    pub fn write_memory_control(&mut self, val: u8) {
        if val != self.memory_control {
            log(LogCategory::Bus, LogLevel::Debug, || {
                format!(
                    "Bus: memory control {:02X} (bios {}, cart {}, ram {})",
                    val,
                    on_off(val & MC_BIOS_DISABLE == 0),
                    on_off(val & MC_CART_DISABLE == 0),
                    on_off(val & MC_RAM_DISABLE == 0),
                )
            });
        }
        self.memory_control = val;
    }

    pub fn bank_registers(&self) -> [u8; 3] {
        self.banks
    }

    pub fn ram_control(&self) -> u8 {
        self.ram_control
    }

    fn bios_enabled(&self) -> bool {
        self.bios.is_some() && self.memory_control & MC_BIOS_DISABLE == 0
    }

    fn cart_enabled(&self) -> bool {
        self.memory_control & MC_CART_DISABLE == 0
    }

    fn ram_enabled(&self) -> bool {
        self.memory_control & MC_RAM_DISABLE == 0
    }

    fn cart_ram_mapped(&self) -> bool {
        self.ram_control & CART_RAM_MAPPED != 0
    }

    /// Offset into battery RAM for a slot 2 address
    fn cart_ram_offset(&self, addr: u16) -> usize {
        let page = ((self.ram_control & CART_RAM_PAGE) >> 2) as usize;
        page * BANK_SIZE + (addr as usize & (BANK_SIZE - 1))
    }

    /// Physical ROM offset for a cartridge address below 0xC000
    fn rom_offset(&self, cart: &Cartridge, addr: u16) -> usize {
        if cart.size() == CartridgeSize::Kb32 || addr < UNPAGED_END {
            return addr as usize;
        }
        let slot = (addr >> 14) as usize;
        let bank = self.banks[slot] as usize % cart.bank_count();
        bank * BANK_SIZE + (addr as usize & (BANK_SIZE - 1))
    }

    pub fn read(&self, addr: u16) -> u8 {
        if addr >= 0xC000 {
            return if self.ram_enabled() {
                self.ram[addr as usize & (RAM_SIZE - 1)]
            } else {
                0
            };
        }

        if let Some(bios) = &self.bios {
            if self.bios_enabled() && (addr as usize) < BIOS_SIZE {
                return bios[addr as usize];
            }
        }

        if !self.cart_enabled() {
            return 0;
        }
        let Some(cart) = &self.cartridge else {
            return 0;
        };

        if addr >= 0x8000 && self.cart_ram_mapped() {
            return cart.read_sram(self.cart_ram_offset(addr));
        }
        cart.read_rom(self.rom_offset(cart, addr))
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x8000..=0xBFFF => {
                if self.cart_enabled() && self.cart_ram_mapped() {
                    let offset = self.cart_ram_offset(addr);
                    if let Some(cart) = self.cartridge.as_mut() {
                        cart.write_sram(offset, val);
                    }
                }
            }
            0xC000..=0xFFFF => {
                if self.ram_enabled() {
                    self.ram[addr as usize & (RAM_SIZE - 1)] = val;
                }
                if addr >= RAM_CONTROL {
                    self.write_mapper(addr, val);
                }
            }
            _ => {}
        }
    }

    fn write_mapper(&mut self, addr: u16, val: u8) {
        log(LogCategory::Bus, LogLevel::Trace, || {
            format!("Bus: mapper {:04X} <- {:02X}", addr, val)
        });
        match addr {
            RAM_CONTROL => self.ram_control = val,
            // slot 2 bank register is frozen while cart RAM is paged in
            0xFFFF if self.cart_ram_mapped() => {}
            _ => self.banks[(addr - 0xFFFD) as usize] = val,
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ROM where the first byte of every bank holds the bank number
    fn banked_cart(size: usize) -> Cartridge {
        let mut rom = vec![0; size];
        for (i, bank) in rom.chunks_mut(BANK_SIZE).enumerate() {
            bank[0] = i as u8;
            bank[0x500] = 0x80 | i as u8;
        }
        Cartridge::from_bytes(rom).unwrap()
    }

    #[test]
    fn test_ram_read_write() {
        let mut bus = MemoryBus::new();
        bus.write(0xC000, 0x42);
        assert_eq!(bus.read(0xC000), 0x42);
        assert_eq!(bus.read(0xE000), 0x42);

        bus.write(0xFDFF, 0x17);
        assert_eq!(bus.read(0xDDFF), 0x17);
    }

    #[test]
    fn test_no_cartridge_reads_zero() {
        let mut bus = MemoryBus::new();
        assert_eq!(bus.read(0x0000), 0);
        assert_eq!(bus.read(0xBFFF), 0);
        bus.write(0x1000, 0xFF);
        assert_eq!(bus.read(0x1000), 0);
    }

    #[test]
    fn test_32k_direct_mapping() {
        let mut rom = vec![0; 0x8000];
        rom[0x100] = 0xAB;
        rom[0x7FFE] = 0xCD;
        let mut bus = MemoryBus::new();
        bus.load_cartridge(Cartridge::from_bytes(rom).unwrap());

        assert_eq!(bus.read(0x100), 0xAB);
        assert_eq!(bus.read(0x7FFE), 0xCD);

        // no mapper on 32K carts
        bus.write(0xFFFE, 5);
        assert_eq!(bus.read(0x7FFE), 0xCD);
    }

    #[test]
    fn test_power_on_banks() {
        let mut bus = MemoryBus::new();
        bus.load_cartridge(banked_cart(0x20000));
        assert_eq!(bus.bank_registers(), [0, 1, 2]);
        assert_eq!(bus.read(0x0000), 0);
        assert_eq!(bus.read(0x4000), 1);
        assert_eq!(bus.read(0x8000), 2);
    }

    #[test]
    fn test_bank_switching() {
        let mut bus = MemoryBus::new();
        bus.load_cartridge(banked_cart(0x20000));

        bus.write(0xFFFE, 5);
        assert_eq!(bus.read(0x4000), 5);
        assert_eq!(bus.read(0x4500), 0x85);

        bus.write(0xFFFF, 7);
        assert_eq!(bus.read(0x8000), 7);

        // banks wrap to the cartridge size
        bus.write(0xFFFF, 9);
        assert_eq!(bus.read(0x8000), 1);

        // mapper writes land in RAM too
        assert_eq!(bus.read(0xFFFF), 9);
        assert_eq!(bus.read(0xDFFE), 5);
    }

    #[test]
    fn test_first_kb_is_unpaged() {
        let mut bus = MemoryBus::new();
        bus.load_cartridge(banked_cart(0x10000));
        bus.write(0xFFFD, 3);
        assert_eq!(bus.read(0x0000), 0);
        assert_eq!(bus.read(0x0500), 0x83);
    }

    #[test]
    fn test_cart_ram_in_slot_2() {
        let mut bus = MemoryBus::new();
        bus.load_cartridge(banked_cart(0x20000));

        bus.write(0xFFFC, 0x08);
        bus.write(0x8000, 0x11);
        assert_eq!(bus.read(0x8000), 0x11);
        assert!(bus.cartridge().unwrap().uses_sram());

        // bank 2 writes are dropped while RAM is mapped
        bus.write(0xFFFF, 6);
        assert_eq!(bus.read(0x8000), 0x11);
        assert_eq!(bus.bank_registers()[2], 2);

        // second page
        bus.write(0xFFFC, 0x0C);
        assert_eq!(bus.read(0x8000), 0);
        bus.write(0x8000, 0x22);
        assert_eq!(bus.cartridge().unwrap().read_sram(0x4000), 0x22);

        // back to ROM, still on the bank selected before RAM was mapped
        bus.write(0xFFFC, 0x00);
        assert_eq!(bus.read(0x8000), 2);

        bus.write(0xFFFF, 6);
        assert_eq!(bus.read(0x8000), 6);
    }

    #[test]
    fn test_rom_writes_ignored() {
        let mut bus = MemoryBus::new();
        bus.load_cartridge(banked_cart(0x10000));
        bus.write(0x8000, 0x55);
        assert_eq!(bus.read(0x8000), 2);
        assert!(!bus.cartridge().unwrap().uses_sram());
    }

    #[test]
    fn test_bios_shadow_and_memory_control() {
        let mut bus = MemoryBus::new();
        bus.load_cartridge(banked_cart(0x10000));
        bus.load_bios(&[0xF3, 0xED, 0x56]);
        assert_eq!(bus.memory_control(), MEMORY_CONTROL_BIOS);

        assert_eq!(bus.read(0x0000), 0xF3);
        assert_eq!(bus.read(0x0002), 0x56);
        // cartridge slot disabled while the BIOS runs
        assert_eq!(bus.read(0x4000), 0);

        // what the BIOS writes when handing over to the cartridge
        bus.write_memory_control(MEMORY_CONTROL_CART);
        assert_eq!(bus.read(0x0000), 0);
        assert_eq!(bus.read(0x4000), 1);
    }

    #[test]
    fn test_work_ram_disable() {
        let mut bus = MemoryBus::new();
        bus.write(0xC010, 0x77);
        bus.write_memory_control(MEMORY_CONTROL_CART | MC_RAM_DISABLE);
        assert_eq!(bus.read(0xC010), 0);
        bus.write(0xC010, 0x01);
        bus.write_memory_control(MEMORY_CONTROL_CART);
        assert_eq!(bus.read(0xC010), 0x77);
    }

    #[test]
    fn test_reset_keeps_media() {
        let mut bus = MemoryBus::new();
        bus.load_cartridge(banked_cart(0x10000));
        bus.write(0xC000, 1);
        bus.write(0xFFFE, 3);
        bus.reset();
        assert_eq!(bus.read(0xC000), 0);
        assert_eq!(bus.bank_registers(), [0, 1, 2]);
        assert!(bus.cartridge().is_some());
    }

    #[test]
    fn test_state_skips_media() {
        let mut bus = MemoryBus::new();
        bus.load_cartridge(banked_cart(0x10000));
        bus.write(0xC123, 0x42);
        bus.write(0xFFFE, 3);

        let json = serde_json::to_value(&bus).unwrap();
        let mut restored: MemoryBus = serde_json::from_value(json).unwrap();
        assert!(restored.cartridge().is_none());

        restored.take_media_from(&mut bus);
        assert_eq!(restored.read(0xC123), 0x42);
        assert_eq!(restored.read(0x4000), 3);
    }
}
