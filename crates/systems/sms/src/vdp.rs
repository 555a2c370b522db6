//! Sega Master System Video Display Processor (VDP)
//!
//! The VDP is a descendant of the TMS9918A. Only its Mode 4 (the SMS tile
//! mode) with 192 active lines is emulated; the legacy TMS modes render as
//! Mode 4, and the 224/240-line selections are reported as errors.
//!
//! # Features
//! - 256×192 pixel output, 64 colour palette (32 on screen)
//! - 32×28 tile background with horizontal/vertical scrolling and scroll locks
//! - 64 sprites, 8 per line, 8×8 / 8×16 / zoomed
//! - Line and frame interrupts
//!
//! # Ports
//! The control port takes a two byte command word: the low byte first, then
//! the high byte carrying six address bits and a two bit code (0 VRAM read,
//! 1 VRAM write, 2 register write, 3 CRAM write). Data port reads are served
//! from a one byte read-ahead buffer.
//!
//! # Timing
//! [`Vdp::advance`] takes CPU cycles; every 228 of them one scanline ends.

use emu_core::apu::{TimingMode, CYCLES_PER_LINE};
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::renderer::Renderer;
use emu_core::types::Frame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SCREEN_WIDTH: u32 = 256;
pub const SCREEN_HEIGHT: u32 = 192;

const VRAM_SIZE: usize = 0x4000;
const ADDRESS_MASK: u16 = 0x3FFF;
const CODE_MASK: u16 = 0xC000;
const REGISTER_COUNT: usize = 11;

/// Status register bits
const STATUS_FRAME_IRQ: u8 = 0x80;
const STATUS_OVERFLOW: u8 = 0x40;
const STATUS_COLLISION: u8 = 0x20;
/// Unused status bits read back as ones
const STATUS_UNUSED: u8 = 0x1F;

const SPRITE_COUNT: usize = 64;
const SPRITES_PER_LINE: usize = 8;
/// Y value that ends the sprite list in 192-line mode
const SPRITE_TERMINATOR: u8 = 0xD0;

/// Name table rows before vertical wrap
const NAME_TABLE_ROWS: u16 = 28;

/// Errors raised while drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VdpError {
    #[error("unsupported display mode (reg0={reg0:02X} reg1={reg1:02X}) on line {line}")]
    UnsupportedMode { reg0: u8, reg1: u8, line: u16 },
}

/// Decode 6-bit SMS color to 32-bit ARGB
pub fn decode_color(color: u8) -> u32 {
    // --BBGGRR, each 2-bit channel scaled by 85
    let r = (color & 0x03) as u32 * 85;
    let g = ((color >> 2) & 0x03) as u32 * 85;
    let b = ((color >> 4) & 0x03) as u32 * 85;
    0xFF00_0000 | (r << 16) | (g << 8) | b
}

/// Colour index (0-15) of pixel `bit` (7 = leftmost) of a pattern row
#[inline]
fn pattern_pixel(row: &[u8], bit: u8) -> u8 {
    row.iter()
        .take(4)
        .enumerate()
        .fold(0, |index, (plane, byte)| index | ((byte >> bit) & 1) << plane)
}

fn blank_frame() -> Frame {
    Frame::new(SCREEN_WIDTH, SCREEN_HEIGHT)
}

/// VDP state and rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vdp {
    vram: Vec<u8>,
    cram: [u8; 32],
    registers: [u8; REGISTER_COUNT],

    /// 14-bit address plus 2-bit code in the top bits
    control_word: u16,
    /// First control byte received, waiting for the second
    second_byte: bool,
    read_buffer: u8,

    /// Sticky frame IRQ / overflow / collision bits
    status: u8,
    line_interrupt_pending: bool,
    line_counter: u8,

    /// Current scanline (0 .. lines per frame)
    vcounter: u16,
    /// Cycles into the current scanline
    line_cycles: u32,
    frame_complete: bool,

    timing: TimingMode,

    /// Frame being drawn
    #[serde(skip, default = "blank_frame")]
    working: Frame,
    /// Last completed frame
    #[serde(skip, default = "blank_frame")]
    display: Frame,
}

impl Default for Vdp {
    fn default() -> Self {
        Self::new()
    }
}

impl Vdp {
    pub fn new() -> Self {
        Self::with_timing(TimingMode::Ntsc)
    }

    pub fn with_timing(timing: TimingMode) -> Self {
        Self {
            vram: vec![0; VRAM_SIZE],
            cram: [0; 32],
            registers: [0; REGISTER_COUNT],
            control_word: 0,
            second_byte: false,
            read_buffer: 0,
            status: 0,
            line_interrupt_pending: false,
            line_counter: 0,
            vcounter: 0,
            line_cycles: 0,
            frame_complete: false,
            timing,
            working: blank_frame(),
            display: blank_frame(),
        }
    }

    pub fn timing(&self) -> TimingMode {
        self.timing
    }

    /// Keep the framebuffers of `self` when adopting restored state
    pub fn restore_from(&mut self, state: Vdp) {
        let working = std::mem::replace(&mut self.working, blank_frame());
        let display = std::mem::replace(&mut self.display, blank_frame());
        *self = Vdp {
            working,
            display,
            ..state
        };
    }

    // Port interface

    /// Write to VDP control port (odd ports in 0x80-0xBF)
    pub fn write_control(&mut self, data: u8) {
        if !self.second_byte {
            self.control_word = (self.control_word & 0xFF00) | data as u16;
            self.second_byte = true;
            return;
        }

        self.second_byte = false;
        self.control_word = (self.control_word & 0x00FF) | ((data as u16) << 8);

        match self.code() {
            0 => {
                // VRAM read setup: prefetch so the first data read has a value
                self.read_buffer = self.vram[self.address()];
                self.increment_address();
            }
            2 => {
                let reg = (data & 0x0F) as usize;
                if reg < REGISTER_COUNT {
                    let value = self.control_word as u8;
                    log(LogCategory::VDP, LogLevel::Debug, || {
                        format!("VDP: R{} <- {:02X}", reg, value)
                    });
                    self.registers[reg] = value;
                }
            }
            _ => {}
        }
    }

    /// Write to VDP data port (even ports in 0x80-0xBF)
    pub fn write_data(&mut self, data: u8) {
        self.second_byte = false;

        if self.code() == 3 {
            self.cram[self.address() & 0x1F] = data;
        } else {
            let addr = self.address();
            self.vram[addr] = data;
        }
        self.read_buffer = data;
        self.increment_address();
    }

    /// Read from VDP data port
    pub fn read_data(&mut self) -> u8 {
        self.second_byte = false;
        let value = self.read_buffer;
        self.read_buffer = self.vram[self.address()];
        self.increment_address();
        value
    }

    /// Read the status register, acknowledging both interrupt sources
    pub fn read_status(&mut self) -> u8 {
        let value = self.status | STATUS_UNUSED;
        self.status = 0;
        self.line_interrupt_pending = false;
        self.second_byte = false;
        value
    }

    /// V counter as the CPU sees it: the line number with the region's
    /// jump back near the end of the frame
    pub fn read_vcounter(&self) -> u8 {
        let line = self.vcounter;
        match self.timing {
            TimingMode::Ntsc if line > 0xDA => (line - 6) as u8,
            TimingMode::Pal if line > 0xF2 => (line - 57) as u8,
            _ => line as u8,
        }
    }

    /// H counter: 171 steps per line, jumping 0x93 -> 0xE9
    pub fn read_hcounter(&self) -> u8 {
        let h = self.line_cycles * 171 / CYCLES_PER_LINE;
        if h > 0x93 {
            (h + 0x55) as u8
        } else {
            h as u8
        }
    }

    fn address(&self) -> usize {
        (self.control_word & ADDRESS_MASK) as usize
    }

    fn code(&self) -> u8 {
        (self.control_word >> 14) as u8
    }

    /// 14-bit wrap, code bits untouched
    fn increment_address(&mut self) {
        let next = (self.control_word.wrapping_add(1)) & ADDRESS_MASK;
        self.control_word = (self.control_word & CODE_MASK) | next;
    }

    // Interrupts and timing

    /// Level of the CPU's /INT line
    pub fn has_pending_interrupt(&self) -> bool {
        let frame = self.status & STATUS_FRAME_IRQ != 0 && self.registers[1] & 0x20 != 0;
        let line = self.line_interrupt_pending && self.registers[0] & 0x10 != 0;
        frame || line
    }

    /// True once per frame, after the last active line has been drawn
    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }

    /// Run for `cycles` CPU cycles, finishing as many scanlines as they cover
    pub fn advance(&mut self, cycles: u32) -> Result<(), VdpError> {
        self.line_cycles += cycles;
        while self.line_cycles >= CYCLES_PER_LINE {
            self.line_cycles -= CYCLES_PER_LINE;
            self.end_scanline()?;
        }
        Ok(())
    }

    fn end_scanline(&mut self) -> Result<(), VdpError> {
        let line = self.vcounter;

        if line <= SCREEN_HEIGHT as u16 {
            let (next, underflow) = self.line_counter.overflowing_sub(1);
            if underflow {
                self.line_counter = self.registers[10];
                self.line_interrupt_pending = true;
                log(LogCategory::Interrupts, LogLevel::Trace, || {
                    format!("VDP: line interrupt on line {}", line)
                });
            } else {
                self.line_counter = next;
            }
        } else {
            self.line_counter = self.registers[10];
        }

        if line < SCREEN_HEIGHT as u16 {
            if self.display_enabled() {
                self.check_mode(line)?;
                self.render_scanline(line);
            } else {
                self.fill_backdrop(line);
            }
        }

        if line == SCREEN_HEIGHT as u16 {
            self.status |= STATUS_FRAME_IRQ;
            self.frame_complete = true;
            self.display.pixels.copy_from_slice(&self.working.pixels);
        }

        self.vcounter += 1;
        if self.vcounter >= self.timing.lines_per_frame() {
            self.vcounter = 0;
        }
        Ok(())
    }

    fn display_enabled(&self) -> bool {
        self.registers[1] & 0x40 != 0
    }

    /// Only the 192-line picture is supported: M2 together with M1 or M3
    /// selects the 224/240-line modes
    fn check_mode(&self, line: u16) -> Result<(), VdpError> {
        let reg0 = self.registers[0];
        let reg1 = self.registers[1];
        let m2 = reg0 & 0x02 != 0;
        let m1_m3 = reg1 & 0x18 != 0;
        if !(m2 && m1_m3) {
            return Ok(());
        }
        log(LogCategory::VDP, LogLevel::Error, || {
            format!("VDP: unsupported mode reg0={:02X} reg1={:02X}", reg0, reg1)
        });
        Err(VdpError::UnsupportedMode { reg0, reg1, line })
    }

    // Rendering

    fn backdrop_color(&self) -> u32 {
        decode_color(self.cram[16 + (self.registers[7] & 0x0F) as usize])
    }

    fn fill_backdrop(&mut self, line: u16) {
        let color = self.backdrop_color();
        let start = line as usize * SCREEN_WIDTH as usize;
        self.working.pixels[start..start + SCREEN_WIDTH as usize].fill(color);
    }

    /// Render a single scanline
    fn render_scanline(&mut self, line: u16) {
        let mut bg_priority = [false; SCREEN_WIDTH as usize];
        self.render_background(line, &mut bg_priority);
        self.render_sprites(line, &bg_priority);
    }

    /// Render background layer for a scanline
    fn render_background(&mut self, line: u16, bg_priority: &mut [bool; 256]) {
        let name_table = ((self.registers[2] as u16) & 0x0E) << 10;
        let reg0 = self.registers[0];

        let scroll_x = if line < 16 && reg0 & 0x40 != 0 {
            0
        } else {
            self.registers[8]
        };
        let mask_first_column = reg0 & 0x20 != 0;
        let overscan = self.backdrop_color();
        let line_offset = line as usize * SCREEN_WIDTH as usize;

        for x in 0..SCREEN_WIDTH as usize {
            if mask_first_column && x < 8 {
                self.working.pixels[line_offset + x] = overscan;
                continue;
            }

            let scroll_y = if x >= 192 && reg0 & 0x80 != 0 {
                0
            } else {
                self.registers[9] as u16
            };
            let y = (line + scroll_y) % (NAME_TABLE_ROWS * 8);
            let tile_row = y >> 3;

            let adj_x = (x as u8).wrapping_sub(scroll_x);
            let tile_col = (adj_x >> 3) as u16;
            let pixel_x = adj_x & 7;

            let name_addr = name_table + (tile_row * 32 + tile_col) * 2;
            let entry = self.vram[name_addr as usize] as u16
                | (self.vram[(name_addr + 1) as usize] as u16) << 8;

            let tile_index = entry & 0x1FF;
            let h_flip = entry & 0x0200 != 0;
            let v_flip = entry & 0x0400 != 0;
            let palette = if entry & 0x0800 != 0 { 16 } else { 0 };
            let priority = entry & 0x1000 != 0;

            let fine_y = if v_flip { 7 - (y & 7) } else { y & 7 };
            let pattern = (tile_index * 32 + fine_y * 4) as usize;
            let bit = if h_flip { pixel_x } else { 7 - pixel_x };
            let index = pattern_pixel(&self.vram[pattern..pattern + 4], bit);

            bg_priority[x] = priority && index != 0;
            self.working.pixels[line_offset + x] =
                decode_color(self.cram[palette + index as usize]);
        }
    }

    /// Render sprites for a scanline, in table order
    fn render_sprites(&mut self, line: u16, bg_priority: &[bool; 256]) {
        let sat = (((self.registers[5] as u16) & 0x7E) << 7) as usize;
        let reg0 = self.registers[0];
        let reg1 = self.registers[1];

        let tall = reg1 & 0x02 != 0;
        let zoom = if reg1 & 0x01 != 0 { 2 } else { 1 };
        let height = (if tall { 16 } else { 8 }) * zoom;
        let width = 8 * zoom;
        let pattern_bank: u16 = if self.registers[6] & 0x04 != 0 { 256 } else { 0 };
        let shift_left = if reg0 & 0x08 != 0 { 8 } else { 0 };
        let mask_first_column = reg0 & 0x20 != 0;
        let line_offset = line as usize * SCREEN_WIDTH as usize;

        let mut covered = [false; SCREEN_WIDTH as usize];
        let mut on_line = 0;

        for i in 0..SPRITE_COUNT {
            let y = self.vram[sat + i];
            if y == SPRITE_TERMINATOR {
                break;
            }

            // Y is one less than the first line; large values wrap above the screen
            let mut row = line as i32 - y as i32 - 1;
            if row < 0 {
                row += 256;
            }
            if row >= height {
                continue;
            }

            on_line += 1;
            if on_line > SPRITES_PER_LINE {
                self.status |= STATUS_OVERFLOW;
                break;
            }

            let x = self.vram[sat + 0x80 + i * 2] as i32 - shift_left;
            let mut tile = self.vram[sat + 0x81 + i * 2] as u16;
            if tall {
                tile &= 0xFE;
            }
            let pattern_row = (row / zoom) as u16;
            let tile = tile + (pattern_row >> 3) + pattern_bank;
            let pattern = ((tile * 32 + (pattern_row & 7) * 4) & ADDRESS_MASK) as usize;
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&self.vram[pattern..pattern + 4]);

            for px in 0..width {
                let sx = x + px;
                if !(0..SCREEN_WIDTH as i32).contains(&sx) {
                    continue;
                }
                let sx = sx as usize;
                if mask_first_column && sx < 8 {
                    continue;
                }

                let index = pattern_pixel(&bytes, 7 - (px / zoom) as u8);
                if index == 0 {
                    continue;
                }
                if covered[sx] {
                    self.status |= STATUS_COLLISION;
                    continue;
                }
                covered[sx] = true;

                if bg_priority[sx] {
                    continue;
                }
                self.working.pixels[line_offset + sx] =
                    decode_color(self.cram[16 + index as usize]);
            }
        }
    }

    // Inspection

    pub fn register(&self, index: usize) -> u8 {
        self.registers[index]
    }

    pub fn vram(&self) -> &[u8] {
        &self.vram
    }

    pub fn cram(&self) -> &[u8; 32] {
        &self.cram
    }

    /// Current scanline (internal, not the remapped port value)
    pub fn vcounter(&self) -> u16 {
        self.vcounter
    }

    /// Pixels of a line in the frame being drawn
    pub fn line_pixels(&self, line: usize) -> &[u32] {
        let width = SCREEN_WIDTH as usize;
        &self.working.pixels[line * width..(line + 1) * width]
    }
}

impl Renderer for Vdp {
    fn get_frame(&self) -> &Frame {
        &self.display
    }

    fn clear(&mut self, color: u32) {
        self.working.pixels.fill(color);
        self.display.pixels.fill(color);
    }

    fn reset(&mut self) {
        let timing = self.timing;
        *self = Self::with_timing(timing);
        self.clear(0xFF00_0000);
    }

    fn name(&self) -> &str {
        "SMS VDP"
    }

    fn resize(&mut self, width: u32, height: u32) {
        // Output is fixed at 256x192
        log(LogCategory::VDP, LogLevel::Warn, || {
            format!("VDP: ignoring resize to {}x{}", width, height)
        });
    }
}
