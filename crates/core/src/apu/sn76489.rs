//! Texas Instruments SN76489 Programmable Sound Generator (Sega variant)
//!
//! # Architecture
//! - 3 square wave tone channels with 10-bit periods
//! - 1 noise channel (periodic or white, 16-bit LFSR on Sega hardware)
//! - 4-bit attenuation per channel, 2 dB per step, 0xF = off
//!
//! The chip is written through a single port. A byte with bit 7 set latches a
//! channel and register type and carries 4 data bits; a byte with bit 7 clear
//! supplies the upper 6 bits of a tone period (or a new attenuation when a
//! volume register is latched).

use serde::{Deserialize, Serialize};

use crate::apu::{AudioChip, TimingMode};
use crate::logging::{log, LogCategory, LogLevel};

/// Loudest channel amplitude; each attenuation step is 2 dB quieter
const MAX_VOLUME: f32 = 8000.0;
const TWO_DECIBELS: f32 = 0.8;

const LFSR_RESET: u16 = 0x8000;
/// Sega white noise feeds back bits 0 and 3
const WHITE_NOISE_TAPS: u16 = 0x0009;

/// Attenuation (0-15) to amplitude
fn volume_table() -> [i16; 16] {
    let mut table = [0i16; 16];
    let mut level = MAX_VOLUME;
    for entry in table.iter_mut().take(15) {
        *entry = level as i16;
        level *= TWO_DECIBELS;
    }
    table
}

/// SN76489 PSG state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sn76489Psg {
    /// Tone periods for channels 0-2 (10 bits)
    tone_period: [u16; 3],
    tone_counter: [u16; 3],
    tone_output: [bool; 3],

    noise_control: u8,
    noise_lfsr: u16,
    noise_counter: u16,
    noise_output: bool,

    /// Attenuation for tone 0-2 and noise
    volume: [u8; 4],

    latched_channel: u8,
    latched_volume: bool,

    #[serde(skip, default = "volume_table")]
    amplitude: [i16; 16],

    timing_mode: TimingMode,
}

impl Sn76489Psg {
    pub fn new(timing_mode: TimingMode) -> Self {
        Self {
            tone_period: [0; 3],
            tone_counter: [0; 3],
            tone_output: [false; 3],
            noise_control: 0,
            noise_lfsr: LFSR_RESET,
            noise_counter: 0,
            noise_output: false,
            volume: [0x0F; 4],
            latched_channel: 0,
            latched_volume: false,
            amplitude: volume_table(),
            timing_mode,
        }
    }

    /// Write a byte to the PSG port
    pub fn write(&mut self, data: u8) {
        if data & 0x80 != 0 {
            self.latched_channel = (data >> 5) & 0x03;
            self.latched_volume = data & 0x10 != 0;
            self.write_low_bits(data & 0x0F);
        } else if self.latched_volume {
            self.volume[self.latched_channel as usize] = data & 0x0F;
        } else if self.latched_channel < 3 {
            let ch = self.latched_channel as usize;
            self.tone_period[ch] = (self.tone_period[ch] & 0x00F) | (((data & 0x3F) as u16) << 4);
        } else {
            self.set_noise_control(data);
        }
    }

    fn write_low_bits(&mut self, bits: u8) {
        let ch = self.latched_channel as usize;
        if self.latched_volume {
            self.volume[ch] = bits;
        } else if ch < 3 {
            self.tone_period[ch] = (self.tone_period[ch] & 0x3F0) | bits as u16;
        } else {
            self.set_noise_control(bits);
        }
    }

    fn set_noise_control(&mut self, bits: u8) {
        self.noise_control = bits & 0x07;
        self.noise_lfsr = LFSR_RESET;
        log(LogCategory::PSG, LogLevel::Trace, || {
            format!(
                "PSG: noise {} rate {}",
                if bits & 0x04 != 0 { "white" } else { "periodic" },
                bits & 0x03
            )
        });
    }

    /// Advance the generators by one PSG clock (CPU clock / 16)
    fn tick(&mut self) {
        for ch in 0..3 {
            if self.tone_counter[ch] > 0 {
                self.tone_counter[ch] -= 1;
            }
            if self.tone_counter[ch] == 0 {
                self.tone_counter[ch] = self.tone_period[ch];
                // Periods 0 and 1 hold the output high
                self.tone_output[ch] = self.tone_period[ch] <= 1 || !self.tone_output[ch];
            }
        }

        if self.noise_counter > 0 {
            self.noise_counter -= 1;
        }
        if self.noise_counter == 0 {
            self.noise_counter = match self.noise_control & 0x03 {
                0 => 0x10,
                1 => 0x20,
                2 => 0x40,
                _ => self.tone_period[2].max(1),
            };
            self.shift_lfsr();
        }
    }

    fn shift_lfsr(&mut self) {
        let feedback = if self.noise_control & 0x04 != 0 {
            (self.noise_lfsr & WHITE_NOISE_TAPS).count_ones() & 1 == 1
        } else {
            self.noise_lfsr & 1 != 0
        };
        self.noise_output = self.noise_lfsr & 1 != 0;
        self.noise_lfsr >>= 1;
        if feedback {
            self.noise_lfsr |= 0x8000;
        }
    }

    /// Current mixed output of all four channels
    fn sample(&self) -> i16 {
        let mut mix = 0i32;
        for ch in 0..3 {
            if self.tone_output[ch] {
                mix += self.amplitude[self.volume[ch] as usize] as i32;
            }
        }
        if self.noise_output {
            mix += self.amplitude[self.volume[3] as usize] as i32;
        }
        mix.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }

    /// Attenuation of a channel (0 = loudest, 15 = off)
    pub fn volume(&self, channel: usize) -> u8 {
        self.volume[channel]
    }

    /// 10-bit tone period of a tone channel
    pub fn tone_period(&self, channel: usize) -> u16 {
        self.tone_period[channel]
    }

    pub fn reset_state(&mut self) {
        *self = Self::new(self.timing_mode);
    }
}

impl AudioChip for Sn76489Psg {
    fn write_register(&mut self, _port: u16, val: u8) {
        self.write(val);
    }

    fn clock(&mut self) -> i16 {
        self.tick();
        self.sample()
    }

    fn timing(&self) -> TimingMode {
        self.timing_mode
    }

    fn reset(&mut self) {
        self.reset_state();
    }
}
