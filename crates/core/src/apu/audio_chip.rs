//! Audio chip trait for pluggable sound generators.

use super::TimingMode;

/// A sound chip that can be written through a port and clocked for samples
pub trait AudioChip {
    /// Write to the chip through the given port
    fn write_register(&mut self, port: u16, val: u8);

    /// Read back a register, for chips that have readable state
    fn read_register(&self, port: u16) -> u8 {
        let _ = port;
        0xFF
    }

    /// Clock the chip once and return the mixed output sample
    fn clock(&mut self) -> i16;

    fn timing(&self) -> TimingMode;

    fn generate_samples(&mut self, count: usize) -> Vec<i16> {
        (0..count).map(|_| self.clock()).collect()
    }

    fn reset(&mut self);

    /// Native output rate in Hz (one sample per chip clock)
    fn sample_rate(&self) -> f64 {
        self.timing().psg_clock_hz()
    }
}
