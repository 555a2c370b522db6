//! Region timing for Master System class hardware.

use serde::{Deserialize, Serialize};

/// Console region timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimingMode {
    /// NTSC (North America, Japan): 3.579545 MHz CPU, 262 lines
    #[default]
    Ntsc,
    /// PAL (Europe, Australia): 3.546893 MHz CPU, 313 lines
    Pal,
}

impl TimingMode {
    /// CPU clock frequency in Hz
    pub fn cpu_clock_hz(&self) -> f64 {
        match self {
            TimingMode::Ntsc => 3_579_545.0,
            TimingMode::Pal => 3_546_893.0,
        }
    }

    /// Total scanlines per frame, including blanking
    pub fn lines_per_frame(&self) -> u16 {
        match self {
            TimingMode::Ntsc => 262,
            TimingMode::Pal => 313,
        }
    }

    /// Frame rate in Hz
    pub fn frame_rate_hz(&self) -> f64 {
        self.cpu_clock_hz() / (CYCLES_PER_LINE as f64 * self.lines_per_frame() as f64)
    }

    /// The PSG runs at the CPU clock divided by 16
    pub fn psg_clock_hz(&self) -> f64 {
        self.cpu_clock_hz() / 16.0
    }
}

/// CPU cycles per scanline
pub const CYCLES_PER_LINE: u32 = 228;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rates() {
        let ntsc = TimingMode::Ntsc.frame_rate_hz();
        let pal = TimingMode::Pal.frame_rate_hz();
        assert!((ntsc - 59.92).abs() < 0.05, "ntsc {}", ntsc);
        assert!((pal - 49.70).abs() < 0.05, "pal {}", pal);
    }

    #[test]
    fn test_line_counts() {
        assert_eq!(TimingMode::default(), TimingMode::Ntsc);
        assert_eq!(TimingMode::Ntsc.lines_per_frame(), 262);
        assert_eq!(TimingMode::Pal.lines_per_frame(), 313);
    }
}
