//! Sound generation and region timing.
//!
//! - [`Sn76489Psg`]: the Master System's programmable sound generator
//! - [`AudioChip`]: common interface for clocked sound chips
//! - [`TimingMode`]: NTSC/PAL clock rates and frame geometry

pub mod audio_chip;
pub mod sn76489;
pub mod timing;

pub use audio_chip::AudioChip;
pub use sn76489::Sn76489Psg;
pub use timing::{TimingMode, CYCLES_PER_LINE};
