//! Core emulator primitives and traits.
//!
//! Shared by every system crate: the [`System`] trait, the
//! [`types::Frame`] framebuffer, the Z80 CPU core, the SN76489 sound chip,
//! region timing and centralized logging.

pub mod apu;
pub mod bit_util;
pub mod cpu_z80;
pub mod logging;
pub mod renderer;

pub mod types {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; (width * height) as usize],
            }
        }
    }
}

use serde_json::Value;

/// Description of a mount point (media slot) that a system supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPointInfo {
    /// Unique identifier for this mount point (e.g., "Cartridge", "BIOS", "Floppy1")
    pub id: String,
    /// User-friendly name for display (e.g., "Cartridge Slot", "BIOS ROM")
    pub name: String,
    /// File extensions accepted by this mount point (e.g., ["nes", "unf"])
    pub extensions: Vec<String>,
    /// Whether this mount point is required for the system to function
    pub required: bool,
}

/// A high-level System trait tying components together.
pub trait System {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reset to initial power-on state
    fn reset(&mut self);

    /// Emulate until a frame is produced and return a framebuffer.
    fn step_frame(&mut self) -> Result<types::Frame, Self::Error>;

    /// Return a JSON-serializable save state for debugging.
    /// Note: Save states should NOT include ROM/cartridge data.
    /// Only save emulator state (CPU, RAM, PPU state, etc.)
    fn save_state(&self) -> Value;

    /// Load a JSON save state.
    /// Returns error if the state is incompatible or requires different mounted media.
    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error>;

    /// Check if this system supports save/load state functionality
    fn supports_save_states(&self) -> bool {
        false // Default: no save state support
    }

    /// Get the list of mount points this system supports
    fn mount_points(&self) -> Vec<MountPointInfo>;

    /// Load media into a specific mount point
    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Unload media from a specific mount point
    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error>;

    /// Check if a mount point has media loaded
    fn is_mounted(&self, mount_point_id: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_initialization() {
        let f = types::Frame::new(256, 192);
        assert_eq!(f.pixels.len(), 256 * 192);
        assert!(f.pixels.iter().all(|&p| p == 0));
    }

    /// Minimal system with one cartridge slot
    #[derive(Default)]
    struct SlotSystem {
        cart: Option<Vec<u8>>,
        frames: u64,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("no such mount point: {0}")]
    struct SlotError(String);

    impl System for SlotSystem {
        type Error = SlotError;

        fn reset(&mut self) {
            self.frames = 0;
        }

        fn step_frame(&mut self) -> Result<types::Frame, Self::Error> {
            self.frames += 1;
            Ok(types::Frame::new(2, 2))
        }

        fn save_state(&self) -> Value {
            serde_json::json!({ "frames": self.frames })
        }

        fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error> {
            self.frames = serde_json::from_value(v["frames"].clone())?;
            Ok(())
        }

        fn supports_save_states(&self) -> bool {
            true
        }

        fn mount_points(&self) -> Vec<MountPointInfo> {
            vec![MountPointInfo {
                id: "Cartridge".to_string(),
                name: "Cartridge Slot".to_string(),
                extensions: vec!["sms".to_string()],
                required: true,
            }]
        }

        fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
            match mount_point_id {
                "Cartridge" => {
                    self.cart = Some(data.to_vec());
                    Ok(())
                }
                other => Err(SlotError(other.to_string())),
            }
        }

        fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error> {
            match mount_point_id {
                "Cartridge" => {
                    self.cart = None;
                    Ok(())
                }
                other => Err(SlotError(other.to_string())),
            }
        }

        fn is_mounted(&self, mount_point_id: &str) -> bool {
            mount_point_id == "Cartridge" && self.cart.is_some()
        }
    }

    #[test]
    fn save_state_roundtrip_through_json_text() {
        let mut sys = SlotSystem::default();
        sys.step_frame().expect("frame");
        sys.step_frame().expect("frame");

        let text = serde_json::to_string(&sys.save_state()).expect("serialize");
        let value: Value = serde_json::from_str(&text).expect("deserialize");

        let mut restored = SlotSystem::default();
        restored.load_state(&value).expect("load");
        assert_eq!(restored.frames, 2);
        assert!(restored.supports_save_states());
    }

    #[test]
    fn mount_and_unmount() {
        let mut sys = SlotSystem::default();
        let points = sys.mount_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, "Cartridge");
        assert!(points[0].required);

        assert!(!sys.is_mounted("Cartridge"));
        sys.mount("Cartridge", &[0; 16]).expect("mount");
        assert!(sys.is_mounted("Cartridge"));
        assert!(sys.mount("BIOS", &[]).is_err());
        sys.unmount("Cartridge").expect("unmount");
        assert!(!sys.is_mounted("Cartridge"));
    }
}
