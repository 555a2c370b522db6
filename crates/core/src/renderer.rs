//! Renderer trait shared by video chips
//!
//! A video chip draws into a [`Frame`] it owns; the system driver asks it for
//! the finished frame once a frame boundary has been reached.
//!
//! ```rust,ignore
//! use emu_core::renderer::Renderer;
//!
//! let frame = vdp.get_frame().clone();
//! ```

use crate::types::Frame;

/// Framebuffer owner for an emulated video chip
pub trait Renderer: Send {
    /// The current framebuffer
    fn get_frame(&self) -> &Frame;

    /// Fill the framebuffer with an ARGB8888 colour
    fn clear(&mut self, color: u32);

    /// Return to power-on state, including the framebuffer
    fn reset(&mut self);

    /// Human-readable name for logs and debug output
    fn name(&self) -> &str;

    /// Recreate the framebuffer at a new size
    fn resize(&mut self, width: u32, height: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SolidRenderer {
        frame: Frame,
    }

    impl Renderer for SolidRenderer {
        fn get_frame(&self) -> &Frame {
            &self.frame
        }

        fn clear(&mut self, color: u32) {
            self.frame.pixels.fill(color);
        }

        fn reset(&mut self) {
            self.clear(0xFF00_0000);
        }

        fn name(&self) -> &str {
            "Solid"
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.frame = Frame::new(width, height);
        }
    }

    #[test]
    fn test_clear_and_reset() {
        let mut renderer = SolidRenderer {
            frame: Frame::new(256, 192),
        };
        renderer.clear(0xFFFF_0000);
        assert!(renderer.get_frame().pixels.iter().all(|&p| p == 0xFFFF_0000));
        renderer.reset();
        assert!(renderer.get_frame().pixels.iter().all(|&p| p == 0xFF00_0000));
        assert_eq!(renderer.name(), "Solid");
    }

    #[test]
    fn test_resize() {
        let mut renderer = SolidRenderer {
            frame: Frame::new(256, 192),
        };
        renderer.resize(256, 224);
        let frame = renderer.get_frame();
        assert_eq!((frame.width, frame.height), (256, 224));
        assert_eq!(frame.pixels.len(), 256 * 224);
    }
}
