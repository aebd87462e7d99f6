use crate::framebuffer::Framebuffer;
use std::collections::VecDeque;

/// Blends the current framebuffer with the last few raw frames, so sprites
/// that get erased and redrawn every tick don't flicker.
pub struct FrameCompositor {
    /// newest first, always exactly `depth` frames
    history: VecDeque<Framebuffer>,
    depth: usize,
}

impl FrameCompositor {
    /// `depth` of 0 is treated as 1
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        FrameCompositor {
            history: std::iter::repeat(Framebuffer::new()).take(depth).collect(),
            depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// OR `current` with every retained frame, then remember `current` as the
    /// newest raw frame, dropping the oldest
    pub fn compose(&mut self, current: &Framebuffer) -> Framebuffer {
        let blended = self
            .history
            .iter()
            .fold(*current, |acc, frame| acc | *frame);
        self.history.push_front(*current);
        self.history.truncate(self.depth);
        blended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(y: usize, col: usize, bits: u8) -> Framebuffer {
        let mut f = Framebuffer::new();
        f.xor_byte(y, col, bits);
        f
    }

    #[test]
    fn test_first_frame_passes_through() {
        let mut c = FrameCompositor::new(1);
        let f = frame_with(0, 0, 0x80);
        assert_eq!(c.compose(&f), f);
    }

    #[test]
    fn test_depth_one_blends_previous_frame() {
        let mut c = FrameCompositor::new(1);
        let a = frame_with(0, 0, 0x80);
        let b = frame_with(1, 0, 0x80);
        c.compose(&a);
        let out = c.compose(&b);
        assert!(out.is_lit(0, 0));
        assert!(out.is_lit(0, 1));
        // a has aged out
        let out = c.compose(&Framebuffer::new());
        assert!(!out.is_lit(0, 0));
        assert!(out.is_lit(0, 1));
        assert!(c.compose(&Framebuffer::new()).is_blank());
    }

    #[test]
    fn test_deeper_history_blends_all_retained_frames() {
        let mut c = FrameCompositor::new(3);
        for y in 0..3 {
            c.compose(&frame_with(y, 0, 0x80));
        }
        let out = c.compose(&frame_with(3, 0, 0x80));
        for y in 0..4 {
            assert!(out.is_lit(0, y), "row {} should be lit", y);
        }
        let out = c.compose(&Framebuffer::new());
        assert!(!out.is_lit(0, 0));
        assert!(out.is_lit(0, 1));
    }

    #[test]
    fn test_does_not_change_input() {
        let mut c = FrameCompositor::new(2);
        c.compose(&frame_with(5, 5, 0xff));
        let f = frame_with(6, 6, 0x01);
        let copy = f;
        c.compose(&f);
        assert_eq!(f, copy);
    }

    #[test]
    fn test_zero_depth_clamped() {
        assert_eq!(FrameCompositor::new(0).depth(), 1);
    }
}
