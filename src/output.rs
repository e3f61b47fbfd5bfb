//! Terminal presentation of the frame buffer.
//!
//! The engine publishes frames as owned copies; turning one into text here
//! keeps the driver loop free of any rendering knowledge beyond printing.

use crate::state::{FrameBuffer, FRAME_HEIGHT, FRAME_WIDTH};

// Two columns per pixel lands close to square on most terminal fonts.
const LIT: &str = "██";
const DARK: &str = "  ";

/// Render a frame as `FRAME_HEIGHT` newline-terminated rows.
pub fn render_frame(frame: &FrameBuffer) -> String {
    let mut out = String::with_capacity(FRAME_HEIGHT * (FRAME_WIDTH * 2 + 1));
    for row in frame.rows() {
        for &px in row {
            out.push_str(if px == 1 { LIT } else { DARK });
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_frame_renders_all_rows() {
        let text = render_frame(&FrameBuffer::new());
        assert_eq!(text.lines().count(), FRAME_HEIGHT);
        assert!(text.lines().all(|line| line.chars().all(|c| c == ' ')));
    }

    #[test]
    fn lit_pixels_show_up_in_place() {
        let mut frame = FrameBuffer::new();
        frame.set(0, 0, 1);
        frame.set(63, 31, 1);
        let text = render_frame(&frame);
        let rows: Vec<&str> = text.lines().collect();
        assert!(rows[0].starts_with(LIT));
        assert!(rows[31].ends_with(LIT));
    }
}
