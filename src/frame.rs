/*
 *  frame.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Disc matrix to panel wire frame encoder
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! Frame format, one frame per panel:
//! ```text
//! ┌────────┬─────────┬──────────┬──────────────────────┬──────┐
//! │ HEADER │ COMMAND │ PANEL ID │ 28 ROW BYTES         │ TAIL │
//! │ 0x80   │ 0x83    │ 1|2|4|8  │ bit 6 = leftmost disc│ 0x8F │
//! └────────┴─────────┴──────────┴──────────────────────┴──────┘
//! ```

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, FRAME_COMMAND, FRAME_HEADER, FRAME_LENGTH,
    FRAME_PAYLOAD_START, FRAME_TAIL, PANEL_COUNT, PANEL_DISC_WIDTH, PANEL_IDS,
};
use crate::error::FrameError;
use crate::matrix::DisplayMatrix;

/// Fixed 32-byte update for a single panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireFrame([u8; FRAME_LENGTH]);

impl WireFrame {
    pub fn as_bytes(&self) -> &[u8; FRAME_LENGTH] {
        &self.0
    }

    pub fn panel_id(&self) -> u8 {
        self.0[2]
    }

    /// The packed row bytes, top row first
    pub fn payload(&self) -> &[u8] {
        &self.0[FRAME_PAYLOAD_START..FRAME_LENGTH - 1]
    }
}

/// Encode a full display matrix into one frame per panel, left panel first.
pub fn encode(matrix: &DisplayMatrix) -> Result<[WireFrame; PANEL_COUNT], FrameError> {
    if matrix.width() != DISPLAY_WIDTH || matrix.height() != DISPLAY_HEIGHT {
        return Err(FrameError::DimensionMismatch {
            expected_width: DISPLAY_WIDTH,
            expected_height: DISPLAY_HEIGHT,
            actual_width: matrix.width(),
            actual_height: matrix.height(),
        });
    }

    let mut frames = [WireFrame([0u8; FRAME_LENGTH]); PANEL_COUNT];
    for (panel, frame) in frames.iter_mut().enumerate() {
        let bytes = &mut frame.0;
        bytes[0] = FRAME_HEADER;
        bytes[1] = FRAME_COMMAND;
        bytes[2] = PANEL_IDS[panel];
        bytes[FRAME_LENGTH - 1] = FRAME_TAIL;

        let band = panel * PANEL_DISC_WIDTH..(panel + 1) * PANEL_DISC_WIDTH;
        for y in 0..DISPLAY_HEIGHT {
            let row = &matrix.row(y)[band.clone()];
            bytes[FRAME_PAYLOAD_START + y] = pack_row(row);
        }
    }
    Ok(frames)
}

#[inline]
fn pack_row(discs: &[bool]) -> u8 {
    discs.iter().fold(0u8, |acc, &on| (acc << 1) | on as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_matrix_frames() {
        let frames = encode(&DisplayMatrix::default()).unwrap();
        assert_eq!(frames.len(), 4);
        let ids: Vec<u8> = frames.iter().map(|f| f.panel_id()).collect();
        assert_eq!(ids, vec![1, 2, 4, 8]);
        for f in &frames {
            let b = f.as_bytes();
            assert_eq!(b.len(), 32);
            assert_eq!(b[0], 128);
            assert_eq!(b[1], 131);
            assert_eq!(b[31], 143);
            assert!(f.payload().iter().all(|&p| p == 0));
            assert_eq!(f.payload().len(), 28);
        }
    }

    #[test]
    fn test_single_disc_sets_single_bit() {
        // panel 2, offset 3, row 11
        let mut m = DisplayMatrix::default();
        m.set((2 * 7 + 3) as i32, 11, true);
        let frames = encode(&m).unwrap();

        let mut set_bits = 0;
        for (panel, f) in frames.iter().enumerate() {
            for (row, &byte) in f.payload().iter().enumerate() {
                set_bits += byte.count_ones();
                if byte != 0 {
                    assert_eq!(panel, 2);
                    assert_eq!(row, 11);
                    assert_eq!(byte, 1 << (6 - 3));
                }
            }
        }
        assert_eq!(set_bits, 1);
    }

    #[test]
    fn test_full_row_saturates_seven_bits() {
        let mut m = DisplayMatrix::default();
        m.draw_line(0, 0, 27, 0, true);
        let frames = encode(&m).unwrap();
        for f in &frames {
            assert_eq!(f.payload()[0], 0x7F);
            assert_eq!(f.payload()[1], 0);
        }
    }

    #[test]
    fn test_leftmost_disc_is_most_significant() {
        let mut m = DisplayMatrix::default();
        m.set(0, 0, true);
        m.set(6, 1, true);
        let frames = encode(&m).unwrap();
        assert_eq!(frames[0].payload()[0], 0b100_0000);
        assert_eq!(frames[0].payload()[1], 0b000_0001);
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let m = DisplayMatrix::new(27, 28);
        assert!(matches!(encode(&m), Err(FrameError::DimensionMismatch { actual_width: 27, .. })));
    }
}
