/*
 *  pages/qr.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  QR code rendering for the sketchpad hand-off link
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

use qrcode::{Color, EcLevel, QrCode, Version};

use crate::error::PageError;
use crate::matrix::{DisplayGeometry, DisplayMatrix};

/// Modules are placed one disc in from the top-left corner
const QR_OFFSET: i32 = 1;

/// The text encoded for a token: scheme dropped to keep it within version 2
pub fn token_link(url: &str, token: &str) -> String {
    let bare = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    format!("{}?t={}", bare, token)
}

/// Render `data` as a version 2 (25x25) code, low error correction
pub fn render_qr(data: &str, geometry: DisplayGeometry) -> Result<DisplayMatrix, PageError> {
    let code = QrCode::with_version(data.as_bytes(), Version::Normal(2), EcLevel::L)
        .map_err(|e| PageError::Initialization(format!("QR encode of '{}' failed: {}", data, e)))?;

    let width = code.width();
    let needed = width + QR_OFFSET as usize;
    if needed > geometry.width || needed > geometry.height {
        return Err(PageError::Initialization(format!(
            "QR code of {} modules does not fit {}x{}",
            width, geometry.width, geometry.height
        )));
    }

    let mut m = DisplayMatrix::for_geometry(geometry);
    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color == Color::Dark {
            let (x, y) = ((i % width) as i32, (i / width) as i32);
            m.set(x + QR_OFFSET, y + QR_OFFSET, true);
        }
    }
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_link_strips_scheme() {
        assert_eq!(token_link("https://example.com/flip/draw", "Ab12Cd"), "example.com/flip/draw?t=Ab12Cd");
        assert_eq!(token_link("example.com/draw", "x"), "example.com/draw?t=x");
    }

    #[test]
    fn test_qr_is_25_modules_at_offset_one() {
        let m = render_qr("example.com/flip/draw?t=Ab12Cd", DisplayGeometry::default()).unwrap();
        // finder pattern corners
        assert!(m.get(1, 1));
        assert!(m.get(25, 1));
        assert!(m.get(1, 25));
        // border and the strip beyond the code stay off
        for i in 0..28 {
            assert!(!m.get(0, i));
            assert!(!m.get(i, 0));
            assert!(!m.get(26, i));
            assert!(!m.get(27, i));
        }
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let long = "x".repeat(200);
        assert!(render_qr(&long, DisplayGeometry::default()).is_err());
    }
}
