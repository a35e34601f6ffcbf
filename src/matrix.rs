/*
 *  matrix.rs
 *
 *  flipframe - flip-disc frame controller
 *	(c) 2025-26 flipframe contributors
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Width and height of the disc grid a page renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: usize,
    pub height: usize,
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self { width: DISPLAY_WIDTH, height: DISPLAY_HEIGHT }
    }
}

/// A runtime-sized grid of binary disc states, row-major.
///
/// Writes outside the grid are clipped silently, which is what the
/// pattern code relies on when it draws shapes near the edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMatrix {
    cells: Vec<bool>,
    w: usize,
    h: usize,
}

impl DisplayMatrix {
    pub fn new(width: usize, height: usize) -> Self {
        Self { cells: vec![false; width * height], w: width, h: height }
    }

    pub fn for_geometry(geometry: DisplayGeometry) -> Self {
        Self::new(geometry.width, geometry.height)
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    pub fn geometry(&self) -> DisplayGeometry {
        DisplayGeometry { width: self.w, height: self.h }
    }

    #[inline]
    fn idx(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && y >= 0 {
            let (x, y) = (x as usize, y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }

    pub fn set(&mut self, x: i32, y: i32, on: bool) {
        if let Some(i) = self.idx(x, y) {
            self.cells[i] = on;
        }
    }

    /// Out-of-range reads are off
    pub fn get(&self, x: i32, y: i32) -> bool {
        self.idx(x, y).map(|i| self.cells[i]).unwrap_or(false)
    }

    pub fn row(&self, y: usize) -> &[bool] {
        &self.cells[y * self.w..(y + 1) * self.w]
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    pub fn invert(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = !*c);
    }

    /// Rotate 180 degrees (upside-down mounting)
    pub fn flipped(&self) -> Self {
        let mut cells = self.cells.clone();
        cells.reverse();
        Self { cells, w: self.w, h: self.h }
    }

    pub fn count_on(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub fn is_blank(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }

    /// Copy `other` in with its top-left corner at (x, y), clipped
    pub fn blit(&mut self, other: &DisplayMatrix, x: i32, y: i32) {
        for oy in 0..other.h {
            for ox in 0..other.w {
                self.set(x + ox as i32, y + oy as i32, other.cells[oy * other.w + ox]);
            }
        }
    }

    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, on: bool) {
        let color = if on { BinaryColor::On } else { BinaryColor::Off };
        let _ = Line::new(Point::new(x0, y0), Point::new(x1, y1))
            .into_styled(PrimitiveStyle::with_stroke(color, 1))
            .draw(self);
    }

    pub fn draw_rectangle(&mut self, x: i32, y: i32, width: u32, height: u32, on: bool, fill: bool) {
        let color = if on { BinaryColor::On } else { BinaryColor::Off };
        let style = if fill {
            PrimitiveStyle::with_fill(color)
        } else {
            PrimitiveStyle::with_stroke(color, 1)
        };
        let _ = Rectangle::new(Point::new(x, y), Size::new(width, height))
            .into_styled(style)
            .draw(self);
    }
}

impl Default for DisplayMatrix {
    fn default() -> Self {
        Self::for_geometry(DisplayGeometry::default())
    }
}

impl OriginDimensions for DisplayMatrix {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for DisplayMatrix {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            self.set(p.x, p.y, c.is_on());
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.cells.fill(color.is_on());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry_is_28_square() {
        let m = DisplayMatrix::default();
        assert_eq!(m.width(), 28);
        assert_eq!(m.height(), 28);
        assert!(m.is_blank());
    }

    #[test]
    fn test_out_of_range_writes_are_clipped() {
        let mut m = DisplayMatrix::new(4, 4);
        m.set(-1, 0, true);
        m.set(4, 0, true);
        m.set(0, 9, true);
        assert!(m.is_blank());
        assert!(!m.get(10, 10));
    }

    #[test]
    fn test_flip_moves_top_left_to_bottom_right() {
        let mut m = DisplayMatrix::new(3, 2);
        m.set(0, 0, true);
        let f = m.flipped();
        assert!(f.get(2, 1));
        assert_eq!(f.count_on(), 1);
    }

    #[test]
    fn test_line_and_rectangle() {
        let mut m = DisplayMatrix::new(10, 10);
        m.draw_line(0, 0, 9, 9, true);
        assert_eq!(m.count_on(), 10);
        assert!(m.get(5, 5));

        m.clear();
        m.draw_rectangle(1, 1, 4, 3, true, false);
        // perimeter of a 4x3 box
        assert_eq!(m.count_on(), 10);
        m.clear();
        m.draw_rectangle(1, 1, 4, 3, true, true);
        assert_eq!(m.count_on(), 12);
    }

    #[test]
    fn test_invert_and_blit() {
        let mut small = DisplayMatrix::new(2, 2);
        small.invert();
        let mut m = DisplayMatrix::new(5, 5);
        m.blit(&small, 4, 4);
        assert_eq!(m.count_on(), 1);
        assert!(m.get(4, 4));
    }
}
