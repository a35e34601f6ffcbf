/*
 *  pages/patterns/clock.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
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

use std::time::Instant;

use chrono::{Local, Timelike};
use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use super::{interval_for, Cadence, Pattern};
use crate::matrix::{DisplayGeometry, DisplayMatrix};

/// top-left of each digit: hour tens, hour ones, minute tens, minute ones
const DIGIT_ORIGINS: [(i32, i32); 4] = [(5, 2), (16, 2), (5, 15), (16, 15)];

/// HH over MM in a 2x2 grid of digits
pub struct ClockPattern {
    frame: DisplayMatrix,
    speed: f32,
    cadence: Cadence,
}

impl ClockPattern {
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self { frame: DisplayMatrix::for_geometry(geometry), speed: 1.0, cadence: Cadence::default() }
    }

    /// Draw `hhmm` into the frame
    pub fn draw_time(&mut self, hour: u32, minute: u32) {
        self.frame.clear();
        let text = format!("{:02}{:02}", hour % 24, minute % 60);
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        for (ch, &(x, y)) in text.chars().zip(DIGIT_ORIGINS.iter()) {
            let mut buf = [0u8; 4];
            let _ = Text::with_baseline(ch.encode_utf8(&mut buf), Point::new(x, y), style, Baseline::Top)
                .draw(&mut self.frame);
        }
    }
}

impl Pattern for ClockPattern {
    fn update(&mut self, now: Instant) {
        if !self.cadence.due(now, interval_for(1.0, self.speed)) {
            return;
        }
        let t = Local::now();
        self.draw_time(t.hour(), t.minute());
    }

    fn frame(&self) -> &DisplayMatrix {
        &self.frame
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn speed(&self) -> f32 {
        self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_in(m: &DisplayMatrix, x0: i32, y0: i32) -> usize {
        (y0..y0 + 11)
            .flat_map(|y| (x0..x0 + 11).map(move |x| (x, y)))
            .filter(|&(x, y)| m.get(x, y))
            .count()
    }

    #[test]
    fn test_four_digits_in_quadrants() {
        let mut p = ClockPattern::new(DisplayGeometry::default());
        p.draw_time(18, 47);
        let m = p.frame();
        for (x, y) in [(3, 2), (14, 2), (3, 15), (14, 15)] {
            assert!(lit_in(m, x, y) > 0, "empty digit cell at {},{}", x, y);
        }
    }

    #[test]
    fn test_minute_change_changes_frame() {
        let mut p = ClockPattern::new(DisplayGeometry::default());
        p.draw_time(9, 5);
        let a = p.frame().clone();
        p.draw_time(9, 6);
        assert_ne!(&a, p.frame());
    }
}
