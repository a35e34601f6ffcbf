/*
 *  pages/patterns/waves.rs
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

use super::{interval_for, Cadence, Pattern};
use crate::matrix::{DisplayGeometry, DisplayMatrix};

/// Two superimposed sine waves, three discs thick
pub struct WavesPattern {
    frame: DisplayMatrix,
    speed: f32,
    phase: f32,
    amplitude: f32,
    cadence: Cadence,
}

impl WavesPattern {
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self {
            frame: DisplayMatrix::for_geometry(geometry),
            speed: 2.0,
            phase: 0.0,
            amplitude: geometry.height as f32 / 6.0,
            cadence: Cadence::default(),
        }
    }

    fn wave_row(&self, col: usize) -> i32 {
        let c = col as f32;
        let w1 = (self.phase + c * 0.3).sin() * self.amplitude;
        let w2 = (self.phase * 0.7 + c * 0.4).sin() * self.amplitude * 0.5;
        let centre = (self.frame.height() / 2) as f32;
        (centre + w1 + w2).round() as i32
    }
}

impl Pattern for WavesPattern {
    fn update(&mut self, now: Instant) {
        if !self.cadence.due(now, interval_for(0.2, self.speed)) {
            return;
        }
        self.phase += 0.2 * self.speed;
        self.frame.clear();
        for col in 0..self.frame.width() {
            let row = self.wave_row(col);
            for t in -1..=1 {
                self.frame.set(col as i32, row + t, true);
            }
        }
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

    #[test]
    fn test_every_column_has_a_band() {
        let mut p = WavesPattern::new(DisplayGeometry::default());
        p.update(Instant::now());
        for x in 0..28 {
            let lit = (0..28).filter(|&y| p.frame().get(x, y)).count();
            assert!((1..=3).contains(&lit), "column {} has {}", x, lit);
        }
    }
}
