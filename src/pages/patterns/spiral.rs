/*
 *  pages/patterns/spiral.rs
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

const MAX_RADIUS: f32 = 50.0;
/// 2x2 brush
const THICKNESS: [(i32, i32); 4] = [(0, 0), (0, 1), (1, 1), (1, 0)];

/// Archimedean spiral rotating about the centre
pub struct SpiralPattern {
    frame: DisplayMatrix,
    speed: f32,
    angle: f32,
    cadence: Cadence,
}

impl SpiralPattern {
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self {
            frame: DisplayMatrix::for_geometry(geometry),
            speed: 2.0,
            angle: 0.0,
            cadence: Cadence::default(),
        }
    }

    fn draw(&mut self) {
        self.frame.clear();
        let cx = (self.frame.width() / 2) as f32;
        let cy = (self.frame.height() / 2) as f32;

        for step in 0..500 {
            let t = step as f32 * 0.1;
            let r = t * 2.0;
            let a = t * 2.0 + self.angle;
            let x = (cx + r * a.cos()).round() as i32;
            let y = (cy + r * a.sin()).round() as i32;
            for (dx, dy) in THICKNESS {
                self.frame.set(x + dx, y + dy, true);
            }
            if r > MAX_RADIUS {
                break;
            }
        }
    }
}

impl Pattern for SpiralPattern {
    fn update(&mut self, now: Instant) {
        if !self.cadence.due(now, interval_for(0.2, self.speed)) {
            return;
        }
        self.angle += 0.2 * self.speed;
        self.draw();
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
    use std::time::Duration;

    #[test]
    fn test_rotates_between_updates() {
        let mut p = SpiralPattern::new(DisplayGeometry::default());
        let t0 = Instant::now();
        p.update(t0);
        let first = p.frame().clone();
        // inside the interval nothing moves
        p.update(t0 + Duration::from_millis(10));
        assert_eq!(p.frame(), &first);
        p.update(t0 + Duration::from_millis(100));
        assert_ne!(p.frame(), &first);
        // centre is always part of the arm
        assert!(p.frame().get(14, 14));
    }
}
