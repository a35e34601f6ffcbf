/*
 *  pages/patterns/bounce.rs
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

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{interval_for, Cadence, Pattern};
use crate::matrix::{DisplayGeometry, DisplayMatrix};

/// A 2x2 ball bouncing off the edges with a little random spin
pub struct BouncePattern {
    frame: DisplayMatrix,
    speed: f32,
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
    rng: StdRng,
    cadence: Cadence,
}

impl BouncePattern {
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self::with_rng(geometry, StdRng::from_os_rng())
    }

    pub fn with_rng(geometry: DisplayGeometry, rng: StdRng) -> Self {
        let d = std::f32::consts::FRAC_1_SQRT_2;
        Self {
            frame: DisplayMatrix::for_geometry(geometry),
            speed: 1.0,
            x: geometry.width as f32 / 2.0,
            y: geometry.height as f32 / 2.0,
            dx: d,
            dy: d,
            rng,
            cadence: Cadence::default(),
        }
    }

    fn normalise(&mut self) {
        let len = (self.dx * self.dx + self.dy * self.dy).sqrt();
        if len > f32::EPSILON {
            self.dx /= len;
            self.dy /= len;
        }
    }

    fn step(&mut self) {
        let max_x = self.frame.width() as f32 - 2.0;
        let max_y = self.frame.height() as f32 - 2.0;

        self.x += self.dx;
        self.y += self.dy;

        if self.x <= 0.0 || self.x >= max_x {
            self.dx = -self.dx;
            self.x = self.x.clamp(0.0, max_x);
            self.dy += self.rng.random::<f32>() * 0.3;
            self.normalise();
        }
        if self.y <= 0.0 || self.y >= max_y {
            self.dy = -self.dy;
            self.y = self.y.clamp(0.0, max_y);
            self.dx += self.rng.random::<f32>() * 0.3;
            self.normalise();
        }
    }
}

impl Pattern for BouncePattern {
    fn update(&mut self, now: Instant) {
        if !self.cadence.due(now, interval_for(0.05, self.speed)) {
            return;
        }
        self.step();
        self.frame.clear();
        self.frame.draw_rectangle(self.x as i32, self.y as i32, 2, 2, true, true);
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
    fn test_ball_stays_on_screen() {
        let mut p = BouncePattern::with_rng(DisplayGeometry::default(), StdRng::seed_from_u64(7));
        let t0 = Instant::now();
        for i in 0..2000u64 {
            p.update(t0 + Duration::from_millis(i * 50));
            assert_eq!(p.frame().count_on(), 4, "ball clipped at step {}", i);
        }
    }
}
