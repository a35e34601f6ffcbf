/*
 *  pages/patterns/cascade.rs
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

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Pattern;
use crate::matrix::{DisplayGeometry, DisplayMatrix};

const BASE_MIN_INTERVAL_MS: f32 = 100.0;
const START_INTERVAL_MS: f32 = 1000.0;

/// Random discs flip on until the board is full, then off again,
/// accelerating as each sweep progresses.
pub struct CascadePattern {
    frame: DisplayMatrix,
    speed: f32,
    /// true while filling
    filling: bool,
    total_flipped: usize,
    max_flips: usize,
    current_interval_ms: f32,
    min_interval_ms: f32,
    last_flip: Option<Instant>,
    rng: StdRng,
}

impl CascadePattern {
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self::with_rng(geometry, StdRng::from_os_rng())
    }

    pub fn with_rng(geometry: DisplayGeometry, rng: StdRng) -> Self {
        let mut p = Self {
            frame: DisplayMatrix::for_geometry(geometry),
            speed: 0.5,
            filling: true,
            total_flipped: 0,
            max_flips: geometry.width.min(geometry.height) * 50,
            current_interval_ms: START_INTERVAL_MS,
            min_interval_ms: BASE_MIN_INTERVAL_MS,
            last_flip: None,
            rng,
        };
        p.retime();
        p
    }

    fn retime(&mut self) {
        self.min_interval_ms = BASE_MIN_INTERVAL_MS / self.speed.max(0.01);
        self.current_interval_ms = self.current_interval_ms.max(self.min_interval_ms);
    }

    /// Flip one random disc; false when the sweep is complete
    fn flip_one(&mut self) -> bool {
        let w = self.frame.width();
        let candidates: Vec<usize> = (0..w * self.frame.height())
            .filter(|&i| self.frame.get((i % w) as i32, (i / w) as i32) != self.filling)
            .collect();
        if candidates.is_empty() {
            return false;
        }
        let i = candidates[self.rng.random_range(0..candidates.len())];
        self.frame.set((i % w) as i32, (i / w) as i32, self.filling);
        self.total_flipped += 1;
        true
    }
}

impl Pattern for CascadePattern {
    fn update(&mut self, now: Instant) {
        let due = match self.last_flip {
            None => true,
            Some(last) => {
                now.saturating_duration_since(last) > Duration::from_secs_f32(self.current_interval_ms / 1000.0)
            }
        };
        if !due {
            return;
        }

        let flips = (self.total_flipped / 20).max(1);
        for _ in 0..flips {
            if !self.flip_one() {
                self.filling = !self.filling;
                self.total_flipped = 0;
                self.current_interval_ms = self.min_interval_ms;
                break;
            }
        }
        self.last_flip = Some(now);

        let progress = self.total_flipped as f32 / self.max_flips as f32;
        let accel = ((0.99 - progress) * (1.0 + self.speed * 2.0)).min(0.9);
        let floor = self.min_interval_ms / self.speed.max(0.01);
        self.current_interval_ms = (self.current_interval_ms * accel).max(floor);
    }

    fn frame(&self) -> &DisplayMatrix {
        &self.frame
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
        self.retime();
    }

    fn speed(&self) -> f32 {
        self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_then_empties() {
        let g = DisplayGeometry::default();
        let mut p = CascadePattern::with_rng(g, StdRng::seed_from_u64(1));
        p.set_speed(5.0);
        let mut t = Instant::now();
        let mut saw_full = false;
        for _ in 0..5000 {
            t += Duration::from_secs(2);
            p.update(t);
            if p.frame().count_on() == g.width * g.height {
                saw_full = true;
            }
            if saw_full && p.frame().count_on() < g.width * g.height {
                break;
            }
        }
        assert!(saw_full);
        assert!(!p.filling);
    }

    #[test]
    fn test_waits_for_interval() {
        let mut p = CascadePattern::with_rng(DisplayGeometry::default(), StdRng::seed_from_u64(3));
        let t0 = Instant::now();
        p.update(t0);
        assert_eq!(p.frame().count_on(), 1);
        p.update(t0 + Duration::from_millis(1));
        assert_eq!(p.frame().count_on(), 1);
    }
}
