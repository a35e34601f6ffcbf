/*
 *  pages/patterns/blob.rs
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

use std::collections::HashSet;
use std::f32::consts::FRAC_PI_2;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{interval_for, Cadence, Pattern};
use crate::matrix::{DisplayGeometry, DisplayMatrix};

const START_RADIUS: f32 = 2.0;
const MAX_RADIUS: f32 = 5.0;
const FOOD_DOTS: usize = 5;

/// A shaded blob that drifts towards food dots and grows as it eats
pub struct BlobPattern {
    frame: DisplayMatrix,
    speed: f32,
    x: f32,
    y: f32,
    radius: f32,
    growth: f32,
    food: HashSet<(i32, i32)>,
    rng: StdRng,
    cadence: Cadence,
}

impl BlobPattern {
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self::with_rng(geometry, StdRng::from_os_rng())
    }

    pub fn with_rng(geometry: DisplayGeometry, rng: StdRng) -> Self {
        let mut blob = Self {
            frame: DisplayMatrix::for_geometry(geometry),
            speed: 1.0,
            x: geometry.width as f32 / 2.0,
            y: geometry.height as f32 / 2.0,
            radius: START_RADIUS,
            growth: 0.0,
            food: HashSet::new(),
            rng,
            cadence: Cadence::default(),
        };
        for _ in 0..FOOD_DOTS {
            blob.add_food();
        }
        blob
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    fn add_food(&mut self) {
        let (w, h) = (self.frame.width() as i32, self.frame.height() as i32);
        if self.food.len() as i32 >= w * h {
            return;
        }
        loop {
            let pos = (self.rng.random_range(0..w), self.rng.random_range(0..h));
            if self.food.insert(pos) {
                break;
            }
        }
    }

    fn nearest_food(&self) -> Option<((i32, i32), f32)> {
        self.food
            .iter()
            .map(|&(fx, fy)| {
                let (dx, dy) = (fx as f32 - self.x, fy as f32 - self.y);
                ((fx, fy), (dx * dx + dy * dy).sqrt())
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn step(&mut self) {
        let Some(((fx, fy), dist)) = self.nearest_food() else {
            return;
        };

        let move_speed = 0.15 * (1.0 - (self.radius / MAX_RADIUS) * 0.5);
        let angle = (fy as f32 - self.y).atan2(fx as f32 - self.x);
        self.x += angle.cos() * move_speed;
        self.y += angle.sin() * move_speed;

        if dist < self.radius {
            self.food.remove(&(fx, fy));
            self.growth += 0.1;
            if self.growth >= 1.0 {
                self.radius = (self.radius + 0.2).min(MAX_RADIUS);
                self.growth = 0.0;
            }
            self.add_food();
        }
    }

    fn draw(&mut self) {
        self.frame.clear();
        for y in 0..self.frame.height() as i32 {
            for x in 0..self.frame.width() as i32 {
                if self.food.contains(&(x, y)) {
                    self.frame.set(x, y, true);
                    continue;
                }
                let (dx, dy) = (x as f32 - self.x, y as f32 - self.y);
                let d = (dx * dx + dy * dy).sqrt();
                if d < self.radius {
                    let shade = 0.7 + (d / self.radius * FRAC_PI_2).cos() * 0.3;
                    if self.rng.random::<f32>() < shade {
                        self.frame.set(x, y, true);
                    }
                }
            }
        }
    }
}

impl Pattern for BlobPattern {
    fn update(&mut self, now: Instant) {
        if !self.cadence.due(now, interval_for(0.05, self.speed)) {
            return;
        }
        self.step();
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
    fn test_food_is_replenished_and_blob_grows() {
        let mut p = BlobPattern::with_rng(DisplayGeometry::default(), StdRng::seed_from_u64(42));
        let t0 = Instant::now();
        for i in 0..20_000u64 {
            p.update(t0 + Duration::from_millis(i * 50));
            assert_eq!(p.food.len(), FOOD_DOTS);
        }
        assert!(p.radius() > START_RADIUS);
        assert!(p.radius() <= MAX_RADIUS);
    }
}
