/*
 *  pacer.rs
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

/// Fixed-rate tick scheduling for the render loop.
pub struct Pacer {
    next_deadline: Instant,
    frame: Duration,
}

impl Pacer {
    pub fn new(target_fps: u32) -> Self {
        Self { next_deadline: Instant::now(), frame: frame_for(target_fps) }
    }

    pub fn frame(&self) -> Duration {
        self.frame
    }

    /// Returns true if a tick is due; if so, it also schedules the next one.
    #[inline]
    pub fn should_tick(&mut self, now: Instant) -> bool {
        if now >= self.next_deadline {
            self.next_deadline = now + self.frame;
            true
        } else {
            false
        }
    }

    /// How long until the next tick is due, zero if overdue
    #[inline]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_deadline.saturating_duration_since(now)
    }
}

fn frame_for(fps: u32) -> Duration {
    Duration::from_micros((1_000_000u32 / fps.max(1)) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration() {
        assert_eq!(Pacer::new(30).frame(), Duration::from_micros(33_333));
        // zero fps clamps to one frame per second
        assert_eq!(Pacer::new(0).frame(), Duration::from_secs(1));
    }

    #[test]
    fn test_should_tick_schedules_next() {
        let mut p = Pacer::new(10);
        let t0 = Instant::now();
        assert!(p.should_tick(t0));
        assert!(!p.should_tick(t0 + Duration::from_millis(50)));
        assert_eq!(p.remaining(t0 + Duration::from_millis(40)), Duration::from_millis(60));
        assert!(p.should_tick(t0 + Duration::from_millis(100)));
    }
}
