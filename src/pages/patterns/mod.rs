/*
 *  pages/patterns/mod.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Generative patterns hosted by the pattern page
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

use std::fmt;
use std::time::{Duration, Instant};

use crate::matrix::{DisplayGeometry, DisplayMatrix};

mod blob;
mod bounce;
mod cascade;
mod clock;
mod spiral;
mod waves;

pub use blob::BlobPattern;
pub use bounce::BouncePattern;
pub use cascade::CascadePattern;
pub use clock::ClockPattern;
pub use spiral::SpiralPattern;
pub use waves::WavesPattern;

/// One animation. Patterns pace themselves off the `now` they are given.
pub trait Pattern: Send {
    fn update(&mut self, now: Instant);
    fn frame(&self) -> &DisplayMatrix;
    fn set_speed(&mut self, speed: f32);
    fn speed(&self) -> f32;
}

/// Patterns in cycling order; the discriminant is the remote id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Clock = 1,
    Spiral = 2,
    Waves = 3,
    Blob = 4,
    Cascade = 5,
    Bounce = 6,
}

impl PatternKind {
    pub const ALL: [PatternKind; 6] = [
        PatternKind::Clock,
        PatternKind::Spiral,
        PatternKind::Waves,
        PatternKind::Blob,
        PatternKind::Cascade,
        PatternKind::Bounce,
    ];

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.id() == id)
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn key(self) -> &'static str {
        match self {
            PatternKind::Clock => "clock",
            PatternKind::Spiral => "spiral",
            PatternKind::Waves => "waves",
            PatternKind::Blob => "blob",
            PatternKind::Cascade => "cascade",
            PatternKind::Bounce => "bounce",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn build(self, geometry: DisplayGeometry) -> Box<dyn Pattern> {
        match self {
            PatternKind::Clock => Box::new(ClockPattern::new(geometry)),
            PatternKind::Spiral => Box::new(SpiralPattern::new(geometry)),
            PatternKind::Waves => Box::new(WavesPattern::new(geometry)),
            PatternKind::Blob => Box::new(BlobPattern::new(geometry)),
            PatternKind::Cascade => Box::new(CascadePattern::new(geometry)),
            PatternKind::Bounce => Box::new(BouncePattern::new(geometry)),
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Time gate shared by the patterns: fires at most once per interval.
#[derive(Debug, Default)]
pub(crate) struct Cadence {
    last: Option<Instant>,
}

impl Cadence {
    pub(crate) fn due(&mut self, now: Instant, interval: Duration) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// `base / speed` seconds, guarding against a zero or negative speed.
/// Rounded to whole microseconds so f32 noise cannot push a boundary late.
pub(crate) fn interval_for(base_secs: f32, speed: f32) -> Duration {
    let secs = f64::from(base_secs) / f64::from(speed.max(0.01));
    Duration::from_micros((secs * 1_000_000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_ids_and_order() {
        let ids: Vec<u8> = PatternKind::ALL.iter().map(|k| k.id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(PatternKind::from_id(4), Some(PatternKind::Blob));
        assert_eq!(PatternKind::from_id(0), None);
        assert_eq!(PatternKind::from_id(7), None);
        assert_eq!(PatternKind::Bounce.next(), PatternKind::Clock);
    }

    #[test]
    fn test_cadence_gates_by_interval() {
        let t0 = Instant::now();
        let mut c = Cadence::default();
        let iv = Duration::from_millis(100);
        assert!(c.due(t0, iv));
        assert!(!c.due(t0 + Duration::from_millis(50), iv));
        assert!(c.due(t0 + Duration::from_millis(100), iv));
    }

    #[test]
    fn test_interval_lands_on_exact_boundary() {
        assert_eq!(interval_for(0.2, 2.0), Duration::from_millis(100));
        assert_eq!(interval_for(1.0, 0.0), Duration::from_secs(100));

        let t0 = Instant::now();
        let mut c = Cadence::default();
        let iv = interval_for(0.2, 2.0);
        assert!(c.due(t0, iv));
        assert!(!c.due(t0 + Duration::from_millis(99), iv));
        assert!(c.due(t0 + Duration::from_millis(100), iv));
        assert!(c.due(t0 + Duration::from_millis(200), iv));
    }

    #[test]
    fn test_every_pattern_draws_something_eventually() {
        let g = DisplayGeometry::default();
        let t0 = Instant::now();
        for kind in PatternKind::ALL {
            let mut p = kind.build(g);
            p.set_speed(2.0);
            for step in 0..40u64 {
                p.update(t0 + Duration::from_millis(step * 250));
            }
            assert_eq!(p.frame().geometry(), g);
            assert!(!p.frame().is_blank(), "{} stayed blank", kind);
            assert_eq!(p.speed(), 2.0);
        }
    }
}
