/*
 *  pages/pattern.rs
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

use log::{debug, info};

use super::patterns::{Pattern, PatternKind};
use super::{Page, PatternControl, TickInputs};
use crate::error::PageError;
use crate::matrix::{DisplayGeometry, DisplayMatrix};

pub const DEFAULT_SPEED: f32 = 2.0;
pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 5.0;
/// slider units that must change before the speed follows
const SLIDER_DEAD_BAND: i32 = 2;

/// Hosts one pattern at a time
pub struct PatternPage {
    geometry: DisplayGeometry,
    kind: PatternKind,
    pattern: Box<dyn Pattern>,
    speed: f32,
    last_slider: Option<i32>,
    blank: DisplayMatrix,
    cleared: bool,
}

impl PatternPage {
    pub fn new(geometry: DisplayGeometry) -> Self {
        let kind = PatternKind::ALL[0];
        let mut pattern = kind.build(geometry);
        pattern.set_speed(DEFAULT_SPEED);
        Self {
            geometry,
            kind,
            pattern,
            speed: DEFAULT_SPEED,
            last_slider: None,
            blank: DisplayMatrix::for_geometry(geometry),
            cleared: false,
        }
    }

    pub fn set_pattern(&mut self, kind: PatternKind) {
        info!("Pattern set to {}", kind);
        self.kind = kind;
        self.pattern = kind.build(self.geometry);
        self.pattern.set_speed(self.speed);
    }

    pub fn next_pattern(&mut self) {
        self.set_pattern(self.kind.next());
    }
}

/// Map slider 0..=100 onto the speed range
pub fn slider_to_speed(value: i32) -> f32 {
    let v = value.clamp(0, 100) as f32;
    MIN_SPEED + (v / 100.0) * (MAX_SPEED - MIN_SPEED)
}

impl Page for PatternPage {
    fn update(&mut self, inputs: &TickInputs) -> Result<(), PageError> {
        self.cleared = false;
        self.pattern.update(inputs.now);
        Ok(())
    }

    fn render(&self) -> &DisplayMatrix {
        if self.cleared { &self.blank } else { self.pattern.frame() }
    }

    fn clear_frame(&mut self) {
        self.cleared = true;
    }

    fn handle_secondary_button(&mut self) {
        self.next_pattern();
    }

    fn supports_slider(&self) -> bool {
        true
    }

    fn handle_slider_change(&mut self, value: i32) {
        if let Some(last) = self.last_slider {
            if (value - last).abs() < SLIDER_DEAD_BAND {
                return;
            }
        }
        self.last_slider = Some(value);
        let speed = slider_to_speed(value);
        debug!("Slider {} -> speed {:.2}", value, speed);
        PatternControl::set_speed(self, speed);
    }

    fn pattern_control(&mut self) -> Option<&mut dyn PatternControl> {
        Some(self)
    }
}

impl PatternControl for PatternPage {
    fn select_pattern(&mut self, id: u8) -> bool {
        match PatternKind::from_id(id) {
            Some(kind) => {
                self.set_pattern(kind);
                true
            }
            None => false,
        }
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
        self.pattern.set_speed(speed);
    }

    fn current_pattern(&self) -> PatternKind {
        self.kind
    }

    fn speed(&self) -> f32 {
        self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_starts_on_clock_at_default_speed() {
        let p = PatternPage::new(DisplayGeometry::default());
        assert_eq!(p.current_pattern(), PatternKind::Clock);
        assert_eq!(PatternControl::speed(&p), DEFAULT_SPEED);
    }

    #[test]
    fn test_select_by_id() {
        let mut p = PatternPage::new(DisplayGeometry::default());
        assert!(p.select_pattern(3));
        assert_eq!(p.current_pattern(), PatternKind::Waves);
        assert!(!p.select_pattern(9));
        assert_eq!(p.current_pattern(), PatternKind::Waves);
    }

    #[test]
    fn test_speed_survives_pattern_switch() {
        let mut p = PatternPage::new(DisplayGeometry::default());
        PatternControl::set_speed(&mut p, 4.0);
        p.handle_secondary_button();
        assert_eq!(p.current_pattern(), PatternKind::Spiral);
        assert_eq!(p.pattern.speed(), 4.0);
    }

    #[test]
    fn test_slider_mapping_with_dead_band() {
        let mut p = PatternPage::new(DisplayGeometry::default());
        p.handle_slider_change(0);
        assert_eq!(PatternControl::speed(&p), MIN_SPEED);
        p.handle_slider_change(1);
        assert_eq!(PatternControl::speed(&p), MIN_SPEED);
        p.handle_slider_change(100);
        assert_eq!(PatternControl::speed(&p), MAX_SPEED);
        p.handle_slider_change(50);
        assert!((PatternControl::speed(&p) - 2.75).abs() < 1e-6);
    }

    #[test]
    fn test_clear_frame_blanks_until_next_update() {
        let mut p = PatternPage::new(DisplayGeometry::default());
        p.update(&TickInputs::at(Instant::now())).unwrap();
        assert!(!p.render().is_blank());
        p.clear_frame();
        assert!(p.render().is_blank());
    }
}
