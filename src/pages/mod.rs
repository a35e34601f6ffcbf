/*
 *  pages/mod.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Page contract, registry and the built-in pages
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

use std::sync::Arc;
use std::time::Instant;

use crate::config::SketchpadConfig;
use crate::constants::{EMOJI_PAGE_ID, PATTERN_PAGE_ID, SKETCHPAD_PAGE_ID};
use crate::drawing::{DrawPayload, DrawingStore};
use crate::error::{DrawError, PageError};
use crate::matrix::{DisplayGeometry, DisplayMatrix};

pub mod emoji;
pub mod manager;
pub mod pattern;
pub mod patterns;
pub mod qr;
pub mod sketchpad;

pub use emoji::EmojiPage;
pub use manager::PageManager;
pub use pattern::PatternPage;
pub use patterns::PatternKind;
pub use sketchpad::SketchpadPage;

/// Camera-derived inputs a page may ask the render loop for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFeature {
    LandmarkDetection,
    GestureDetection,
}

/// Static description of a registered page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub name: String,
    pub description: String,
    /// `None` means the page never looks at the camera
    pub camera_features: Option<Vec<CameraFeature>>,
}

impl PageMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            camera_features: None,
        }
    }

    pub fn with_camera(mut self, features: Vec<CameraFeature>) -> Self {
        self.camera_features = Some(features);
        self
    }

    pub fn wants(&self, feature: CameraFeature) -> bool {
        self.camera_features
            .as_ref()
            .is_some_and(|f| f.contains(&feature))
    }
}

/// One captured camera image, opaque to the control layer
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Normalised face landmark positions
pub type FaceLandmarks = Vec<(f32, f32, f32)>;

#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub name: String,
    pub confidence: f32,
}

/// Everything a page sees on one render tick
#[derive(Debug, Clone)]
pub struct TickInputs {
    pub now: Instant,
    pub camera_frame: Option<CameraFrame>,
    pub landmarks: Option<FaceLandmarks>,
    pub gestures: Option<Vec<Gesture>>,
}

impl TickInputs {
    pub fn at(now: Instant) -> Self {
        Self { now, camera_frame: None, landmarks: None, gestures: None }
    }
}

/// Remote pattern selection, offered by pages that host patterns
pub trait PatternControl {
    /// Select by remote id 1..=6; false when the id is unknown
    fn select_pattern(&mut self, id: u8) -> bool;
    fn set_speed(&mut self, speed: f32);
    fn current_pattern(&self) -> PatternKind;
    fn speed(&self) -> f32;
}

/// Accepts a whole drawing pushed from outside
pub trait DrawingTarget {
    fn set_drawing(&mut self, drawing: &DrawPayload, now: Instant) -> Result<(), DrawError>;
}

/// A navigable visual unit.
///
/// Optional behaviour is discovered through the capability queries
/// (`supports_slider`, `pattern_control`, `drawing_target`) rather than
/// by calling hooks and seeing what happens.
pub trait Page: Send {
    fn initialize(&mut self) -> Result<(), PageError> {
        Ok(())
    }

    /// Advance page state for this tick
    fn update(&mut self, inputs: &TickInputs) -> Result<(), PageError>;

    /// The matrix to show right now
    fn render(&self) -> &DisplayMatrix;

    /// Blank the page's own frame buffer
    fn clear_frame(&mut self);

    fn cleanup(&mut self) -> Result<(), PageError> {
        Ok(())
    }

    fn handle_secondary_button(&mut self) {
        log::debug!("secondary button ignored by this page");
    }

    fn supports_slider(&self) -> bool {
        false
    }

    /// Only called when `supports_slider` is true
    fn handle_slider_change(&mut self, _value: i32) {}

    fn pattern_control(&mut self) -> Option<&mut dyn PatternControl> {
        None
    }

    fn drawing_target(&mut self) -> Option<&mut dyn DrawingTarget> {
        None
    }
}

/// Builds a fresh page bound to the display geometry
pub type PageConstructor =
    Box<dyn Fn(DisplayGeometry) -> Result<Box<dyn Page>, PageError> + Send + Sync>;

/// Register the pages that ship with flipframe, in navigation order.
pub fn register_default_pages(
    manager: &mut PageManager,
    sketchpad: &SketchpadConfig,
    drawings: Arc<DrawingStore>,
) {
    manager.register(
        PATTERN_PAGE_ID,
        Box::new(|geometry| Ok(Box::new(PatternPage::new(geometry)) as Box<dyn Page>)),
        PageMetadata::new("Patterns", "Clock and generative patterns"),
    );

    let settings = sketchpad.clone();
    manager.register(
        SKETCHPAD_PAGE_ID,
        Box::new(move |geometry| {
            let page = SketchpadPage::new(geometry, settings.clone(), Arc::clone(&drawings))?;
            Ok(Box::new(page) as Box<dyn Page>)
        }),
        PageMetadata::new("Sketchpad", "Shows drawings sent from the web or the draw topic"),
    );

    manager.register(
        EMOJI_PAGE_ID,
        Box::new(|geometry| Ok(Box::new(EmojiPage::new(geometry)) as Box<dyn Page>)),
        PageMetadata::new("Emoji Face", "Face reactions based on camera input")
            .with_camera(vec![CameraFeature::LandmarkDetection, CameraFeature::GestureDetection]),
    );
}
