/*
 *  render.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Paced render loop: events in, frames out
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

use log::{error, info, trace, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::controller::{ControlEvent, Controller};
use crate::display::FlipDisplay;
use crate::pacer::Pacer;
use crate::pages::{CameraFeature, CameraFrame, FaceLandmarks, Gesture, PageMetadata, TickInputs};

/// Camera capture and inference, consulted only for pages that ask
pub trait VisionSource: Send {
    fn capture(&mut self) -> Option<CameraFrame>;
    fn landmarks(&mut self, frame: &CameraFrame) -> Option<FaceLandmarks>;
    fn gestures(&mut self, frame: &CameraFrame) -> Option<Vec<Gesture>>;
}

/// Collect the camera inputs the current page declared, if a source is attached
pub fn gather_inputs(now: Instant, metadata: Option<&PageMetadata>, vision: Option<&mut (dyn VisionSource + '_)>) -> TickInputs {
    let mut inputs = TickInputs::at(now);
    let (Some(metadata), Some(vision)) = (metadata, vision) else {
        return inputs;
    };
    if metadata.camera_features.as_ref().is_none_or(|f| f.is_empty()) {
        return inputs;
    }
    let Some(frame) = vision.capture() else {
        trace!("No camera frame this tick");
        return inputs;
    };
    if metadata.wants(CameraFeature::LandmarkDetection) {
        inputs.landmarks = vision.landmarks(&frame);
    }
    if metadata.wants(CameraFeature::GestureDetection) {
        inputs.gestures = vision.gestures(&frame);
    }
    inputs.camera_frame = Some(frame);
    inputs
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    QueueClosed,
}

pub struct RenderLoop {
    controller: Controller,
    display: FlipDisplay,
    vision: Option<Box<dyn VisionSource>>,
    events: mpsc::UnboundedReceiver<ControlEvent>,
    pacer: Pacer,
    ticks: u64,
}

impl RenderLoop {
    pub fn new(
        controller: Controller,
        display: FlipDisplay,
        events: mpsc::UnboundedReceiver<ControlEvent>,
        fps: u32,
    ) -> Self {
        Self { controller, display, vision: None, events, pacer: Pacer::new(fps), ticks: 0 }
    }

    pub fn with_vision(mut self, vision: Box<dyn VisionSource>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Apply queued events without waiting. `Some` once the loop must end.
    pub fn drain_events(&mut self) -> Option<LoopExit> {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if !self.controller.handle(event, Instant::now()) {
                        return Some(LoopExit::Shutdown);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(LoopExit::QueueClosed),
            }
        }
    }

    /// One frame: update the current page and push its matrix if it changed
    pub async fn tick(&mut self, now: Instant) {
        self.ticks += 1;
        let inputs = {
            let vision = self.vision.as_deref_mut();
            gather_inputs(now, self.controller.pages().current_metadata(), vision)
        };

        let pages = self.controller.pages_mut();
        if !pages.update(&inputs) {
            return;
        }
        if let Some(matrix) = pages.render() {
            match self.display.show(matrix).await {
                Ok(true) => trace!("frame {} sent", self.ticks),
                Ok(false) => {}
                Err(e) => warn!("Display update failed: {}", e),
            }
        }
    }

    /// Run until shutdown is requested or every sender is gone.
    /// Events are applied as they arrive; frames go out at the pacer's rate.
    pub async fn run(&mut self) -> LoopExit {
        info!("Render loop started at {:?} per frame", self.pacer.frame());
        loop {
            if let Some(exit) = self.drain_events() {
                return exit;
            }
            let now = Instant::now();
            if self.pacer.should_tick(now) {
                self.tick(now).await;
            }

            let wait = self.pacer.remaining(Instant::now());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                event = self.events.recv() => match event {
                    Some(event) => {
                        if !self.controller.handle(event, Instant::now()) {
                            return LoopExit::Shutdown;
                        }
                    }
                    None => return LoopExit::QueueClosed,
                }
            }
        }
    }

    /// Best-effort teardown: page cleanup, blank the discs, release the sink
    pub async fn shutdown(&mut self) {
        self.controller.shutdown();
        if let Err(e) = self.display.clear().await {
            error!("Failed to clear display: {}", e);
        }
        if let Err(e) = self.display.close() {
            error!("Failed to close display: {}", e);
        }
        info!("Render loop stopped after {} ticks.", self.ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCamera {
        captures: usize,
    }

    impl VisionSource for FakeCamera {
        fn capture(&mut self) -> Option<CameraFrame> {
            self.captures += 1;
            Some(CameraFrame { width: 4, height: 4, data: vec![0; 16] })
        }
        fn landmarks(&mut self, _: &CameraFrame) -> Option<FaceLandmarks> {
            Some(vec![(0.5, 0.5, 0.0)])
        }
        fn gestures(&mut self, _: &CameraFrame) -> Option<Vec<Gesture>> {
            Some(vec![Gesture { name: "wave".into(), confidence: 0.9 }])
        }
    }

    #[test]
    fn test_no_camera_for_plain_pages() {
        let mut cam = FakeCamera { captures: 0 };
        let meta = PageMetadata::new("plain", "");
        let inputs = gather_inputs(Instant::now(), Some(&meta), Some(&mut cam));
        assert!(inputs.camera_frame.is_none());
        assert_eq!(cam.captures, 0);
    }

    #[test]
    fn test_only_declared_features_are_gathered() {
        let mut cam = FakeCamera { captures: 0 };
        let meta = PageMetadata::new("face", "").with_camera(vec![CameraFeature::LandmarkDetection]);
        let inputs = gather_inputs(Instant::now(), Some(&meta), Some(&mut cam));
        assert!(inputs.camera_frame.is_some());
        assert_eq!(inputs.landmarks.as_ref().map(Vec::len), Some(1));
        assert!(inputs.gestures.is_none());
        assert_eq!(cam.captures, 1);
    }

    #[test]
    fn test_missing_source_yields_empty_inputs() {
        let meta = PageMetadata::new("face", "").with_camera(vec![CameraFeature::GestureDetection]);
        let inputs = gather_inputs(Instant::now(), Some(&meta), None);
        assert!(inputs.camera_frame.is_none() && inputs.gestures.is_none());
    }
}
