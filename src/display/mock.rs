/*
 *  display/mock.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Recording sink for running without panels
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

use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::FrameSink;
use crate::constants::PANEL_COUNT;
use crate::error::TransportError;
use crate::frame::WireFrame;

/// Shared record of what a [`RecordingSink`] was asked to do
#[derive(Debug, Default)]
pub struct RecordingState {
    /// Every panel frame in arrival order
    pub frames: Vec<WireFrame>,
    pub close_count: usize,
    /// Fail every send while set
    pub simulate_send_failure: bool,
}

impl RecordingState {
    /// Complete display updates, one panel set each
    pub fn updates(&self) -> Vec<[WireFrame; PANEL_COUNT]> {
        self.frames
            .chunks_exact(PANEL_COUNT)
            .filter_map(|c| <[WireFrame; PANEL_COUNT]>::try_from(c).ok())
            .collect()
    }
}

/// Keeps every update in memory; clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn update_count(&self) -> usize {
        self.state().frames.len() / PANEL_COUNT
    }

    pub fn last_update(&self) -> Option<[WireFrame; PANEL_COUNT]> {
        self.state().updates().last().copied()
    }
}

impl FrameSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&mut self, frame: &WireFrame) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.simulate_send_failure {
            return Err(TransportError::Serial("simulated send failure".into()));
        }
        state.frames.push(*frame);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.state().close_count += 1;
        Ok(())
    }
}
