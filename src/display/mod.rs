/*
 *  display/mod.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Display output: encodes matrices and pushes them to a frame sink
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

use std::path::Path;
use std::time::Duration;

use log::info;

pub mod mock;
pub mod sinks;
pub mod traits;

pub use mock::RecordingSink;
pub use sinks::{open_file_sink, LogSink, WriterSink};
pub use traits::FrameSink;

use crate::config::{DisplayConfig, SinkKind};
use crate::error::TransportError;
use crate::constants::PANEL_COUNT;
use crate::frame::{encode, WireFrame};
use crate::matrix::DisplayMatrix;

/// The physical 28x28 flip-disc array.
///
/// Only matrices that differ from the last one sent reach the sink;
/// every flip is audible and wears the discs. Panels are written one
/// at a time with an awaited pause in between so the controllers on
/// the shared bus can latch.
pub struct FlipDisplay {
    sink: Box<dyn FrameSink>,
    flip: bool,
    inter_frame_delay: Duration,
    shown: Option<DisplayMatrix>,
}

impl FlipDisplay {
    pub fn new(sink: Box<dyn FrameSink>, flip: bool) -> Self {
        info!("Display output via {} sink{}", sink.name(), if flip { " (rotated 180)" } else { "" });
        Self { sink, flip, inter_frame_delay: Duration::ZERO, shown: None }
    }

    pub fn with_inter_frame_delay(mut self, delay: Duration) -> Self {
        self.inter_frame_delay = delay;
        self
    }

    /// Push `matrix` if it changed. Returns whether anything was sent.
    pub async fn show(&mut self, matrix: &DisplayMatrix) -> Result<bool, TransportError> {
        if self.shown.as_ref() == Some(matrix) {
            return Ok(false);
        }
        let frames = if self.flip { encode(&matrix.flipped())? } else { encode(matrix)? };
        self.transmit(&frames).await?;
        self.shown = Some(matrix.clone());
        Ok(true)
    }

    /// Turn every disc to its off side, unconditionally
    pub async fn clear(&mut self) -> Result<(), TransportError> {
        let blank = match &self.shown {
            Some(m) => DisplayMatrix::new(m.width(), m.height()),
            None => DisplayMatrix::default(),
        };
        self.transmit(&encode(&blank)?).await?;
        self.shown = Some(blank);
        Ok(())
    }

    /// Forget what was last sent so the next `show` always transmits
    pub fn invalidate(&mut self) {
        self.shown = None;
    }

    pub fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close()
    }

    async fn transmit(&mut self, frames: &[WireFrame; PANEL_COUNT]) -> Result<(), TransportError> {
        for (i, frame) in frames.iter().enumerate() {
            if i > 0 && !self.inter_frame_delay.is_zero() {
                tokio::time::sleep(self.inter_frame_delay).await;
            }
            self.sink.send(frame)?;
        }
        Ok(())
    }
}

/// Build the sink selected in the configuration
pub fn open_sink(cfg: &DisplayConfig) -> Result<Box<dyn FrameSink>, TransportError> {
    match cfg.sink {
        SinkKind::Log => Ok(Box::new(LogSink::new())),
        SinkKind::File => Ok(Box::new(open_file_sink(Path::new(&cfg.serial_port))?)),
        #[cfg(feature = "hardware")]
        SinkKind::Uart => Ok(Box::new(crate::hardware::open_uart(cfg)?)),
        #[cfg(not(feature = "hardware"))]
        SinkKind::Uart => {
            log::warn!("Built without hardware support, writing to {} as a plain file", cfg.serial_port);
            Ok(Box::new(open_file_sink(Path::new(&cfg.serial_port))?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_show_sends_only_changes() {
        let sink = RecordingSink::new();
        let mut display = FlipDisplay::new(Box::new(sink.clone()), false);

        let mut m = DisplayMatrix::default();
        assert!(display.show(&m).await.unwrap());
        assert!(!display.show(&m).await.unwrap());

        m.set(3, 3, true);
        assert!(display.show(&m).await.unwrap());
        assert_eq!(sink.update_count(), 2);

        display.invalidate();
        assert!(display.show(&m).await.unwrap());
        assert_eq!(sink.update_count(), 3);
    }

    #[tokio::test]
    async fn test_flip_rotates_output() {
        let sink = RecordingSink::new();
        let mut display = FlipDisplay::new(Box::new(sink.clone()), true);

        let mut m = DisplayMatrix::default();
        m.set(0, 0, true);
        display.show(&m).await.unwrap();

        let frames = sink.last_update().unwrap();
        // top-left disc lands bottom-right: last panel, last row, lowest bit
        assert_eq!(frames[3].payload()[27], 0x01);
        assert!(frames[0].payload().iter().all(|&b| b == 0));
    }

    #[tokio::test]
    async fn test_failed_send_is_retried_next_show() {
        let sink = RecordingSink::new();
        let mut display = FlipDisplay::new(Box::new(sink.clone()), false);
        let m = DisplayMatrix::default();

        sink.state().simulate_send_failure = true;
        assert!(display.show(&m).await.is_err());
        sink.state().simulate_send_failure = false;
        assert!(display.show(&m).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_and_close() {
        let sink = RecordingSink::new();
        let mut display = FlipDisplay::new(Box::new(sink.clone()), false);
        let mut m = DisplayMatrix::default();
        m.set(1, 1, true);
        display.show(&m).await.unwrap();

        display.clear().await.unwrap();
        let frames = sink.last_update().unwrap();
        assert!(frames.iter().all(|f| f.payload().iter().all(|&b| b == 0)));
        // already blank, nothing new
        assert!(!display.show(&DisplayMatrix::default()).await.unwrap());

        display.close().unwrap();
        assert_eq!(sink.state().close_count, 1);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_an_error() {
        let mut display = FlipDisplay::new(Box::new(LogSink::new()), false);
        assert!(matches!(display.show(&DisplayMatrix::new(10, 10)).await, Err(TransportError::Frame(_))));
    }

    #[tokio::test]
    async fn test_panels_are_paced_without_blocking() {
        let sink = RecordingSink::new();
        let mut display =
            FlipDisplay::new(Box::new(sink.clone()), false).with_inter_frame_delay(Duration::from_millis(20));

        // another task keeps running while the display waits between panels
        let ticker = tokio::spawn(async {
            let mut beats = 0u32;
            for _ in 0..5 {
                tokio::time::sleep(Duration::from_millis(5)).await;
                beats += 1;
            }
            beats
        });

        let started = std::time::Instant::now();
        assert!(display.show(&DisplayMatrix::default()).await.unwrap());
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert_eq!(sink.state().frames.len(), 4);
        assert_eq!(sink.update_count(), 1);
        assert!(ticker.is_finished());
        assert_eq!(ticker.await.unwrap(), 5);
    }
}
