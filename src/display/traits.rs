/*
 *  display/traits.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Frame sink abstraction
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

use crate::error::TransportError;
use crate::frame::WireFrame;

/// Destination for encoded panel frames.
///
/// A display update arrives as one `send` per panel, left panel first.
/// Pacing between panels belongs to the caller. How the bytes reach the
/// panels (RS-485 UART, a file, a test recorder) is up to the implementation.
pub trait FrameSink: Send {
    /// Short name for logs
    fn name(&self) -> &str;

    fn send(&mut self, frame: &WireFrame) -> Result<(), TransportError>;

    /// Release the underlying device
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
