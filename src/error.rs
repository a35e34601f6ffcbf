/*
 *  error.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Error types shared across the control layer
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

use thiserror::Error;

/// Frame encoder rejected its input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Matrix does not match the panel layout
    #[error("matrix is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: usize,
        expected_height: usize,
        actual_width: usize,
        actual_height: usize,
    },
}

/// Failure raised by a page during its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page construction failed: {0}")]
    Construction(String),

    #[error("page initialization failed: {0}")]
    Initialization(String),

    #[error("page update failed: {0}")]
    Update(String),

    #[error("page cleanup failed: {0}")]
    Cleanup(String),
}

/// Page manager navigation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("page '{0}' is not registered")]
    UnknownPage(String),

    #[error("no pages registered")]
    EmptyRegistry,

    #[error("navigation history is empty")]
    EmptyHistory,

    #[error("page '{id}' failed to start: {source}")]
    PageFailed {
        id: String,
        #[source]
        source: PageError,
    },
}

/// Drawing payload rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("row key '{0}' is not a row index")]
    InvalidRowKey(String),

    #[error("row {row} out of range (height {height})")]
    RowOutOfRange { row: usize, height: usize },

    #[error("row {row} has {actual} discs, expected {expected}")]
    RowLength { row: usize, expected: usize, actual: usize },

    #[error("row {row} holds a value other than 0 or 1")]
    InvalidDiscValue { row: usize },

    #[error("row {0} is not an array of discs")]
    MalformedRow(String),

    #[error("unknown or expired token '{0}'")]
    UnknownToken(String),
}

/// Inbound remote command could not be used
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing client id")]
    MissingClientId,

    #[error("pattern id {0} is outside 1..=6")]
    UnknownPattern(i64),

    #[error("invalid drawing: {0}")]
    Draw(#[from] DrawError),
}

/// Device or broker transport failure
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(String),

    #[error("GPIO error: {0}")]
    Gpio(String),

    #[error("MQTT client error: {0}")]
    Mqtt(String),

    #[error("frame encoding failed: {0}")]
    Frame(#[from] FrameError),
}

/// Sensor read failure
#[derive(Debug, Error)]
pub enum InputError {
    #[error("I2C error: {0}")]
    I2c(String),

    #[error("GPIO error: {0}")]
    Gpio(String),

    #[error("sensor not ready: {0}")]
    NotReady(String),
}
