/*
 *  lib.rs
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

//! Control layer for a 28x28 flip-disc display: page navigation,
//! MQTT remote control with a leased lock, wire-frame encoding and
//! local input handling.

pub mod config;
pub mod constants;
pub mod controller;
pub mod display;
pub mod drawing;
pub mod error;
pub mod frame;
pub mod input;
pub mod matrix;
pub mod pacer;
pub mod pages;
pub mod remote;
pub mod render;
pub mod sensors;

#[cfg(feature = "hardware")]
pub mod hardware;
