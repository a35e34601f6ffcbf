/*
 *  constants.rs
 *
 *  flipframe - flip-disc frame controller
 *	(c) 2025-26 flipframe contributors
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

// display geometry: 4 panels side by side, each 7 discs wide and 28 rows tall
pub const PANEL_COUNT: usize = 4;
pub const PANEL_DISC_WIDTH: usize = 7;
pub const PANEL_ROW_COUNT: usize = 28;

pub const DISPLAY_WIDTH: usize = PANEL_COUNT * PANEL_DISC_WIDTH;
pub const DISPLAY_HEIGHT: usize = PANEL_ROW_COUNT;

// panel addresses on the bus, left to right
pub const PANEL_IDS: [u8; PANEL_COUNT] = [1, 2, 4, 8];

// wire frame layout
pub const FRAME_HEADER: u8 = 0x80;
pub const FRAME_COMMAND: u8 = 0x83;
pub const FRAME_TAIL: u8 = 0x8F;
pub const FRAME_PAYLOAD_START: usize = 3;
pub const FRAME_LENGTH: usize = FRAME_PAYLOAD_START + PANEL_ROW_COUNT + 1;

// serial defaults
pub const SERIAL_PORT_NAME: &str = "/dev/ttyAMA0";
pub const SERIAL_BAUDRATE: u32 = 19_200;
pub const INTER_FRAME_DELAY_MS: u64 = 10;

// render loop
pub const TARGET_FPS: u32 = 30;

// navigation
pub const MAX_HISTORY: usize = 10;

// remote control lock lease
pub const LOCK_TIMEOUT_SECS: u64 = 5 * 60;
pub const STATUS_PERIOD_MS: u64 = 1_000;

// raspberry pi pinout (BCM)
pub const PIN_EN_485: u8 = 4;
pub const PIN_BUTTON_YELLOW: u8 = 12;
pub const PIN_BUTTON_RED: u8 = 16;
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

// ADS1015 slider calibration, 16-bit scaled raw counts
pub const ADS_SLIDER_PCT_0_RAW: i32 = 26_380;
pub const ADS_SLIDER_PCT_100_RAW: i32 = 13_500;

// slider and distance sampling
pub const INPUT_POLL_MS: u64 = 100;

// sketchpad / token service
pub const TOKEN_LENGTH: usize = 6;
pub const TOKEN_TTL_SECS: u64 = 3_600;
pub const DRAWING_TIMEOUT_SECS: u64 = 300;
pub const SKETCHPAD_URL: &str = "https://flipframe.local/draw";

// page ids the remote router targets
pub const PATTERN_PAGE_ID: &str = "pattern";
pub const SKETCHPAD_PAGE_ID: &str = "sketchpad";
pub const EMOJI_PAGE_ID: &str = "emoji";
