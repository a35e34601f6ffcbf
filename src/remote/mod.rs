/*
 *  remote/mod.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Remote control: topics, wire messages and the publish seam
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

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

pub mod lock;
pub mod mqtt;
pub mod router;
pub mod status;

pub use lock::LockArbiter;
pub use router::RemoteRouter;
pub use status::StatusTicker;

pub const PATTERN_TOPIC: &str = "flip/pattern";
pub const DRAW_TOPIC: &str = "flip/draw";
pub const CAMERA_TOPIC: &str = "flip/camera";
pub const STATUS_TOPIC: &str = "flip/manager/status";
pub const LOCK_REQUEST_TOPIC: &str = "flip/lock/request";
pub const LOCK_RESPONSE_TOPIC: &str = "flip/lock/response";

/// Topics the controller listens on
pub const COMMAND_TOPICS: [&str; 4] = [PATTERN_TOPIC, DRAW_TOPIC, CAMERA_TOPIC, LOCK_REQUEST_TOPIC];

pub const DEFAULT_PATTERN_SPEED: f64 = 2.0;

/// An inbound message, as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl RemoteMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self { topic: topic.into(), payload: payload.into() }
    }
}

/// A message to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LockRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, rename = "clientId")]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockResponse {
    /// null when the request carried no client id
    pub client_id: Option<String>,
    pub success: bool,
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
    /// whole seconds, negative once a lease has lapsed unnoticed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternCommand {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default = "default_speed")]
    pub speed: f64,
}

fn default_enable() -> bool {
    true
}

fn default_speed() -> f64 {
    DEFAULT_PATTERN_SPEED
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: Presence,
    /// unix seconds
    pub timestamp: f64,
    pub current_page: Option<String>,
    pub locked: bool,
    #[serde(default, rename = "lockedBy", skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
    #[serde(default, rename = "lockTimeRemaining", skip_serializing_if = "Option::is_none")]
    pub lock_time_remaining: Option<i64>,
}

/// Last will and clean shutdown announcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceMessage {
    pub status: Presence,
    pub timestamp: i64,
}

impl PresenceMessage {
    pub fn offline(timestamp: i64) -> Self {
        Self { status: Presence::Offline, timestamp }
    }

    pub fn to_outbound(&self) -> Outbound {
        Outbound {
            topic: STATUS_TOPIC.to_string(),
            payload: serde_json::to_string(self).unwrap_or_else(|_| r#"{"status":"offline"}"#.to_string()),
            retain: true,
        }
    }
}

/// Where outbound messages go. Implementations must not block.
pub trait Publisher: Send {
    fn publish(&mut self, message: &Outbound) -> Result<(), TransportError>;
}

/// Drops everything; used when running without a broker
#[derive(Debug, Default)]
pub struct NullPublisher;

impl Publisher for NullPublisher {
    fn publish(&mut self, message: &Outbound) -> Result<(), TransportError> {
        log::trace!("not published ({}): {}", message.topic, message.payload);
        Ok(())
    }
}

/// Keeps every published message; clones share the same log
#[derive(Debug, Default, Clone)]
pub struct MemoryPublisher {
    sent: Arc<Mutex<Vec<Outbound>>>,
}

impl MemoryPublisher {
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn on_topic(&self, topic: &str) -> Vec<Outbound> {
        self.sent().into_iter().filter(|m| m.topic == topic).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut v) = self.sent.lock() {
            v.clear();
        }
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&mut self, message: &Outbound) -> Result<(), TransportError> {
        self.sent
            .lock()
            .map_err(|_| TransportError::Mqtt("publisher log poisoned".into()))?
            .push(message.clone());
        Ok(())
    }
}
