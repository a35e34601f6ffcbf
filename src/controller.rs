/*
 *  controller.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Single consumer of every trigger: inputs, remote commands, status ticks
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

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::input::{InputBridge, InputEvent, InputKind, ValueSource};
use crate::pages::PageManager;
use crate::remote::{Outbound, Publisher, RemoteMessage, RemoteRouter};

/// Everything that can change what the display shows
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Input(InputEvent),
    Remote(RemoteMessage),
    StatusTick,
    Shutdown,
}

/// Forward every input kind onto the control queue
pub fn forward_inputs(bridge: &InputBridge, events: mpsc::UnboundedSender<ControlEvent>) {
    for kind in [InputKind::Primary, InputKind::Secondary, InputKind::ValueChange] {
        let events = events.clone();
        bridge.register(kind, move |event| {
            if events.send(ControlEvent::Input(*event)).is_err() {
                debug!("Control queue closed, dropping {:?}", event);
            }
        });
    }
}

/// Owns the page manager, the remote router and the outbound publisher.
/// All mutation of page state happens here, one event at a time.
pub struct Controller {
    pages: PageManager,
    router: RemoteRouter,
    publisher: Box<dyn Publisher>,
}

impl Controller {
    pub fn new(pages: PageManager, router: RemoteRouter, publisher: Box<dyn Publisher>) -> Self {
        Self { pages, router, publisher }
    }

    pub fn pages(&self) -> &PageManager {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut PageManager {
        &mut self.pages
    }

    pub fn router(&self) -> &RemoteRouter {
        &self.router
    }

    /// Apply one event. Returns false once shutdown was requested.
    pub fn handle(&mut self, event: ControlEvent, now: Instant) -> bool {
        match event {
            ControlEvent::Input(input) => self.on_input(input),
            ControlEvent::Remote(message) => {
                let replies = self.router.handle(&message, &mut self.pages, now);
                for reply in &replies {
                    self.publish(reply);
                }
            }
            ControlEvent::StatusTick => {
                let timestamp = Utc::now().timestamp_millis() as f64 / 1000.0;
                let status = self.router.status(&self.pages, now, timestamp);
                self.publish(&status);
            }
            ControlEvent::Shutdown => {
                info!("Controller received shutdown.");
                return false;
            }
        }
        true
    }

    fn on_input(&mut self, input: InputEvent) {
        match input {
            InputEvent::Primary => {
                if let Err(e) = self.pages.next_page() {
                    error!("Primary button: {}", e);
                }
            }
            InputEvent::Secondary => {
                self.pages.handle_secondary_button();
            }
            InputEvent::ValueChange { source: ValueSource::Slider, value } => {
                self.pages.handle_slider_change(value);
            }
            InputEvent::ValueChange { source: ValueSource::Distance, value } => {
                debug!("Distance reading {}", value);
            }
        }
    }

    fn publish(&mut self, message: &Outbound) {
        if let Err(e) = self.publisher.publish(message) {
            warn!("Failed to publish on {}: {}", message.topic, e);
        }
    }

    /// Clean up the active page; the controller is spent afterwards
    pub fn shutdown(&mut self) {
        self.pages.cleanup();
    }
}
