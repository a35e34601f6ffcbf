/*
 *  remote/router.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Remote command dispatch into the page manager
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

use log::{debug, error, info, warn};
use serde_json::Value;

use super::{
    LockArbiter, LockRequest, LockResponse, Outbound, PatternCommand, Presence, RemoteMessage,
    StatusMessage, CAMERA_TOPIC, DRAW_TOPIC, LOCK_REQUEST_TOPIC, LOCK_RESPONSE_TOPIC,
    PATTERN_TOPIC, STATUS_TOPIC,
};
use crate::constants::{PATTERN_PAGE_ID, SKETCHPAD_PAGE_ID};
use crate::drawing::{DrawPayload, DrawingStore};
use crate::error::CommandError;
use crate::pages::{PageManager, PatternKind};

/// Routes inbound remote messages and owns the control lock.
#[derive(Debug, Default)]
pub struct RemoteRouter {
    lock: LockArbiter,
    drawings: Option<Arc<DrawingStore>>,
}

impl RemoteRouter {
    pub fn new(lock: LockArbiter) -> Self {
        Self { lock, drawings: None }
    }

    /// Accept token-addressed drawings on the draw topic and hand them to `store`
    pub fn with_drawings(mut self, store: Arc<DrawingStore>) -> Self {
        self.drawings = Some(store);
        self
    }

    pub fn lock(&self) -> &LockArbiter {
        &self.lock
    }

    /// Handle one message. Returns what should be published in response.
    pub fn handle(&mut self, message: &RemoteMessage, pages: &mut PageManager, now: Instant) -> Vec<Outbound> {
        let mut out = Vec::new();
        let result = match message.topic.as_str() {
            LOCK_REQUEST_TOPIC => self.on_lock_request(&message.payload, now, &mut out),
            PATTERN_TOPIC => self.on_pattern(&message.payload, pages, now, &mut out),
            DRAW_TOPIC => self.on_draw(&message.payload, pages, now, &mut out),
            CAMERA_TOPIC => {
                debug!("Camera topic message ignored ({} bytes)", message.payload.len());
                Ok(())
            }
            other => {
                debug!("Message on unexpected topic {}", other);
                Ok(())
            }
        };
        if let Err(e) = result {
            error!("Error processing message on {}: {}", message.topic, e);
        }
        out
    }

    /// The periodic status snapshot, published retained
    pub fn status(&self, pages: &PageManager, now: Instant, timestamp: f64) -> Outbound {
        let status = StatusMessage {
            status: Presence::Online,
            timestamp,
            current_page: pages.current_page_id().map(str::to_string),
            locked: self.lock.is_locked(),
            locked_by: self.lock.holder().map(str::to_string),
            lock_time_remaining: self.lock.time_remaining(now),
        };
        Outbound {
            topic: STATUS_TOPIC.to_string(),
            payload: serde_json::to_string(&status).unwrap_or_default(),
            retain: true,
        }
    }

    fn on_lock_request(&mut self, payload: &[u8], now: Instant, out: &mut Vec<Outbound>) -> Result<(), CommandError> {
        let request: LockRequest = serde_json::from_slice(payload)?;
        if let Some(response) = self.lock.handle_request(&request, now) {
            debug!("Publishing lock response: {:?}", response);
            out.push(lock_response(&response));
        }
        Ok(())
    }

    /// Lazy expiry plus holder check. A lapsed lease is announced to the
    /// client that held it.
    fn authorized(&mut self, client_id: Option<&str>, what: &str, now: Instant, out: &mut Vec<Outbound>) -> bool {
        let (granted, expired) = self.lock.authorize(client_id, now);
        if let Some(former) = expired {
            let notice = self.lock.respond(Some(&former), false, Some("Lock timed out".into()), now);
            out.push(lock_response(&notice));
        }
        if !granted {
            warn!("{} command rejected: unauthorized client {}", what, client_id.unwrap_or("<none>"));
        }
        granted
    }

    fn on_pattern(
        &mut self,
        payload: &[u8],
        pages: &mut PageManager,
        now: Instant,
        out: &mut Vec<Outbound>,
    ) -> Result<(), CommandError> {
        let command: PatternCommand = serde_json::from_slice(payload)?;
        if !self.authorized(command.client_id.as_deref(), "Pattern", now, out) {
            return Ok(());
        }

        let selection = match command.id {
            Some(id) if command.enable => id,
            _ => {
                if pages.current_page_id() == Some(PATTERN_PAGE_ID) {
                    pages.set_enabled(false);
                }
                return Ok(());
            }
        };

        let kind = u8::try_from(selection)
            .ok()
            .and_then(PatternKind::from_id)
            .ok_or(CommandError::UnknownPattern(selection))?;

        if pages.current_page_id() != Some(PATTERN_PAGE_ID) {
            info!("Switching to pattern page from {}", pages.current_page_id().unwrap_or("<none>"));
            if let Err(e) = pages.navigate_to(PATTERN_PAGE_ID) {
                warn!("Pattern page not available: {}", e);
                return Ok(());
            }
        }

        let Some(control) = pages.current_page_mut().and_then(|p| p.pattern_control()) else {
            warn!("Current page doesn't support pattern setting");
            return Ok(());
        };
        control.select_pattern(kind.id());
        control.set_speed(command.speed as f32);
        pages.set_enabled(true);
        Ok(())
    }

    fn on_draw(
        &mut self,
        payload: &[u8],
        pages: &mut PageManager,
        now: Instant,
        out: &mut Vec<Outbound>,
    ) -> Result<(), CommandError> {
        let Value::Object(map) = serde_json::from_slice::<Value>(payload)? else {
            return Err(CommandError::NotAnObject);
        };

        // a sketchpad token is its own credential, no lease involved
        if let Some(token) = map.get("token").and_then(Value::as_str) {
            let Some(store) = self.drawings.as_ref() else {
                warn!("Token drawing for {} ignored, no drawing store attached", token);
                return Ok(());
            };
            let revision = store.receive_drawing(token, &map, now)?;
            info!("Drawing revision {} received for token {}", revision, token);
            return Ok(());
        }

        let client_id = map.get("clientId").and_then(Value::as_str);
        if !self.authorized(client_id, "Draw", now, out) {
            return Ok(());
        }

        let drawing = DrawPayload::from_json_map(&map, pages.geometry())?;

        if pages.current_page_id() != Some(SKETCHPAD_PAGE_ID) {
            info!("Switching to sketchpad page from {}", pages.current_page_id().unwrap_or("<none>"));
            if let Err(e) = pages.navigate_to(SKETCHPAD_PAGE_ID) {
                warn!("Sketchpad page not available: {}", e);
                return Ok(());
            }
        }

        match pages.current_page_mut().and_then(|p| p.drawing_target()) {
            Some(target) => target.set_drawing(&drawing, now)?,
            None => warn!("Current page doesn't accept drawings"),
        }
        Ok(())
    }
}

fn lock_response(response: &LockResponse) -> Outbound {
    Outbound {
        topic: LOCK_RESPONSE_TOPIC.to_string(),
        payload: serde_json::to_string(response).unwrap_or_default(),
        retain: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DisplayGeometry;
    use crate::pages::{Page, PageMetadata, PatternPage};
    use serde_json::json;
    use std::time::Duration;

    fn pattern_manager() -> PageManager {
        let mut m = PageManager::new(DisplayGeometry::default());
        m.register(
            PATTERN_PAGE_ID,
            Box::new(|g| Ok(Box::new(PatternPage::new(g)) as Box<dyn Page>)),
            PageMetadata::new("Patterns", ""),
        );
        m
    }

    fn msg(topic: &str, v: serde_json::Value) -> RemoteMessage {
        RemoteMessage::new(topic, v.to_string())
    }

    fn lock_as(router: &mut RemoteRouter, pages: &mut PageManager, client: &str, now: Instant) {
        let out = router.handle(&msg(LOCK_REQUEST_TOPIC, json!({"action": "lock", "clientId": client})), pages, now);
        assert_eq!(out.len(), 1);
    }

    fn current_pattern(pages: &mut PageManager) -> Option<PatternKind> {
        pages.current_page_mut().and_then(|p| p.pattern_control()).map(|c| c.current_pattern())
    }

    #[test]
    fn test_authorized_pattern_select_navigates_and_sets() {
        let mut router = RemoteRouter::default();
        let mut pages = pattern_manager();
        let t0 = Instant::now();
        lock_as(&mut router, &mut pages, "A", t0);

        let out = router.handle(
            &msg(PATTERN_TOPIC, json!({"clientId": "A", "enable": true, "id": 5, "speed": 3.5})),
            &mut pages,
            t0,
        );
        assert!(out.is_empty());
        assert_eq!(pages.current_page_id(), Some(PATTERN_PAGE_ID));
        assert_eq!(current_pattern(&mut pages), Some(PatternKind::Cascade));
        let speed = pages.current_page_mut().and_then(|p| p.pattern_control()).map(|c| c.speed());
        assert_eq!(speed, Some(3.5));
    }

    #[test]
    fn test_unknown_pattern_id_mutates_nothing() {
        let mut router = RemoteRouter::default();
        let mut pages = pattern_manager();
        let t0 = Instant::now();
        lock_as(&mut router, &mut pages, "A", t0);
        router.handle(&msg(PATTERN_TOPIC, json!({"clientId": "A", "enable": true, "id": 9})), &mut pages, t0);
        assert_eq!(pages.current_page_id(), None);
    }

    #[test]
    fn test_unauthorized_pattern_dropped_silently() {
        let mut router = RemoteRouter::default();
        let mut pages = pattern_manager();
        let t0 = Instant::now();
        lock_as(&mut router, &mut pages, "A", t0);
        let out = router.handle(&msg(PATTERN_TOPIC, json!({"clientId": "B", "enable": true, "id": 2})), &mut pages, t0);
        assert!(out.is_empty());
        assert_eq!(pages.current_page_id(), None);
        assert!(pages.enabled());
    }

    #[test]
    fn test_disable_on_pattern_page_keeps_page() {
        let mut router = RemoteRouter::default();
        let mut pages = pattern_manager();
        let t0 = Instant::now();
        lock_as(&mut router, &mut pages, "A", t0);
        router.handle(&msg(PATTERN_TOPIC, json!({"clientId": "A", "enable": true, "id": 2})), &mut pages, t0);
        router.handle(&msg(PATTERN_TOPIC, json!({"clientId": "A", "enable": false, "id": 2})), &mut pages, t0);
        assert!(!pages.enabled());
        assert_eq!(pages.current_page_id(), Some(PATTERN_PAGE_ID));

        // enabling again restores output
        router.handle(&msg(PATTERN_TOPIC, json!({"clientId": "A", "enable": true, "id": 1})), &mut pages, t0);
        assert!(pages.enabled());
    }

    #[test]
    fn test_lapsed_lease_notifies_former_holder() {
        let mut router = RemoteRouter::default();
        let mut pages = pattern_manager();
        let t0 = Instant::now();
        lock_as(&mut router, &mut pages, "A", t0);
        let late = t0 + Duration::from_secs(301);
        let out = router.handle(&msg(PATTERN_TOPIC, json!({"clientId": "A", "enable": true, "id": 2})), &mut pages, late);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].topic, LOCK_RESPONSE_TOPIC);
        let v: serde_json::Value = serde_json::from_str(&out[0].payload).unwrap();
        assert_eq!(v["clientId"], "A");
        assert_eq!(v["message"], "Lock timed out");
        assert_eq!(v["locked"], false);
        assert_eq!(pages.current_page_id(), None);
    }

    #[test]
    fn test_malformed_json_is_logged_not_fatal() {
        let mut router = RemoteRouter::default();
        let mut pages = pattern_manager();
        let out = router.handle(&RemoteMessage::new(LOCK_REQUEST_TOPIC, "not json"), &mut pages, Instant::now());
        assert!(out.is_empty());
        let out = router.handle(&RemoteMessage::new(DRAW_TOPIC, "[1,2]"), &mut pages, Instant::now());
        assert!(out.is_empty());
    }

    #[test]
    fn test_status_snapshot() {
        let mut router = RemoteRouter::default();
        let mut pages = pattern_manager();
        let t0 = Instant::now();
        let s = router.status(&pages, t0, 12.5);
        assert!(s.retain);
        let v: serde_json::Value = serde_json::from_str(&s.payload).unwrap();
        assert_eq!(v["status"], "online");
        assert!(v["current_page"].is_null());
        assert_eq!(v["locked"], false);
        assert!(v.get("lockedBy").is_none());

        lock_as(&mut router, &mut pages, "A", t0);
        pages.navigate_to(PATTERN_PAGE_ID).unwrap();
        let s = router.status(&pages, t0 + Duration::from_secs(10), 13.0);
        let v: serde_json::Value = serde_json::from_str(&s.payload).unwrap();
        assert_eq!(v["current_page"], PATTERN_PAGE_ID);
        assert_eq!(v["lockedBy"], "A");
        assert_eq!(v["lockTimeRemaining"], 290);
    }

    #[test]
    fn test_token_drawing_goes_to_store_without_lease() {
        let store = Arc::new(DrawingStore::new(DisplayGeometry::default(), Duration::from_secs(60), None));
        let mut router = RemoteRouter::default().with_drawings(Arc::clone(&store));
        let mut pages = pattern_manager();
        let t0 = Instant::now();
        let token = store.issue_token(t0);

        // someone else holds the lock; the token still counts
        lock_as(&mut router, &mut pages, "A", t0);
        let row = vec![1; 28];
        let out = router.handle(&msg(DRAW_TOPIC, json!({"token": &token, "7": &row})), &mut pages, t0);
        assert!(out.is_empty());
        assert_eq!(pages.current_page_id(), None);

        let stored = store.current_drawing(&token).unwrap();
        assert_eq!(stored.revision, 1);
        assert_eq!(stored.payload.row(7).map(<[u8]>::len), Some(28));

        // unknown token is rejected and nothing is stored
        router.handle(&msg(DRAW_TOPIC, json!({"token": "nope00", "7": &row})), &mut pages, t0);
        assert!(store.current_drawing("nope00").is_none());
    }
}
