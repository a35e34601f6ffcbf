/*
 *  pages/sketchpad.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Sketchpad page - QR hand-off link, web drawings and remote drawings
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
use std::time::{Duration, Instant};

use log::{debug, info};

use super::qr::{render_qr, token_link};
use super::{DrawingTarget, Page, TickInputs};
use crate::config::SketchpadConfig;
use crate::drawing::{DrawPayload, DrawingStore};
use crate::error::{DrawError, PageError};
use crate::matrix::{DisplayGeometry, DisplayMatrix};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SketchMode {
    /// showing the hand-off QR code
    Qr,
    /// showing a web drawing, since the given instant
    DrawingFromToken(Instant),
    /// showing a drawing pushed over the draw topic; stays until replaced
    DrawingFromRemote,
}

pub struct SketchpadPage {
    geometry: DisplayGeometry,
    url: String,
    drawing_timeout: Duration,
    store: Arc<DrawingStore>,
    token: Option<String>,
    seen_revision: u64,
    mode: SketchMode,
    qr: DisplayMatrix,
    drawing: DisplayMatrix,
    blank: DisplayMatrix,
    cleared: bool,
}

impl SketchpadPage {
    pub fn new(
        geometry: DisplayGeometry,
        settings: SketchpadConfig,
        store: Arc<DrawingStore>,
    ) -> Result<Self, PageError> {
        if store.geometry() != geometry {
            return Err(PageError::Construction(format!(
                "drawing store is {}x{}, display is {}x{}",
                store.geometry().width,
                store.geometry().height,
                geometry.width,
                geometry.height
            )));
        }
        Ok(Self {
            geometry,
            url: settings.url.clone(),
            drawing_timeout: settings.drawing_timeout(),
            store,
            token: None,
            seen_revision: 0,
            mode: SketchMode::Qr,
            qr: DisplayMatrix::for_geometry(geometry),
            drawing: DisplayMatrix::for_geometry(geometry),
            blank: DisplayMatrix::for_geometry(geometry),
            cleared: false,
        })
    }

    pub fn mode(&self) -> SketchMode {
        self.mode
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Swap in a fresh token and show its QR code
    fn reissue(&mut self, now: Instant) -> Result<(), PageError> {
        if let Some(old) = self.token.take() {
            self.store.revoke(&old);
        }
        let token = self.store.issue_token(now);
        self.qr = render_qr(&token_link(&self.url, &token), self.geometry)?;
        self.token = Some(token);
        self.seen_revision = 0;
        self.mode = SketchMode::Qr;
        Ok(())
    }

    /// Adopt a web drawing if its revision moved on
    fn poll_store(&mut self, now: Instant) -> bool {
        let Some(token) = self.token.as_deref() else {
            return false;
        };
        match self.store.current_drawing(token) {
            Some(d) if d.revision != self.seen_revision => {
                debug!("Sketchpad adopting drawing revision {} for {}", d.revision, token);
                self.seen_revision = d.revision;
                self.drawing = d.payload.to_matrix(self.geometry);
                self.mode = SketchMode::DrawingFromToken(now);
                true
            }
            _ => false,
        }
    }
}

impl Page for SketchpadPage {
    fn initialize(&mut self) -> Result<(), PageError> {
        self.reissue(Instant::now())?;
        info!("Sketchpad ready with token {}", self.token.as_deref().unwrap_or("?"));
        Ok(())
    }

    fn update(&mut self, inputs: &TickInputs) -> Result<(), PageError> {
        self.cleared = false;
        let now = inputs.now;
        if let SketchMode::DrawingFromToken(since) = self.mode {
            if now.saturating_duration_since(since) >= self.drawing_timeout {
                info!("Sketchpad drawing timed out, issuing a new token");
                self.reissue(now)?;
            }
        }
        self.poll_store(now);
        Ok(())
    }

    fn render(&self) -> &DisplayMatrix {
        if self.cleared {
            return &self.blank;
        }
        match self.mode {
            SketchMode::Qr => &self.qr,
            SketchMode::DrawingFromToken(_) | SketchMode::DrawingFromRemote => &self.drawing,
        }
    }

    fn clear_frame(&mut self) {
        self.cleared = true;
    }

    fn cleanup(&mut self) -> Result<(), PageError> {
        if let Some(token) = self.token.take() {
            self.store.revoke(&token);
        }
        Ok(())
    }

    fn drawing_target(&mut self) -> Option<&mut dyn DrawingTarget> {
        Some(self)
    }
}

impl DrawingTarget for SketchpadPage {
    fn set_drawing(&mut self, drawing: &DrawPayload, _now: Instant) -> Result<(), DrawError> {
        self.drawing = drawing.to_matrix(self.geometry);
        self.mode = SketchMode::DrawingFromRemote;
        debug!("Sketchpad showing remote drawing ({} rows)", drawing.row_count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> (SketchpadPage, Arc<DrawingStore>) {
        let g = DisplayGeometry::default();
        let store = Arc::new(DrawingStore::new(g, Duration::from_secs(3600), None));
        let settings = SketchpadConfig { url: "https://example.com/draw".into(), ..SketchpadConfig::default() };
        let mut p = SketchpadPage::new(g, settings, Arc::clone(&store)).unwrap();
        p.initialize().unwrap();
        (p, store)
    }

    fn row_map(row: &str) -> serde_json::Map<String, serde_json::Value> {
        match json!({ row: vec![1u8; 28] }) {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_initialize_shows_qr_with_token() {
        let (p, _) = page();
        assert_eq!(p.mode(), SketchMode::Qr);
        assert_eq!(p.token().map(str::len), Some(6));
        assert!(p.render().get(1, 1));
    }

    #[test]
    fn test_web_drawing_then_timeout_back_to_qr() {
        let (mut p, store) = page();
        let t0 = Instant::now();
        let token = p.token().unwrap().to_string();
        store.receive_drawing(&token, &row_map("4"), t0).unwrap();

        p.update(&TickInputs::at(t0)).unwrap();
        assert_eq!(p.mode(), SketchMode::DrawingFromToken(t0));
        assert!(p.render().row(4).iter().all(|&c| c));

        // same revision is not re-adopted
        p.update(&TickInputs::at(t0 + Duration::from_secs(10))).unwrap();
        assert_eq!(p.mode(), SketchMode::DrawingFromToken(t0));

        p.update(&TickInputs::at(t0 + Duration::from_secs(300))).unwrap();
        assert_eq!(p.mode(), SketchMode::Qr);
        assert_ne!(p.token(), Some(token.as_str()));
        assert!(store.current_drawing(&token).is_none());
    }

    #[test]
    fn test_remote_drawing_persists() {
        let (mut p, _) = page();
        let payload = DrawPayload::from_json_map(&row_map("0"), DisplayGeometry::default()).unwrap();
        let t0 = Instant::now();
        p.set_drawing(&payload, t0).unwrap();
        assert_eq!(p.mode(), SketchMode::DrawingFromRemote);
        p.update(&TickInputs::at(t0 + Duration::from_secs(3600))).unwrap();
        assert_eq!(p.mode(), SketchMode::DrawingFromRemote);
        assert_eq!(p.render().count_on(), 28);
    }

    #[test]
    fn test_geometry_mismatch_fails_construction() {
        let store = Arc::new(DrawingStore::new(DisplayGeometry { width: 10, height: 10 }, Duration::from_secs(1), None));
        let r = SketchpadPage::new(DisplayGeometry::default(), SketchpadConfig::default(), store);
        assert!(matches!(r, Err(PageError::Construction(_))));
    }
}
