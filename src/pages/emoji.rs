/*
 *  pages/emoji.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Face that mirrors the viewer: landmarks steer brows, eyes and mouth,
 *  an open palm makes it smile
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

use std::time::{Duration, Instant};

use log::{debug, trace};

use super::{Gesture, Page, TickInputs};
use crate::error::PageError;
use crate::matrix::{DisplayGeometry, DisplayMatrix};

/// rows drawn by the face, the rest stays free
pub const FACE_HEIGHT: usize = 22;
const UPDATE_INTERVAL: Duration = Duration::from_millis(100);
/// face-less updates before falling back to the default face
const MAX_NO_FACE_UPDATES: u32 = 30;

const SMILE_GESTURE: &str = "open_palm";
const SMILE_CONFIDENCE: f32 = 0.7;

// face mesh indices
const LEFT_BROW: [usize; 5] = [336, 296, 334, 293, 300];
const RIGHT_BROW: [usize; 5] = [70, 63, 105, 66, 107];
const LEFT_EYE: [usize; 5] = [362, 374, 386, 263, 466];
const RIGHT_EYE: [usize; 5] = [33, 145, 159, 133, 173];
const LEFT_EYE_LIDS: (usize, usize) = (386, 374);
const RIGHT_EYE_LIDS: (usize, usize) = (159, 145);
const OUTER_MOUTH: [usize; 20] = [
    61, 185, 40, 39, 37, 0, 267, 269, 270, 409, 291, 375, 321, 405, 314, 17, 84, 181, 91, 146,
];

const BROW_LIFT: f32 = 0.015;
const EYE_DROP: f32 = 0.02;

// default face mouth, used when only a gesture is seen
const REST_MOUTH: (i32, i32, i32) = (14, 17, 8);

pub struct EmojiPage {
    geometry: DisplayGeometry,
    frame: DisplayMatrix,
    default_face: DisplayMatrix,
    last_update: Option<Instant>,
    no_face_updates: u32,
}

/// The resting face: square eyes under flat brows
pub fn default_face(geometry: DisplayGeometry) -> DisplayMatrix {
    let mut face = DisplayMatrix::for_geometry(geometry);
    face.draw_rectangle(8, 10, 3, 3, true, true);
    face.draw_rectangle(17, 10, 3, 3, true, true);
    face.draw_line(6, 6, 10, 6, true);
    face.draw_line(17, 6, 21, 6, true);
    face
}

fn wants_smile(gestures: Option<&[Gesture]>) -> bool {
    gestures.is_some_and(|g| g.iter().any(|g| g.name == SMILE_GESTURE && g.confidence > SMILE_CONFIDENCE))
}

/// Normalised landmark space onto the display, stretched to the face box
struct FaceBox {
    x_min: f32,
    y_min: f32,
    height: f32,
    scale_x: f32,
    scale_y: f32,
    width_px: i32,
    height_px: i32,
}

impl FaceBox {
    fn new(landmarks: &[(f32, f32, f32)], geometry: DisplayGeometry) -> Self {
        let (mut x_min, mut x_max) = (f32::MAX, f32::MIN);
        let (mut y_min, mut y_max) = (f32::MAX, f32::MIN);
        for &(x, y, _) in landmarks {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        let (w, h) = (x_max - x_min, y_max - y_min);
        let scale = |extent: usize, span: f32| if span > 0.0 { extent as f32 / span } else { 1.0 };
        Self {
            x_min,
            y_min,
            height: h,
            scale_x: scale(geometry.width, w),
            scale_y: scale(geometry.height, h),
            width_px: geometry.width as i32,
            height_px: geometry.height as i32,
        }
    }

    fn map(&self, x: f32, y: f32) -> (i32, i32) {
        let dx = ((x - self.x_min) * self.scale_x) as i32;
        let dy = ((y - self.y_min) * self.scale_y) as i32;
        (dx.clamp(0, self.width_px - 1), dy.clamp(0, self.height_px - 1))
    }
}

impl EmojiPage {
    pub fn new(geometry: DisplayGeometry) -> Self {
        let default_face = default_face(geometry);
        Self {
            geometry,
            frame: default_face.clone(),
            default_face,
            last_update: None,
            no_face_updates: 0,
        }
    }

    fn clear_face(&mut self) {
        self.frame.draw_rectangle(0, 0, self.geometry.width as u32, FACE_HEIGHT as u32, false, true);
    }

    fn draw_face(&mut self, landmarks: Option<&[(f32, f32, f32)]>, gestures: Option<&[Gesture]>) {
        let smile = wants_smile(gestures);
        match landmarks {
            Some(points) => {
                self.clear_face();
                self.draw_landmarks(points, smile);
            }
            None => {
                self.frame = self.default_face.clone();
                if smile {
                    let (cx, cy, width) = REST_MOUTH;
                    self.draw_mouth(cx, cy, width, true);
                }
            }
        }
    }

    fn draw_landmarks(&mut self, points: &[(f32, f32, f32)], smile: bool) {
        let face = FaceBox::new(points, self.geometry);
        let at = |i: usize| points.get(i).copied();

        for brow in [LEFT_BROW, RIGHT_BROW] {
            let mut arc: Vec<(f32, f32)> = brow.iter().filter_map(|&i| at(i)).map(|(x, y, _)| (x, y - BROW_LIFT)).collect();
            arc.sort_by(|a, b| a.0.total_cmp(&b.0));
            let mut prev: Option<(i32, i32)> = None;
            for (x, y) in arc {
                let p = face.map(x, y);
                self.frame.set(p.0, p.1, true);
                if let Some(q) = prev {
                    self.frame.draw_line(q.0, q.1, p.0, p.1, true);
                }
                prev = Some(p);
            }
        }

        let openness = |(top, bottom): (usize, usize)| match (at(top), at(bottom)) {
            (Some(t), Some(b)) if face.height > 0.0 => (((b.1 - t.1) / face.height * 50.0) as i32).clamp(1, 3),
            _ => 3,
        };
        let eyes = [(LEFT_EYE, openness(LEFT_EYE_LIDS)), (RIGHT_EYE, openness(RIGHT_EYE_LIDS))];
        if eyes.iter().all(|(idx, _)| idx.iter().all(|&i| i < points.len())) {
            for (idx, size) in eyes {
                let (sx, sy) = idx.iter().filter_map(|&i| at(i)).fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
                let n = idx.len() as f32;
                let (cx, cy) = face.map(sx / n, sy / n + EYE_DROP);
                let half = size / 2;
                let side = (half * 2 + 1) as u32;
                self.frame.draw_rectangle(cx - half, cy - half, side, side, true, true);
            }
        }

        let mouth: Vec<(f32, f32, f32)> = OUTER_MOUTH.iter().filter_map(|&i| at(i)).collect();
        if mouth.len() >= 10 {
            let n = mouth.len() as f32;
            let mx = mouth.iter().map(|p| p.0).sum::<f32>() / n;
            let my = mouth.iter().map(|p| p.1).sum::<f32>() / n;
            let (cx, cy) = face.map(mx, my);
            let cy = cy.min(FACE_HEIGHT as i32 - 2);
            let left = face.map(mouth[0].0, 0.0).0;
            let right = face.map(mouth[mouth.len() / 2].0, 0.0).0;
            let width = (((left - right).abs() as f32) * 0.8) as i32;
            self.draw_mouth(cx, cy, width.max(4), smile);
        }
    }

    fn draw_mouth(&mut self, cx: i32, cy: i32, width: i32, smile: bool) {
        let half = width / 2;
        if !smile {
            self.frame.draw_line(cx - half, cy, cx + half, cy, true);
            return;
        }
        for i in -half..=half {
            let t = i as f32 / (width as f32 / 2.0);
            let y = cy - (2.0 * t * t) as i32;
            if (0..FACE_HEIGHT as i32).contains(&y) {
                self.frame.set(cx + i, y, true);
            }
        }
    }
}

impl Page for EmojiPage {
    fn initialize(&mut self) -> Result<(), PageError> {
        self.frame = self.default_face.clone();
        self.no_face_updates = 0;
        Ok(())
    }

    fn update(&mut self, inputs: &TickInputs) -> Result<(), PageError> {
        let now = inputs.now;
        if self.last_update.is_some_and(|last| now.saturating_duration_since(last) < UPDATE_INTERVAL) {
            return Ok(());
        }
        self.last_update = Some(now);

        let landmarks = inputs.landmarks.as_deref().filter(|l| !l.is_empty());
        let gestures = inputs.gestures.as_deref().filter(|g| !g.is_empty());
        if landmarks.is_some() || gestures.is_some() {
            trace!("Face input: {} landmarks", landmarks.map_or(0, <[_]>::len));
            self.no_face_updates = 0;
            self.draw_face(landmarks, gestures);
        } else {
            self.no_face_updates = self.no_face_updates.saturating_add(1);
            if self.no_face_updates == MAX_NO_FACE_UPDATES {
                debug!("No face for {} updates, back to the resting face", MAX_NO_FACE_UPDATES);
                self.frame = self.default_face.clone();
            }
        }
        Ok(())
    }

    fn render(&self) -> &DisplayMatrix {
        &self.frame
    }

    fn clear_frame(&mut self) {
        self.frame.clear();
    }
}
