/*
 *  drawing.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Row-indexed drawing payloads and the token-keyed drawing store
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

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::TOKEN_LENGTH;
use crate::error::DrawError;
use crate::matrix::{DisplayGeometry, DisplayMatrix};

/// Keys on a draw message that are not rows
const RESERVED_KEYS: [&str; 2] = ["clientId", "token"];

/// A sparse drawing: row index to disc values (0 or 1).
/// Rows that are absent render as off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawPayload {
    rows: BTreeMap<usize, Vec<u8>>,
}

impl DrawPayload {
    /// Parse `{"0": [0,1,..], "5": [...], "clientId": ..}` against the
    /// display geometry. Every row is checked before anything is accepted.
    pub fn from_json_map(map: &Map<String, Value>, geometry: DisplayGeometry) -> Result<Self, DrawError> {
        let mut rows = BTreeMap::new();
        for (key, value) in map {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let row: usize = key
                .trim()
                .parse()
                .map_err(|_| DrawError::InvalidRowKey(key.clone()))?;
            if row >= geometry.height {
                return Err(DrawError::RowOutOfRange { row, height: geometry.height });
            }
            let Value::Array(cells) = value else {
                return Err(DrawError::MalformedRow(key.clone()));
            };
            if cells.len() != geometry.width {
                return Err(DrawError::RowLength { row, expected: geometry.width, actual: cells.len() });
            }
            let discs = cells
                .iter()
                .map(|c| match c.as_u64() {
                    Some(v @ (0 | 1)) => Ok(v as u8),
                    _ => Err(DrawError::InvalidDiscValue { row }),
                })
                .collect::<Result<Vec<u8>, _>>()?;
            rows.insert(row, discs);
        }
        Ok(Self { rows })
    }

    pub fn from_json_str(s: &str, geometry: DisplayGeometry) -> Result<Self, DrawError> {
        match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Self::from_json_map(&map, geometry),
            _ => Err(DrawError::MalformedRow("<payload>".into())),
        }
    }

    pub fn row(&self, index: usize) -> Option<&[u8]> {
        self.rows.get(&index).map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Materialise onto a blank matrix of the given geometry
    pub fn to_matrix(&self, geometry: DisplayGeometry) -> DisplayMatrix {
        let mut m = DisplayMatrix::for_geometry(geometry);
        for (&y, discs) in &self.rows {
            for (x, &d) in discs.iter().enumerate() {
                m.set(x as i32, y as i32, d == 1);
            }
        }
        m
    }
}

/// Persisted token record, one JSON file per token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    /// unix seconds
    pub created: f64,
    pub expires: f64,
    pub used: bool,
}

pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Write `<folder>/<token>.json`, creating the folder as needed
pub fn save_token_record(folder: &Path, record: &TokenRecord) -> std::io::Result<PathBuf> {
    fs::create_dir_all(folder)?;
    let path = folder.join(format!("{}.json", record.token));
    let body = serde_json::to_vec_pretty(record)?;
    fs::write(&path, body)?;
    Ok(path)
}

/// A drawing as held by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDrawing {
    pub revision: u64,
    pub payload: DrawPayload,
}

#[derive(Debug)]
struct TokenSlot {
    expires_at: Instant,
    drawing: Option<StoredDrawing>,
}

/// Token-keyed drawings shared between the sketchpad page and whatever
/// ingests drawings from the web side.
#[derive(Debug)]
pub struct DrawingStore {
    geometry: DisplayGeometry,
    ttl: Duration,
    token_folder: Option<PathBuf>,
    slots: Mutex<HashMap<String, TokenSlot>>,
}

impl DrawingStore {
    pub fn new(geometry: DisplayGeometry, ttl: Duration, token_folder: Option<PathBuf>) -> Self {
        Self { geometry, ttl, token_folder, slots: Mutex::new(HashMap::new()) }
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    /// Mint a fresh token valid for the store ttl and record it on disk
    /// when a token folder is configured.
    pub fn issue_token(&self, now: Instant) -> String {
        let token = generate_token();
        if let Some(folder) = self.token_folder.as_deref() {
            let created = Utc::now().timestamp_millis() as f64 / 1000.0;
            let record = TokenRecord {
                token: token.clone(),
                created,
                expires: created + self.ttl.as_secs_f64(),
                used: false,
            };
            match save_token_record(folder, &record) {
                Ok(path) => debug!("Token record written to {}", path.display()),
                Err(e) => warn!("Error saving token {}: {}", token, e),
            }
        }

        let mut slots = self.lock_slots();
        slots.retain(|_, s| s.expires_at > now);
        slots.insert(token.clone(), TokenSlot { expires_at: now + self.ttl, drawing: None });
        info!("Issued sketchpad token {}", token);
        token
    }

    /// Ingest a drawing for `token`. Returns the new revision.
    pub fn receive_drawing(&self, token: &str, payload: &Map<String, Value>, now: Instant) -> Result<u64, DrawError> {
        let parsed = DrawPayload::from_json_map(payload, self.geometry)?;
        let mut slots = self.lock_slots();
        let slot = slots
            .get_mut(token)
            .filter(|s| s.expires_at > now)
            .ok_or_else(|| DrawError::UnknownToken(token.to_string()))?;
        let revision = slot.drawing.as_ref().map_or(1, |d| d.revision + 1);
        slot.drawing = Some(StoredDrawing { revision, payload: parsed });
        debug!("Drawing revision {} stored for token {}", revision, token);
        Ok(revision)
    }

    pub fn current_drawing(&self, token: &str) -> Option<StoredDrawing> {
        self.lock_slots().get(token).and_then(|s| s.drawing.clone())
    }

    pub fn revoke(&self, token: &str) {
        self.lock_slots().remove(token);
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, TokenSlot>> {
        // a poisoned map is still structurally valid
        self.slots.lock().unwrap_or_else(|p| p.into_inner())
    }
}
