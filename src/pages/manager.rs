/*
 *  pages/manager.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Page manager - registry, navigation state machine and bounded history
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

use std::collections::VecDeque;

use log::{debug, error, info, warn};

use super::{Page, PageConstructor, PageMetadata, TickInputs};
use crate::constants::MAX_HISTORY;
use crate::error::NavigationError;
use crate::matrix::{DisplayGeometry, DisplayMatrix};

struct RegistryEntry {
    id: String,
    constructor: PageConstructor,
    metadata: PageMetadata,
}

/// Page id to constructor mapping, kept in registration order
#[derive(Default)]
pub struct PageRegistry {
    entries: Vec<RegistryEntry>,
}

impl PageRegistry {
    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Returns true when an existing entry was replaced
    fn insert(&mut self, id: &str, constructor: PageConstructor, metadata: PageMetadata) -> bool {
        match self.position(id) {
            Some(i) => {
                // replacing keeps the original slot in the cycle
                self.entries[i].constructor = constructor;
                self.entries[i].metadata = metadata;
                true
            }
            None => {
                self.entries.push(RegistryEntry { id: id.to_string(), constructor, metadata });
                false
            }
        }
    }

    fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Owns the page registry and the one live page.
///
/// `Idle` when `current_page` is `None`, `Active` otherwise. The page id
/// and the page instance always change together.
pub struct PageManager {
    geometry: DisplayGeometry,
    registry: PageRegistry,
    current_page_id: Option<String>,
    current_page: Option<Box<dyn Page>>,
    history: VecDeque<String>,
    max_history: usize,
    enabled: bool,
}

impl PageManager {
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self {
            geometry,
            registry: PageRegistry::default(),
            current_page_id: None,
            current_page: None,
            history: VecDeque::with_capacity(MAX_HISTORY + 1),
            max_history: MAX_HISTORY,
            enabled: true,
        }
    }

    pub fn register(&mut self, id: &str, constructor: PageConstructor, metadata: PageMetadata) {
        if self.registry.insert(id, constructor, metadata) {
            warn!("Overwriting existing page with id '{}'", id);
        } else {
            debug!("Registered page '{}'", id);
        }
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    pub fn page_ids(&self) -> Vec<&str> {
        self.registry.ids()
    }

    pub fn metadata(&self, id: &str) -> Option<&PageMetadata> {
        self.registry.get(id).map(|e| &e.metadata)
    }

    pub fn current_page_id(&self) -> Option<&str> {
        self.current_page_id.as_deref()
    }

    pub fn current_metadata(&self) -> Option<&PageMetadata> {
        self.current_page_id.as_deref().and_then(|id| self.metadata(id))
    }

    pub fn current_page_mut(&mut self) -> Option<&mut (dyn Page + 'static)> {
        self.current_page.as_deref_mut()
    }

    pub fn is_active(&self) -> bool {
        self.current_page.is_some()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!("Page output {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    /// Most recent last
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub fn navigate_to(&mut self, id: &str) -> Result<(), NavigationError> {
        if self.registry.get(id).is_none() {
            error!("Page with id '{}' not found", id);
            return Err(NavigationError::UnknownPage(id.to_string()));
        }

        if let Some(prev) = self.current_page_id.take() {
            self.history.push_back(prev);
            while self.history.len() > self.max_history {
                self.history.pop_front();
            }
        }

        self.install(id)
    }

    pub fn next_page(&mut self) -> Result<(), NavigationError> {
        let target = {
            let ids = self.registry.ids();
            if ids.is_empty() {
                return Err(NavigationError::EmptyRegistry);
            }
            let next = match self.current_index() {
                Some(i) => (i + 1) % ids.len(),
                None => 0,
            };
            ids[next].to_string()
        };
        self.navigate_to(&target)
    }

    pub fn previous_page(&mut self) -> Result<(), NavigationError> {
        let target = {
            let ids = self.registry.ids();
            if ids.is_empty() {
                return Err(NavigationError::EmptyRegistry);
            }
            let prev = match self.current_index() {
                Some(i) => (i + ids.len() - 1) % ids.len(),
                None => ids.len() - 1,
            };
            ids[prev].to_string()
        };
        self.navigate_to(&target)
    }

    /// One-way undo: the page being left is not recorded
    pub fn back(&mut self) -> Result<(), NavigationError> {
        let Some(previous) = self.history.pop_back() else {
            return Err(NavigationError::EmptyHistory);
        };
        if self.registry.get(&previous).is_none() {
            return Err(NavigationError::UnknownPage(previous));
        }
        self.install(&previous)
    }

    fn current_index(&self) -> Option<usize> {
        self.current_page_id.as_deref().and_then(|id| self.registry.position(id))
    }

    /// Tear down the live page, then construct and initialise `id`.
    /// Any failure leaves the manager idle.
    fn install(&mut self, id: &str) -> Result<(), NavigationError> {
        self.teardown();

        let Some(entry) = self.registry.get(id) else {
            return Err(NavigationError::UnknownPage(id.to_string()));
        };

        let mut page = (entry.constructor)(self.geometry).map_err(|source| {
            error!("Error constructing page '{}': {}", id, source);
            NavigationError::PageFailed { id: id.to_string(), source }
        })?;

        if let Err(source) = page.initialize() {
            error!("Error initializing page '{}': {}", id, source);
            if let Err(e) = page.cleanup() {
                warn!("Error cleaning up failed page '{}': {}", id, e);
            }
            return Err(NavigationError::PageFailed { id: id.to_string(), source });
        }

        info!("Page changed to '{}'", id);
        self.current_page = Some(page);
        self.current_page_id = Some(id.to_string());
        Ok(())
    }

    fn teardown(&mut self) {
        let id = self.current_page_id.take();
        if let Some(mut page) = self.current_page.take() {
            if let Err(e) = page.cleanup() {
                warn!("Error cleaning up page '{}': {}", id.as_deref().unwrap_or("?"), e);
            }
        }
    }

    /// Run one tick on the live page. False when idle or the page failed.
    pub fn update(&mut self, inputs: &TickInputs) -> bool {
        let Some(page) = self.current_page.as_deref_mut() else {
            return false;
        };

        if !self.enabled {
            page.clear_frame();
            return true;
        }

        match page.update(inputs) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Error updating page '{}': {}",
                    self.current_page_id.as_deref().unwrap_or("?"),
                    e
                );
                false
            }
        }
    }

    pub fn render(&self) -> Option<&DisplayMatrix> {
        self.current_page.as_deref().map(|p| p.render())
    }

    pub fn handle_slider_change(&mut self, value: i32) -> bool {
        match self.current_page.as_deref_mut() {
            Some(page) if page.supports_slider() => {
                page.handle_slider_change(value);
                true
            }
            _ => false,
        }
    }

    pub fn handle_secondary_button(&mut self) -> bool {
        match self.current_page.as_deref_mut() {
            Some(page) => {
                page.handle_secondary_button();
                true
            }
            None => false,
        }
    }

    /// Best-effort cleanup of the live page; leaves the manager idle
    pub fn cleanup(&mut self) {
        if self.current_page.is_some() {
            info!("Cleaning up page '{}'", self.current_page_id.as_deref().unwrap_or("?"));
        }
        self.teardown();
    }
}

impl Drop for PageManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
