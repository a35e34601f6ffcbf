/*
 *  input.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Input event bridge: buttons and polled analog sources
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

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueSource {
    Slider,
    Distance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Primary,
    Secondary,
    ValueChange { source: ValueSource, value: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Primary,
    Secondary,
    ValueChange,
}

impl InputEvent {
    pub fn kind(&self) -> InputKind {
        match self {
            InputEvent::Primary => InputKind::Primary,
            InputEvent::Secondary => InputKind::Secondary,
            InputEvent::ValueChange { .. } => InputKind::ValueChange,
        }
    }
}

pub type InputCallback = Box<dyn Fn(&InputEvent) + Send + Sync>;

#[derive(Default)]
struct CallbackTable {
    primary: Vec<InputCallback>,
    secondary: Vec<InputCallback>,
    value_change: Vec<InputCallback>,
}

impl CallbackTable {
    fn slot(&mut self, kind: InputKind) -> &mut Vec<InputCallback> {
        match kind {
            InputKind::Primary => &mut self.primary,
            InputKind::Secondary => &mut self.secondary,
            InputKind::ValueChange => &mut self.value_change,
        }
    }

    fn get(&self, kind: InputKind) -> &[InputCallback] {
        match kind {
            InputKind::Primary => &self.primary,
            InputKind::Secondary => &self.secondary,
            InputKind::ValueChange => &self.value_change,
        }
    }
}

/// Fan-out of input events to registered callbacks.
///
/// Callbacks run synchronously, in registration order, on whichever
/// thread emitted the event.
#[derive(Default, Clone)]
pub struct InputBridge {
    callbacks: Arc<RwLock<CallbackTable>>,
}

impl InputBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, kind: InputKind, callback: F)
    where
        F: Fn(&InputEvent) + Send + Sync + 'static,
    {
        match self.callbacks.write() {
            Ok(mut table) => table.slot(kind).push(Box::new(callback)),
            Err(e) => error!("Input callback table poisoned: {}", e),
        }
    }

    pub fn emit(&self, event: InputEvent) {
        let table = match self.callbacks.read() {
            Ok(t) => t,
            Err(e) => {
                error!("Input callback table poisoned: {}", e);
                return;
            }
        };
        let callbacks = table.get(event.kind());
        if callbacks.is_empty() {
            debug!("No callbacks for {:?}", event);
        }
        for callback in callbacks {
            callback(&event);
        }
    }
}

/// Change-coalescing for a polled source: only differing readings pass
#[derive(Debug, Default, Clone)]
pub struct ValueTracker {
    last: Option<i32>,
}

impl ValueTracker {
    pub fn observe(&mut self, value: i32) -> bool {
        if self.last == Some(value) {
            false
        } else {
            self.last = Some(value);
            true
        }
    }

    pub fn last(&self) -> Option<i32> {
        self.last
    }
}

/// A sensor sampled on a fixed period
pub trait AnalogSource: Send {
    fn source(&self) -> ValueSource;
    fn read(&mut self) -> Result<i32, InputError>;
}

/// Background samplers, one task per source
#[derive(Default)]
pub struct InputPollers {
    tasks: Vec<(mpsc::Sender<()>, JoinHandle<()>)>,
}

impl InputPollers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn spawn(&mut self, mut source: Box<dyn AnalogSource>, period: Duration, bridge: InputBridge) {
        let (stop_tx, mut stop_rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let which = source.source();
            let mut tracker = ValueTracker::default();
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match source.read() {
                            Ok(value) => {
                                if tracker.observe(value) {
                                    bridge.emit(InputEvent::ValueChange { source: which, value });
                                }
                            }
                            Err(e) => warn!("{:?} read failed: {}", which, e),
                        }
                    }
                    _ = stop_rx.recv() => {
                        info!("{:?} poller received stop signal. Exiting.", which);
                        break;
                    }
                }
            }
        });
        self.tasks.push((stop_tx, handle));
    }

    /// Stop every poller, waiting at most `timeout` for them to finish.
    /// Returns false if any had to be abandoned.
    pub async fn stop(&mut self, timeout: Duration) -> bool {
        for (stop, _) in &self.tasks {
            let _ = stop.try_send(());
        }
        let mut clean = true;
        for (_, handle) in self.tasks.drain(..) {
            let abort = handle.abort_handle();
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Input poller failed to join: {}", e);
                    clean = false;
                }
                Err(_) => {
                    warn!("Input poller did not stop within {:?}", timeout);
                    abort.abort();
                    clean = false;
                }
            }
        }
        clean
    }
}

impl Drop for InputPollers {
    fn drop(&mut self) {
        for (stop, _) in &self.tasks {
            let _ = stop.try_send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_callbacks_in_registration_order() {
        let bridge = InputBridge::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            bridge.register(InputKind::Primary, move |_| seen.lock().unwrap().push(tag));
        }
        let other = Arc::clone(&seen);
        bridge.register(InputKind::Secondary, move |_| other.lock().unwrap().push("secondary"));

        bridge.emit(InputEvent::Primary);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_value_tracker_coalesces() {
        let mut t = ValueTracker::default();
        assert!(t.observe(10));
        assert!(!t.observe(10));
        assert!(t.observe(11));
        assert!(t.observe(10));
        assert_eq!(t.last(), Some(10));
    }

    struct Scripted {
        values: Vec<i32>,
        at: usize,
    }

    impl AnalogSource for Scripted {
        fn source(&self) -> ValueSource {
            ValueSource::Slider
        }

        fn read(&mut self) -> Result<i32, InputError> {
            let v = self.values.get(self.at).copied();
            self.at += 1;
            v.ok_or_else(|| InputError::NotReady("script exhausted".into()))
        }
    }

    #[tokio::test]
    async fn test_poller_emits_only_changes_and_stops() {
        let bridge = InputBridge::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bridge.register(InputKind::ValueChange, move |e| {
            if let InputEvent::ValueChange { value, .. } = e {
                sink.lock().unwrap().push(*value);
            }
        });

        let mut pollers = InputPollers::new();
        pollers.spawn(
            Box::new(Scripted { values: vec![5, 5, 7, 7, 7, 3], at: 0 }),
            Duration::from_millis(5),
            bridge,
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(pollers.stop(Duration::from_secs(1)).await);
        assert!(pollers.is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![5, 7, 3]);
    }
}
