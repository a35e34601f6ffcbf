/*
 *  remote/status.rs
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

use std::time::Duration;

use log::{error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::controller::ControlEvent;

/// Fixed-period status trigger. The status itself is built by whoever
/// owns the page manager when the tick arrives.
pub struct StatusTicker {
    stop_sender: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StatusTicker {
    pub fn start(period: Duration, events: mpsc::UnboundedSender<ControlEvent>) -> Self {
        let (stop_tx, mut stop_rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if events.send(ControlEvent::StatusTick).is_err() {
                            info!("Status ticker: event queue closed. Exiting.");
                            break;
                        }
                    }
                    _ = stop_rx.recv() => {
                        info!("Status ticker received stop signal. Exiting.");
                        break;
                    }
                }
            }
        });
        Self { stop_sender: Some(stop_tx), handle: Some(handle) }
    }

    pub async fn stop(&mut self) {
        if let Some(sender) = self.stop_sender.take() {
            // a closed channel means the task already exited
            let _ = sender.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap_or_else(|e| error!("Status ticker failed to join: {}", e));
        }
    }
}

impl Drop for StatusTicker {
    fn drop(&mut self) {
        if let Some(sender) = self.stop_sender.take() {
            let _ = sender.try_send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ticks_until_stopped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = StatusTicker::start(Duration::from_millis(20), tx);

        for _ in 0..3 {
            assert!(matches!(rx.recv().await, Some(ControlEvent::StatusTick)));
        }
        ticker.stop().await;
        // sender dropped with the task
        while rx.recv().await.is_some() {}
    }
}
