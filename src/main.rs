/*
 *  main.rs
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

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use flipframe::config::{self, Cli, InputConfig};
use flipframe::constants::{PATTERN_PAGE_ID, STATUS_PERIOD_MS};
use flipframe::controller::{forward_inputs, Controller};
use flipframe::display::{self, FlipDisplay};
use flipframe::drawing::DrawingStore;
use flipframe::input::{InputBridge, InputPollers};
use flipframe::matrix::DisplayGeometry;
use flipframe::pages::{register_default_pages, PageManager};
use flipframe::remote::mqtt::MqttLink;
use flipframe::remote::{NullPublisher, Publisher, RemoteRouter, StatusTicker};
use flipframe::render::{LoopExit, RenderLoop};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

const POLLER_STOP_TIMEOUT: Duration = Duration::from_secs(1);
const MQTT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Waits for SIGINT, SIGTERM or SIGHUP and logs which one arrived.
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[cfg(feature = "hardware")]
fn start_local_inputs(
    cfg: &InputConfig,
    bridge: &InputBridge,
    pollers: &mut InputPollers,
) -> Option<flipframe::hardware::Buttons> {
    if !cfg.enabled {
        info!("Local inputs disabled.");
        return None;
    }
    flipframe::hardware::spawn_sensor_pollers(cfg, bridge, pollers);
    match flipframe::hardware::Buttons::start(cfg, bridge) {
        Ok(buttons) => Some(buttons),
        Err(e) => {
            error!("Buttons unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "hardware"))]
fn start_local_inputs(cfg: &InputConfig, _bridge: &InputBridge, _pollers: &mut InputPollers) -> Option<()> {
    if cfg.enabled {
        warn!("Built without hardware support, no buttons or sensors attached.");
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli).context("loading configuration")?;

    if cli.dump_config {
        println!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} flips discs", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let geometry = DisplayGeometry::default();
    let drawings = Arc::new(DrawingStore::new(
        geometry,
        cfg.sketchpad.token_ttl(),
        Some(cfg.sketchpad.token_folder.clone()),
    ));

    let mut pages = PageManager::new(geometry);
    register_default_pages(&mut pages, &cfg.sketchpad, Arc::clone(&drawings));
    if let Err(e) = pages.navigate_to(PATTERN_PAGE_ID) {
        error!("Initial page failed to start: {}", e);
    }

    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let mut mqtt = if cfg.mqtt.enabled {
        Some(MqttLink::start(&cfg.mqtt, events_tx.clone()))
    } else {
        info!("MQTT disabled, remote control unavailable.");
        None
    };
    let publisher: Box<dyn Publisher> = match &mqtt {
        Some(link) => Box::new(link.publisher()),
        None => Box::new(NullPublisher),
    };
    let mut status = mqtt
        .as_ref()
        .map(|_| StatusTicker::start(Duration::from_millis(STATUS_PERIOD_MS), events_tx.clone()));

    let bridge = InputBridge::new();
    forward_inputs(&bridge, events_tx.clone());
    let mut pollers = InputPollers::new();
    let buttons = start_local_inputs(&cfg.inputs, &bridge, &mut pollers);

    let sink = display::open_sink(&cfg.display).context("opening display output")?;
    let display = FlipDisplay::new(sink, cfg.display.flip).with_inter_frame_delay(cfg.display.inter_frame_delay());

    let router = RemoteRouter::default().with_drawings(Arc::clone(&drawings));
    let controller = Controller::new(pages, router, publisher);
    let mut render = RenderLoop::new(controller, display, events_rx, cfg.display.fps);

    tokio::select! {
        res = signal_handler() => {
            if let Err(e) = res {
                error!("Signal handling failed: {}", e);
            }
        }
        exit = render.run() => {
            match exit {
                LoopExit::Shutdown => info!("Render loop asked to shut down."),
                LoopExit::QueueClosed => warn!("Event queue closed, leaving render loop."),
            }
        }
    }

    info!("Main application exiting. Stopping background tasks.");

    if let Some(ticker) = status.as_mut() {
        ticker.stop().await;
    }
    if !pollers.stop(POLLER_STOP_TIMEOUT).await {
        warn!("Some input pollers had to be abandoned.");
    }
    #[cfg(feature = "hardware")]
    drop(buttons);
    #[cfg(not(feature = "hardware"))]
    let _ = buttons;
    drop(bridge);

    render.shutdown().await;

    if let Some(link) = mqtt.as_mut() {
        link.shutdown(MQTT_STOP_TIMEOUT).await;
    }
    drop(events_tx);

    info!("Closed Application Loop.");
    Ok(())
}
