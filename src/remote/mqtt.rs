/*
 *  remote/mqtt.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  MQTT transport: connection, subscriptions, last will, publishing
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

use chrono::Utc;
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Outbound, PresenceMessage, Publisher, RemoteMessage, COMMAND_TOPICS, STATUS_TOPIC};
use crate::config::MqttConfig;
use crate::controller::ControlEvent;
use crate::error::TransportError;

const REQUEST_QUEUE: usize = 64;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Broker options including the retained offline last will
pub fn mqtt_options(cfg: &MqttConfig, unix_secs: i64) -> MqttOptions {
    let client_id = format!("{}_{}", cfg.client_id_prefix, unix_secs);
    let mut options = MqttOptions::new(client_id, cfg.broker.clone(), cfg.port);
    options.set_keep_alive(Duration::from_secs(cfg.keep_alive_secs.max(5)));
    if let Some(user) = cfg.username.as_deref() {
        options.set_credentials(user, cfg.password.as_deref().unwrap_or(""));
    }
    let will = PresenceMessage::offline(unix_secs).to_outbound();
    options.set_last_will(LastWill::new(STATUS_TOPIC, will.payload, QoS::AtLeastOnce, true));
    options
}

fn qos_for(message: &Outbound) -> QoS {
    if message.retain { QoS::AtLeastOnce } else { QoS::AtMostOnce }
}

/// Non-blocking publisher handle, usable from the render thread
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, message: &Outbound) -> Result<(), TransportError> {
        self.client
            .try_publish(message.topic.as_str(), qos_for(message), message.retain, message.payload.as_bytes())
            .map_err(|e| TransportError::Mqtt(e.to_string()))
    }
}

/// Owns the broker connection and forwards command topics as events.
pub struct MqttLink {
    client: AsyncClient,
    stop_sender: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MqttLink {
    pub fn start(cfg: &MqttConfig, events: mpsc::UnboundedSender<ControlEvent>) -> Self {
        let options = mqtt_options(cfg, Utc::now().timestamp());
        info!("Connecting to MQTT broker {}:{}", cfg.broker, cfg.port);
        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_QUEUE);
        let subscriber = client.clone();
        let (stop_tx, mut stop_rx) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = eventloop.poll() => match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            for topic in COMMAND_TOPICS {
                                if let Err(e) = subscriber.try_subscribe(topic, QoS::AtMostOnce) {
                                    error!("Failed to subscribe to {}: {}", topic, e);
                                }
                            }
                            info!("Subscribed to flip/* topics");
                        }
                        Ok(Event::Incoming(Packet::Publish(p))) => {
                            let message = RemoteMessage::new(p.topic.clone(), p.payload.to_vec());
                            if events.send(ControlEvent::Remote(message)).is_err() {
                                info!("MQTT: event queue closed. Exiting.");
                                break;
                            }
                        }
                        Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                            info!("MQTT disconnect sent.");
                            break;
                        }
                        Ok(other) => debug!("MQTT event: {:?}", other),
                        Err(e) => {
                            warn!("MQTT connection error: {}", e);
                            tokio::time::sleep(RECONNECT_DELAY).await;
                        }
                    },
                    _ = stop_rx.recv() => {
                        info!("MQTT loop received stop signal. Exiting.");
                        break;
                    }
                }
            }
        });

        Self { client, stop_sender: Some(stop_tx), handle: Some(handle) }
    }

    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher { client: self.client.clone() }
    }

    /// Announce offline, disconnect, and wait (bounded) for the loop to finish
    pub async fn shutdown(&mut self, wait: Duration) {
        let offline = PresenceMessage::offline(Utc::now().timestamp()).to_outbound();
        if let Err(e) = self.publisher().publish(&offline) {
            warn!("Failed to queue offline status: {}", e);
        }
        if let Err(e) = self.client.disconnect().await {
            warn!("Failed to queue MQTT disconnect: {}", e);
        }
        if let Some(mut handle) = self.handle.take() {
            if tokio::time::timeout(wait, &mut handle).await.is_err() {
                warn!("MQTT loop did not finish in {:?}, stopping it", wait);
                if let Some(sender) = self.stop_sender.take() {
                    let _ = sender.send(()).await;
                }
                handle.await.unwrap_or_else(|e| error!("MQTT loop failed to join: {}", e));
            }
        }
        self.stop_sender = None;
        info!("MQTT stopped.");
    }
}

impl Drop for MqttLink {
    fn drop(&mut self) {
        if let Some(sender) = self.stop_sender.take() {
            let _ = sender.try_send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_carry_offline_will() {
        let cfg = MqttConfig { username: Some("u".into()), password: Some("p".into()), ..MqttConfig::default() };
        let options = mqtt_options(&cfg, 1_700_000_000);
        assert_eq!(options.client_id(), "flipdisc-manager_1700000000");
        let will = options.last_will().unwrap();
        assert_eq!(will.topic, STATUS_TOPIC);
        assert!(will.retain);
        assert_eq!(will.qos, QoS::AtLeastOnce);
        assert_eq!(&will.message[..], br#"{"status":"offline","timestamp":1700000000}"#);
    }
}
