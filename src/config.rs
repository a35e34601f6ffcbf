/*
 *  config.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Layered configuration: defaults, YAML file, environment, command line
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

use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use dirs_next::{data_local_dir, home_dir};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::constants::*;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every group is filled from defaults, so a
/// YAML file only needs the keys it wants to change.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub display: DisplayConfig,
    pub mqtt: MqttConfig,
    pub sketchpad: SketchpadConfig,
    pub inputs: InputConfig,
}

/// Where encoded frames go
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Raspberry Pi UART with the RS-485 enable pin (feature `hardware`)
    Uart,
    /// Write frames to `serial_port` as a plain file (pre-configured tty, pipe)
    File,
    /// Log frames only
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub sink: SinkKind,
    pub serial_port: String,
    pub baud_rate: u32,
    pub inter_frame_delay_ms: u64,
    pub fps: u32,
    /// rotate output 180 degrees
    pub flip: bool,
    pub rs485_enable_pin: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Uart,
            serial_port: SERIAL_PORT_NAME.to_string(),
            baud_rate: SERIAL_BAUDRATE,
            inter_frame_delay_ms: INTER_FRAME_DELAY_MS,
            fps: TARGET_FPS,
            flip: false,
            rs485_enable_pin: PIN_EN_485,
        }
    }
}

impl DisplayConfig {
    pub fn inter_frame_delay(&self) -> Duration {
        Duration::from_millis(self.inter_frame_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MqttConfig {
    pub enabled: bool,
    pub broker: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id_prefix: String,
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            broker: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id_prefix: "flipdisc-manager".to_string(),
            keep_alive_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SketchpadConfig {
    /// base address encoded in the QR code, `?t=<token>` is appended
    pub url: String,
    pub token_folder: PathBuf,
    pub token_ttl_secs: u64,
    pub drawing_timeout_secs: u64,
}

impl Default for SketchpadConfig {
    fn default() -> Self {
        let token_folder = data_local_dir()
            .map(|d| d.join("flipframe").join("tokens"))
            .unwrap_or_else(|| PathBuf::from("tokens"));
        Self {
            url: SKETCHPAD_URL.to_string(),
            token_folder,
            token_ttl_secs: TOKEN_TTL_SECS,
            drawing_timeout_secs: DRAWING_TIMEOUT_SECS,
        }
    }
}

impl SketchpadConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn drawing_timeout(&self) -> Duration {
        Duration::from_secs(self.drawing_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub enabled: bool,
    pub poll_interval_ms: u64,
    pub primary_button_pin: u8,
    pub secondary_button_pin: u8,
    pub debounce_ms: u64,
    pub i2c_bus: u8,
    pub slider_raw_at_0: i32,
    pub slider_raw_at_100: i32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: INPUT_POLL_MS,
            primary_button_pin: PIN_BUTTON_YELLOW,
            secondary_button_pin: PIN_BUTTON_RED,
            debounce_ms: BUTTON_DEBOUNCE_MS,
            i2c_bus: 1,
            slider_raw_at_0: ADS_SLIDER_PCT_0_RAW,
            slider_raw_at_100: ADS_SLIDER_PCT_100_RAW,
        }
    }
}

impl InputConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "flipframe", version, about = "Flip-disc frame controller", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// shorthand for --log-level debug
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long, value_enum)]
    pub sink: Option<SinkKind>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub serial_port: Option<String>,
    #[arg(long)]
    pub fps: Option<u32>,
    /// rotate the output 180 degrees
    #[arg(long, action = ArgAction::SetTrue)]
    pub flip: bool,
    #[arg(long)]
    pub mqtt_broker: Option<String>,
    #[arg(long)]
    pub mqtt_port: Option<u16>,
    /// run without the broker connection
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_mqtt: bool,
    /// skip local buttons and sensors
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_inputs: bool,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub token_folder: Option<PathBuf>,
    #[arg(long)]
    pub sketchpad_url: Option<String>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: read YAML, apply environment and CLI, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    // 2) YAML file (explicit path or search)
    let mut cfg = if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            read_yaml(p)?
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        read_yaml(&p)?
    } else {
        Config::default()
    };

    // 3) environment
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;

    // 4) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    validate(&cfg)?;
    Ok(cfg)
}

/// Pretty YAML of effective config, for --dump-config
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/flipframe/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/flipframe.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["flipframe.yaml", "config.yaml", "config/flipframe.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    if s.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(s)?)
}

/// Broker settings may come from the environment, as deployed units do
fn apply_env_overrides<F>(cfg: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("MQTT_BROKER_ADDRESS") { cfg.mqtt.broker = v; }
    if let Some(v) = lookup("MQTT_BROKER_PORT") {
        cfg.mqtt.port = v.trim().parse().map_err(|_| {
            ConfigError::Validation(format!("MQTT_BROKER_PORT is not a port number: {}", v))
        })?;
    }
    if let Some(v) = lookup("MQTT_USERNAME") { cfg.mqtt.username = Some(v); }
    if let Some(v) = lookup("MQTT_PASSWORD") { cfg.mqtt.password = Some(v); }
    Ok(())
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                     { cfg.log_level = Some("debug".into()); }
    if let Some(s) = cli.sink        { cfg.display.sink = s; }
    if let Some(p) = &cli.serial_port { cfg.display.serial_port = p.clone(); }
    if let Some(f) = cli.fps         { cfg.display.fps = f; }
    if cli.flip                      { cfg.display.flip = true; }
    if let Some(b) = &cli.mqtt_broker { cfg.mqtt.broker = b.clone(); }
    if let Some(p) = cli.mqtt_port   { cfg.mqtt.port = p; }
    if cli.no_mqtt                   { cfg.mqtt.enabled = false; }
    if cli.no_inputs                 { cfg.inputs.enabled = false; }
    if let Some(t) = &cli.token_folder { cfg.sketchpad.token_folder = t.clone(); }
    if let Some(u) = &cli.sketchpad_url { cfg.sketchpad.url = u.clone(); }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.display.fps == 0 {
        return Err(ConfigError::Validation("display fps must be > 0".into()));
    }
    if cfg.display.sink != SinkKind::Log && cfg.display.serial_port.trim().is_empty() {
        return Err(ConfigError::Validation("display serial_port must not be empty".into()));
    }
    if cfg.mqtt.enabled {
        if cfg.mqtt.broker.trim().is_empty() {
            return Err(ConfigError::Validation("mqtt broker must not be empty".into()));
        }
        if cfg.mqtt.port == 0 {
            return Err(ConfigError::Validation("mqtt port must be > 0".into()));
        }
    }
    if cfg.inputs.poll_interval_ms == 0 {
        return Err(ConfigError::Validation("inputs poll_interval_ms must be > 0".into()));
    }
    if cfg.inputs.slider_raw_at_0 == cfg.inputs.slider_raw_at_100 {
        return Err(ConfigError::Validation("slider calibration points must differ".into()));
    }
    if cfg.sketchpad.token_ttl_secs == 0 {
        return Err(ConfigError::Validation("sketchpad token_ttl_secs must be > 0".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_device() {
        let cfg = Config::default();
        assert_eq!(cfg.display.baud_rate, 19200);
        assert_eq!(cfg.display.fps, 30);
        assert_eq!(cfg.display.inter_frame_delay_ms, 10);
        assert_eq!(cfg.mqtt.port, 1883);
        assert_eq!(cfg.sketchpad.drawing_timeout_secs, 300);
        assert_eq!(cfg.inputs.primary_button_pin, 12);
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let cfg = parse_yaml("display:\n  fps: 12\n  flip: true\nmqtt:\n  broker: broker.lan\n").unwrap();
        assert_eq!(cfg.display.fps, 12);
        assert!(cfg.display.flip);
        assert_eq!(cfg.display.baud_rate, 19200);
        assert_eq!(cfg.mqtt.broker, "broker.lan");
        assert_eq!(cfg.mqtt.port, 1883);
    }

    #[test]
    fn test_env_then_cli_precedence() {
        let mut cfg = Config::default();
        let env: HashMap<&str, &str> =
            [("MQTT_BROKER_ADDRESS", "env-host"), ("MQTT_BROKER_PORT", "1999"), ("MQTT_USERNAME", "u")].into();
        apply_env_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.mqtt.broker, "env-host");
        assert_eq!(cfg.mqtt.port, 1999);
        assert_eq!(cfg.mqtt.username.as_deref(), Some("u"));

        let cli = Cli { mqtt_broker: Some("cli-host".into()), no_inputs: true, ..Cli::default() };
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.mqtt.broker, "cli-host");
        assert_eq!(cfg.mqtt.port, 1999);
        assert!(!cfg.inputs.enabled);
    }

    #[test]
    fn test_bad_env_port_rejected() {
        let mut cfg = Config::default();
        let r = apply_env_overrides(&mut cfg, |k| (k == "MQTT_BROKER_PORT").then(|| "abc".to_string()));
        assert!(matches!(r, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation() {
        let mut cfg = Config::default();
        cfg.display.fps = 0;
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.inputs.poll_interval_ms = 0;
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.display.serial_port = " ".into();
        assert!(validate(&cfg).is_err());
        cfg.display.sink = SinkKind::Log;
        assert!(validate(&cfg).is_ok());

        let mut cfg = Config::default();
        cfg.mqtt.port = 0;
        assert!(validate(&cfg).is_err());
        cfg.mqtt.enabled = false;
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_dump_is_reloadable() {
        let cfg = Config::default();
        let s = dump(&cfg).unwrap();
        assert_eq!(parse_yaml(&s).unwrap(), cfg);
    }
}
