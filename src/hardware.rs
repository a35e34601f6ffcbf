/*
 *  hardware.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Raspberry Pi bindings: RS-485 UART, buttons, I2C sensors
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

use std::io;
use std::time::{Duration, Instant};

use linux_embedded_hal::I2cdev;
use log::{debug, error, info, warn};
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use rppal::uart::{Parity, Uart};

use crate::config::{DisplayConfig, InputConfig};
use crate::display::WriterSink;
use crate::error::{InputError, TransportError};
use crate::input::{AnalogSource, InputBridge, InputEvent, InputPollers};
use crate::sensors::{Ads1015Slider, SliderCalibration, Vl6180xDistance};

/// RS-485 transmitter: the UART plus its driver-enable line, held high
/// for as long as the port is open.
pub struct Rs485Port {
    uart: Uart,
    enable: OutputPin,
}

impl io::Write for Rs485Port {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.uart.write(buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.uart.drain().map_err(io::Error::other)
    }
}

impl Drop for Rs485Port {
    fn drop(&mut self) {
        self.enable.set_low();
    }
}

pub fn open_uart(cfg: &DisplayConfig) -> Result<WriterSink<Rs485Port>, TransportError> {
    let gpio = Gpio::new().map_err(|e| TransportError::Gpio(e.to_string()))?;
    let mut enable = gpio
        .get(cfg.rs485_enable_pin)
        .map_err(|e| TransportError::Gpio(e.to_string()))?
        .into_output();
    enable.set_high();

    let mut uart = Uart::with_path(&cfg.serial_port, cfg.baud_rate, Parity::None, 8, 1)
        .map_err(|e| TransportError::Serial(e.to_string()))?;
    uart.set_write_mode(true).map_err(|e| TransportError::Serial(e.to_string()))?;
    info!("RS-485 on {} at {} baud, EN on GPIO{}", cfg.serial_port, cfg.baud_rate, cfg.rs485_enable_pin);

    Ok(WriterSink::new(cfg.serial_port.clone(), Rs485Port { uart, enable }))
}

/// Push buttons on pulled-up inputs; pins stay registered while held.
pub struct Buttons {
    _pins: Vec<InputPin>,
}

fn watch_button(gpio: &Gpio, pin: u8, debounce: Duration, bridge: InputBridge, event: InputEvent) -> Result<InputPin, InputError> {
    let mut input = gpio
        .get(pin)
        .map_err(|e| InputError::Gpio(e.to_string()))?
        .into_input_pullup();
    let mut last_press: Option<Instant> = None;
    input
        .set_async_interrupt(Trigger::FallingEdge, move |level: Level| {
            let now = Instant::now();
            if last_press.is_some_and(|t| now.duration_since(t) < debounce) {
                return;
            }
            last_press = Some(now);
            debug!("GPIO{} {:?} -> {:?}", pin, level, event);
            bridge.emit(event);
        })
        .map_err(|e| InputError::Gpio(e.to_string()))?;
    Ok(input)
}

impl Buttons {
    pub fn start(cfg: &InputConfig, bridge: &InputBridge) -> Result<Self, InputError> {
        let gpio = Gpio::new().map_err(|e| InputError::Gpio(e.to_string()))?;
        let debounce = Duration::from_millis(cfg.debounce_ms);
        let pins = vec![
            watch_button(&gpio, cfg.primary_button_pin, debounce, bridge.clone(), InputEvent::Primary)?,
            watch_button(&gpio, cfg.secondary_button_pin, debounce, bridge.clone(), InputEvent::Secondary)?,
        ];
        info!(
            "Buttons on GPIO{} (primary) and GPIO{} (secondary)",
            cfg.primary_button_pin, cfg.secondary_button_pin
        );
        Ok(Self { _pins: pins })
    }
}

fn open_bus(bus: u8) -> Result<I2cdev, InputError> {
    let path = format!("/dev/i2c-{}", bus);
    I2cdev::new(&path).map_err(|e| InputError::I2c(format!("{}: {}", path, e)))
}

/// Start a poller for each sensor that answers; a missing sensor is
/// logged and skipped.
pub fn spawn_sensor_pollers(cfg: &InputConfig, bridge: &InputBridge, pollers: &mut InputPollers) {
    let calibration = SliderCalibration { raw_at_0: cfg.slider_raw_at_0, raw_at_100: cfg.slider_raw_at_100 };
    let slider = open_bus(cfg.i2c_bus).and_then(|bus| Ads1015Slider::new(bus, calibration));
    let distance = open_bus(cfg.i2c_bus).and_then(Vl6180xDistance::new);

    let sources: Vec<(&str, Result<Box<dyn AnalogSource>, InputError>)> = vec![
        ("slider", slider.map(|s| Box::new(s) as Box<dyn AnalogSource>)),
        ("distance sensor", distance.map(|s| Box::new(s) as Box<dyn AnalogSource>)),
    ];
    for (name, source) in sources {
        match source {
            Ok(source) => pollers.spawn(source, cfg.poll_interval(), bridge.clone()),
            Err(InputError::I2c(e)) => warn!("No {} on the I2C bus: {}", name, e),
            Err(e) => error!("Failed to start {}: {}", name, e),
        }
    }
}
