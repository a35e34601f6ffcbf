/*
 *  sensors.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  I2C analog sources: ADS1015 slider and VL6180X distance sensor
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

use embedded_hal::i2c::I2c;
use log::{debug, info};

use crate::error::InputError;
use crate::input::{AnalogSource, ValueSource};

pub const ADS1015_ADDRESS: u8 = 0x48;
pub const VL6180X_ADDRESS: u8 = 0x29;

const ADS_REG_CONVERSION: u8 = 0x00;
const ADS_REG_CONFIG: u8 = 0x01;
/// AIN0 vs GND, +/-4.096 V, continuous, 1600 SPS, comparator off
const ADS_CONFIG_AIN0_CONTINUOUS: [u8; 2] = [0xC2, 0x83];

fn bus_err<E: core::fmt::Debug>(e: E) -> InputError {
    InputError::I2c(format!("{:?}", e))
}

/// Two-point linear calibration from raw ADC counts to 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliderCalibration {
    pub raw_at_0: i32,
    pub raw_at_100: i32,
}

impl SliderCalibration {
    /// Truncates toward zero then clamps, so the ends are reachable
    pub fn percent(&self, raw: i32) -> i32 {
        let span = (self.raw_at_100 - self.raw_at_0) as f64;
        if span == 0.0 {
            return 0;
        }
        let pct = (100.0 * ((raw - self.raw_at_0) as f64 / span)) as i32;
        pct.clamp(0, 100)
    }
}

/// Slide potentiometer on ADS1015 channel 0
pub struct Ads1015Slider<I> {
    bus: I,
    calibration: SliderCalibration,
}

impl<I: I2c> Ads1015Slider<I> {
    pub fn new(mut bus: I, calibration: SliderCalibration) -> Result<Self, InputError> {
        let [hi, lo] = ADS_CONFIG_AIN0_CONTINUOUS;
        bus.write(ADS1015_ADDRESS, &[ADS_REG_CONFIG, hi, lo]).map_err(bus_err)?;
        info!("ADS1015 slider configured at 0x{:02x}", ADS1015_ADDRESS);
        Ok(Self { bus, calibration })
    }

    /// Conversion register in 16-bit scale (12-bit result, left aligned)
    pub fn read_raw(&mut self) -> Result<i32, InputError> {
        let mut buf = [0u8; 2];
        self.bus
            .write_read(ADS1015_ADDRESS, &[ADS_REG_CONVERSION], &mut buf)
            .map_err(bus_err)?;
        Ok(i16::from_be_bytes(buf) as i32)
    }
}

impl<I: I2c + Send> AnalogSource for Ads1015Slider<I> {
    fn source(&self) -> ValueSource {
        ValueSource::Slider
    }

    fn read(&mut self) -> Result<i32, InputError> {
        let raw = self.read_raw()?;
        Ok(self.calibration.percent(raw))
    }
}

mod vl6180x_reg {
    pub const FRESH_OUT_OF_RESET: u16 = 0x016;
    pub const SYSRANGE_START: u16 = 0x018;
    pub const INTERRUPT_CLEAR: u16 = 0x015;
    pub const RANGE_STATUS: u16 = 0x04D;
    pub const INTERRUPT_STATUS_GPIO: u16 = 0x04F;
    pub const RANGE_VAL: u16 = 0x062;
}

/// Tuning writes required after power-up (ST application note AN4545)
const VL6180X_SETTINGS: [(u16, u8); 39] = [
    (0x0207, 0x01), (0x0208, 0x01), (0x0096, 0x00), (0x0097, 0xfd),
    (0x00e3, 0x00), (0x00e4, 0x04), (0x00e5, 0x02), (0x00e6, 0x01),
    (0x00e7, 0x03), (0x00f5, 0x02), (0x00d9, 0x05), (0x00db, 0xce),
    (0x00dc, 0x03), (0x00dd, 0xf8), (0x009f, 0x00), (0x00a3, 0x3c),
    (0x00b7, 0x00), (0x00bb, 0x3c), (0x00b2, 0x09), (0x00ca, 0x09),
    (0x0198, 0x01), (0x01b0, 0x17), (0x01ad, 0x00), (0x00ff, 0x05),
    (0x0100, 0x05), (0x0199, 0x05), (0x01a6, 0x1b), (0x01ac, 0x3e),
    (0x01a7, 0x1f), (0x0030, 0x00),
    // public defaults
    (0x0011, 0x10), (0x010a, 0x30), (0x003f, 0x46), (0x0031, 0xff),
    (0x0040, 0x63), (0x002e, 0x01), (0x001b, 0x09), (0x003e, 0x31),
    (0x0014, 0x24),
];

const RANGE_POLL_LIMIT: usize = 200;

/// Time-of-flight proximity sensor, reported as range in mm x10
pub struct Vl6180xDistance<I> {
    bus: I,
}

impl<I: I2c> Vl6180xDistance<I> {
    pub fn new(bus: I) -> Result<Self, InputError> {
        let mut sensor = Self { bus };
        if sensor.read_reg(vl6180x_reg::FRESH_OUT_OF_RESET)? == 1 {
            for &(reg, value) in VL6180X_SETTINGS.iter() {
                sensor.write_reg(reg, value)?;
            }
            sensor.write_reg(vl6180x_reg::FRESH_OUT_OF_RESET, 0)?;
            debug!("VL6180X tuning settings loaded");
        }
        info!("VL6180X distance sensor ready at 0x{:02x}", VL6180X_ADDRESS);
        Ok(sensor)
    }

    fn write_reg(&mut self, reg: u16, value: u8) -> Result<(), InputError> {
        let [hi, lo] = reg.to_be_bytes();
        self.bus.write(VL6180X_ADDRESS, &[hi, lo, value]).map_err(bus_err)
    }

    fn read_reg(&mut self, reg: u16) -> Result<u8, InputError> {
        let mut buf = [0u8; 1];
        self.bus
            .write_read(VL6180X_ADDRESS, &reg.to_be_bytes(), &mut buf)
            .map_err(bus_err)?;
        Ok(buf[0])
    }

    /// One single-shot range measurement in mm
    pub fn range_mm(&mut self) -> Result<u8, InputError> {
        if !(0..RANGE_POLL_LIMIT).any(|_| matches!(self.read_reg(vl6180x_reg::RANGE_STATUS), Ok(s) if s & 0x01 == 0x01)) {
            return Err(InputError::NotReady("VL6180X not ready to range".into()));
        }
        self.write_reg(vl6180x_reg::SYSRANGE_START, 0x01)?;

        let mut done = false;
        for _ in 0..RANGE_POLL_LIMIT {
            if self.read_reg(vl6180x_reg::INTERRUPT_STATUS_GPIO)? & 0x07 == 0x04 {
                done = true;
                break;
            }
        }
        if !done {
            return Err(InputError::NotReady("VL6180X range timed out".into()));
        }

        let range = self.read_reg(vl6180x_reg::RANGE_VAL)?;
        self.write_reg(vl6180x_reg::INTERRUPT_CLEAR, 0x07)?;
        Ok(range)
    }
}

impl<I: I2c + Send> AnalogSource for Vl6180xDistance<I> {
    fn source(&self) -> ValueSource {
        ValueSource::Distance
    }

    fn read(&mut self) -> Result<i32, InputError> {
        Ok(self.range_mm()? as i32 * 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
    use std::collections::HashMap;

    /// Register-file fake: 8-bit register pointers for the ADC,
    /// 16-bit for the ToF sensor
    #[derive(Default)]
    struct FakeBus {
        regs: HashMap<(u8, u16), Vec<u8>>,
        writes: Vec<(u8, Vec<u8>)>,
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
            let mut pointer: Option<u16> = None;
            for op in operations.iter_mut() {
                match op {
                    Operation::Write(bytes) => {
                        self.writes.push((address, bytes.to_vec()));
                        pointer = Some(match (address, bytes.len()) {
                            (VL6180X_ADDRESS, n) if n >= 2 => u16::from_be_bytes([bytes[0], bytes[1]]),
                            _ => bytes[0] as u16,
                        });
                        if address == VL6180X_ADDRESS && bytes.len() == 3 {
                            let reg = u16::from_be_bytes([bytes[0], bytes[1]]);
                            self.regs.insert((address, reg), vec![bytes[2]]);
                        }
                    }
                    Operation::Read(buf) => {
                        let reg = pointer.ok_or(ErrorKind::Other)?;
                        let value = self.regs.get(&(address, reg)).ok_or(ErrorKind::Other)?;
                        buf.copy_from_slice(&value[..buf.len()]);
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_slider_calibration_clamps() {
        let cal = SliderCalibration { raw_at_0: 26380, raw_at_100: 13500 };
        assert_eq!(cal.percent(26380), 0);
        assert_eq!(cal.percent(13500), 100);
        assert_eq!(cal.percent(19940), 50);
        assert_eq!(cal.percent(30000), 0);
        assert_eq!(cal.percent(1000), 100);
    }

    #[test]
    fn test_ads1015_configures_and_reads_percent() {
        let mut bus = FakeBus::default();
        bus.regs.insert((ADS1015_ADDRESS, 0x00), 19940i16.to_be_bytes().to_vec());
        let cal = SliderCalibration { raw_at_0: 26380, raw_at_100: 13500 };
        let mut slider = Ads1015Slider::new(bus, cal).unwrap();
        assert_eq!(slider.bus.writes[0], (ADS1015_ADDRESS, vec![0x01, 0xC2, 0x83]));
        assert_eq!(slider.read().unwrap(), 50);
    }

    #[test]
    fn test_vl6180x_loads_settings_and_ranges() {
        let mut bus = FakeBus::default();
        bus.regs.insert((VL6180X_ADDRESS, 0x016), vec![1]);
        bus.regs.insert((VL6180X_ADDRESS, 0x04D), vec![0x01]);
        bus.regs.insert((VL6180X_ADDRESS, 0x04F), vec![0x04]);
        bus.regs.insert((VL6180X_ADDRESS, 0x062), vec![42]);

        let mut tof = Vl6180xDistance::new(bus).unwrap();
        assert_eq!(tof.bus.regs[&(VL6180X_ADDRESS, 0x016)], vec![0]);
        assert_eq!(tof.read().unwrap(), 420);
        // interrupt cleared after the read
        assert_eq!(tof.bus.regs[&(VL6180X_ADDRESS, 0x015)], vec![0x07]);
    }

    #[test]
    fn test_vl6180x_not_ready() {
        let mut bus = FakeBus::default();
        bus.regs.insert((VL6180X_ADDRESS, 0x016), vec![0]);
        bus.regs.insert((VL6180X_ADDRESS, 0x04D), vec![0x00]);
        let mut tof = Vl6180xDistance::new(bus).unwrap();
        assert!(matches!(tof.read(), Err(InputError::NotReady(_))));
    }
}
