//! Color sensor port - register-level access to an RGBC light sensor
//!
//! This port hides bus transaction mechanics (addressing, command framing,
//! transport errors) from the measurement controller. The controller only
//! knows which configuration register it wants to write and that a burst
//! of eight bytes holds the four channel counts.

use core::future::Future;

use embassy_time::Duration;

use crate::domain::exposure::{Gain, IntegrationTime};
use crate::domain::readout::BURST_LEN;
use crate::domain::CalibrationConfig;

/// Configuration registers written by the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigRegister {
    /// Power and ADC enable bits
    Enable,
    /// ATIME, integration time
    IntegrationTime,
    /// CONTROL, analog gain
    Gain,
}

/// Port trait for four-channel RGBC sensors
///
/// # Example Implementation
///
/// ```ignore
/// impl<I: I2c> ColorSensorPort for Tcs34725Adapter<I> {
///     async fn read_channels(&mut self) -> Result<[u8; 8], ColorSensorError> {
///         let mut data = [0u8; 8];
///         self.i2c
///             .write_read(self.address, &[COMMAND_BIT | REGISTER_CDATAL], &mut data)
///             .await
///             .map_err(|_| ColorSensorError::ReadFailed)?;
///         Ok(data)
///     }
///     // ...
/// }
/// ```
pub trait ColorSensorPort {
    /// Read the device identification register
    fn read_id(&mut self) -> impl Future<Output = Result<u8, ColorSensorError>>;

    /// Burst-read the four channels: clear, red, green, blue, each
    /// 16-bit little-endian
    fn read_channels(&mut self) -> impl Future<Output = Result<[u8; BURST_LEN], ColorSensorError>>;

    /// Write a single configuration register
    fn write_register(
        &mut self,
        register: ConfigRegister,
        value: u8,
    ) -> impl Future<Output = Result<(), ColorSensorError>>;
}

/// Errors that can occur during color sensor operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorSensorError {
    /// Channel or ID read failed on the bus
    ReadFailed,
    /// Register write failed on the bus
    WriteFailed,
    /// Sensor did not answer during setup
    NotDetected,
    /// Measurement requested before a successful setup
    NotInitialized,
    /// Invalid configuration parameter
    InvalidConfig,
}

impl ColorSensorError {
    /// Short description for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            ColorSensorError::ReadFailed => "read failed",
            ColorSensorError::WriteFailed => "write failed",
            ColorSensorError::NotDetected => "not detected",
            ColorSensorError::NotInitialized => "not initialized",
            ColorSensorError::InvalidConfig => "invalid config",
        }
    }
}

/// Color sensor configuration
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ColorSensorConfig {
    /// Integration time preset, or auto-exposure
    pub integration_time: IntegrationTime,
    /// Initial analog gain
    pub gain: Gain,
    /// Glass attenuation factor, `1 / transmissivity` of the cover
    pub glass_attenuation: f32,
    /// How often the caller should run a measurement cycle
    pub update_interval: Duration,
}

impl Default for ColorSensorConfig {
    fn default() -> Self {
        Self {
            integration_time: IntegrationTime::Auto,
            gain: Gain::X1,
            glass_attenuation: 1.0,
            update_interval: Duration::from_secs(60),
        }
    }
}

impl ColorSensorConfig {
    /// Fixed exposure, auto-exposure disabled
    pub fn fixed(integration_time: IntegrationTime, gain: Gain) -> Self {
        Self {
            integration_time,
            gain,
            ..Self::default()
        }
    }

    /// Validated calibration derived from this configuration
    pub fn calibration(&self) -> Result<CalibrationConfig, ColorSensorError> {
        CalibrationConfig::new(self.glass_attenuation).ok_or(ColorSensorError::InvalidConfig)
    }
}
