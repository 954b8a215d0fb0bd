//! Measurement controller
//!
//! Drives one RGBC sensor through the `ColorSensorPort`: the power-up
//! sequence and the periodic measurement cycle with auto-exposure. The
//! caller owns scheduling and calls [`LightSensorController::update`] once
//! per tick; at most one cycle is in flight at a time.

use embassy_time::{Duration, Instant};
use embedded_hal_async::delay::DelayNs;

use crate::domain::auto_exposure::{self, Retune};
use crate::domain::{CalibrationConfig, ExposureState, PhotometricResult, RawReadout};
use crate::ports::color_sensor::{
    ColorSensorConfig, ColorSensorError, ColorSensorPort, ConfigRegister,
};

/// ENABLE: PON, internal oscillator on
const ENABLE_POWER_ON: u8 = 0x01;
/// ENABLE: PON | AEN, RGBC ADC running
const ENABLE_POWER_ON_ADC: u8 = 0x03;
/// Oscillator warm-up between PON and AEN
const POWER_ON_DELAY_MS: u32 = 3;

/// Device health as seen by the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorHealth {
    /// Setup has not run yet
    Uninitialized,
    /// Last cycle completed without bus errors
    Ready,
    /// Last cycle hit a bus error; the next tick retries
    Warning,
    /// Setup failed
    Failed,
}

/// How the exposure retune of a cycle went
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetuneStatus {
    /// Auto-exposure is off
    Disabled,
    /// Register and gain already optimal, nothing written
    Unchanged,
    /// Exposure written to the device, either a new one or a repeat of a
    /// failed write
    Applied,
    /// Writing the exposure failed. The new exposure is still used for the
    /// next cycle's computation and the write is repeated next cycle.
    WriteFailed(ColorSensorError),
}

/// Everything one measurement cycle produced
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    /// Raw counts of this cycle
    pub raw: RawReadout,
    /// Percentages, illuminance and color temperature
    pub result: PhotometricResult,
    /// Whether illuminance and color temperature should be published
    pub publish_photometry: bool,
    /// Exposure in effect for the next cycle
    pub exposure: ExposureState,
    /// Outcome of the auto-exposure retune
    pub retune: RetuneStatus,
    /// Time spent in the burst read
    pub read_duration: Duration,
}

/// Measurement controller for one RGBC sensor
pub struct LightSensorController<P: ColorSensorPort> {
    port: P,
    exposure: ExposureState,
    calibration: CalibrationConfig,
    health: SensorHealth,
    last_result: Option<PhotometricResult>,
    update_interval: Duration,
    /// The last exposure write failed; the device may still run the
    /// previous exposure
    write_pending: bool,
}

impl<P: ColorSensorPort> LightSensorController<P> {
    /// Create a controller. Nothing is written to the device until
    /// [`setup`](Self::setup).
    pub fn new(port: P, config: &ColorSensorConfig) -> Result<Self, ColorSensorError> {
        let calibration = config.calibration()?;
        let exposure = ExposureState::new(config.integration_time, config.gain);
        info!("Integration time set to: {} ms", exposure.time_ms);

        Ok(Self {
            port,
            exposure,
            calibration,
            health: SensorHealth::Uninitialized,
            last_result: None,
            update_interval: config.update_interval,
            write_pending: false,
        })
    }

    /// Power up the sensor and write the initial exposure.
    pub async fn setup(&mut self, delay: &mut impl DelayNs) -> Result<(), ColorSensorError> {
        info!("Setting up TCS34725...");
        match self.power_up(delay).await {
            Ok(()) => {
                self.health = SensorHealth::Ready;
                Ok(())
            }
            Err(e) => {
                error!("TCS34725 setup failed: {}", e.as_str());
                self.health = SensorHealth::Failed;
                Err(e)
            }
        }
    }

    async fn power_up(&mut self, delay: &mut impl DelayNs) -> Result<(), ColorSensorError> {
        let id = self
            .port
            .read_id()
            .await
            .map_err(|_| ColorSensorError::NotDetected)?;
        debug!("TCS34725 ID: {}", id);

        let exposure = self.exposure;
        self.write_exposure(&exposure).await?;
        self.port
            .write_register(ConfigRegister::Enable, ENABLE_POWER_ON)
            .await?;
        delay.delay_ms(POWER_ON_DELAY_MS).await;
        self.port
            .write_register(ConfigRegister::Enable, ENABLE_POWER_ON_ADC)
            .await
    }

    /// Run one measurement cycle.
    ///
    /// A failed channel read aborts the cycle and leaves the exposure
    /// untouched. A failed exposure write does not: the retuned exposure
    /// is kept, the failure is reported in [`CycleReport::retune`] and the
    /// write is repeated every cycle until it succeeds. Illuminance and
    /// color temperature of a readout taken while a write is outstanding
    /// are not publishable.
    pub async fn update(&mut self) -> Result<CycleReport, ColorSensorError> {
        if matches!(
            self.health,
            SensorHealth::Uninitialized | SensorHealth::Failed
        ) {
            return Err(ColorSensorError::NotInitialized);
        }

        let start = Instant::now();
        let data = match self.port.read_channels().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Error reading TCS34725 sensor data");
                self.health = SensorHealth::Warning;
                return Err(e);
            }
        };
        let read_duration = start.elapsed();
        debug!("I2C read took {} ms", read_duration.as_millis());

        let raw = RawReadout::from_le_bytes(data);
        trace!(
            "Raw values - Red: {}, Green: {}, Blue: {}, Clear: {}",
            raw.red,
            raw.green,
            raw.blue,
            raw.clear
        );

        let step = auto_exposure::step(
            &self.exposure,
            &raw,
            &self.calibration,
            self.exposure.auto_exposure,
        );

        let percentages = step.result.percentages;
        debug!(
            "RGBC values - Red: {}%, Green: {}%, Blue: {}%, Clear: {}% | Illuminance: {} lx, Color Temp: {} K",
            percentages.red,
            percentages.green,
            percentages.blue,
            percentages.clear,
            step.result.illuminance_or_nan(),
            step.result.color_temperature_or_nan()
        );

        // The device may not have integrated with `self.exposure`
        let exposure_uncertain = self.write_pending;

        let retune = match step.retune {
            None => RetuneStatus::Disabled,
            Some(Retune { changed: false, .. }) if !self.write_pending => RetuneStatus::Unchanged,
            Some(Retune { next, changed, .. }) => {
                // Adopted before the write completes
                if changed {
                    self.exposure = next;
                }
                let exposure = self.exposure;
                match self.write_exposure(&exposure).await {
                    Ok(()) => {
                        self.write_pending = false;
                        RetuneStatus::Applied
                    }
                    Err(e) => {
                        warn!("TCS34725 update timing failed!");
                        self.write_pending = true;
                        RetuneStatus::WriteFailed(e)
                    }
                }
            }
        };

        self.health = if self.write_pending {
            SensorHealth::Warning
        } else {
            SensorHealth::Ready
        };
        self.last_result = Some(step.result);

        Ok(CycleReport {
            raw,
            result: step.result,
            publish_photometry: step.publish_photometry && !exposure_uncertain,
            exposure: self.exposure,
            retune,
            read_duration,
        })
    }

    async fn write_exposure(&mut self, exposure: &ExposureState) -> Result<(), ColorSensorError> {
        self.port
            .write_register(ConfigRegister::IntegrationTime, exposure.integration_reg)
            .await?;
        self.port
            .write_register(ConfigRegister::Gain, exposure.gain.ordinal())
            .await
    }

    /// Log configuration and the most recent values
    pub fn log_config(&self) {
        info!("TCS34725:");
        info!(
            "  Integration time: {} ms (register {}), auto: {}",
            self.exposure.time_ms,
            self.exposure.integration_reg,
            self.exposure.auto_exposure
        );
        info!("  Gain: {}x", self.exposure.gain_multiplier());
        info!("  Update interval: {} ms", self.update_interval.as_millis());
        info!(
            "  Glass attenuation: {}",
            self.calibration.glass_attenuation
        );
        if self.health == SensorHealth::Failed {
            error!("Communication with TCS34725 failed!");
        }
        if let Some(result) = self.last_result {
            info!(
                "RGBC values - Red: {}, Green: {}, Blue: {}, Clear: {} | Illuminance: {} lx, Color Temp: {} K",
                result.percentages.red,
                result.percentages.green,
                result.percentages.blue,
                result.percentages.clear,
                result.illuminance_or_nan(),
                result.color_temperature_or_nan()
            );
        }
    }

    /// Exposure for the next cycle
    pub fn exposure(&self) -> ExposureState {
        self.exposure
    }

    /// How often [`update`](Self::update) should be called
    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Whether the last exposure write failed and is still to be repeated
    pub fn write_pending(&self) -> bool {
        self.write_pending
    }

    /// Calibration in use
    pub fn calibration(&self) -> CalibrationConfig {
        self.calibration
    }

    /// Current device health
    pub fn health(&self) -> SensorHealth {
        self.health
    }

    /// Result of the last completed cycle
    pub fn last_result(&self) -> Option<PhotometricResult> {
        self.last_result
    }

    /// Release the port
    pub fn release(self) -> P {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exposure::{Gain, IntegrationTime};
    use embassy_futures::block_on;
    use embedded_hal_mock::eh1::delay::NoopDelay;

    /// In-memory port recording every register write
    struct FakePort {
        id: Result<u8, ColorSensorError>,
        channels: Result<[u8; 8], ColorSensorError>,
        failing_register: Option<ConfigRegister>,
        writes: Vec<(ConfigRegister, u8)>,
    }

    impl FakePort {
        fn reading(clear: u16, red: u16, green: u16, blue: u16) -> Self {
            let mut data = [0u8; 8];
            for (i, value) in [clear, red, green, blue].into_iter().enumerate() {
                data[2 * i..2 * i + 2].copy_from_slice(&value.to_le_bytes());
            }
            Self {
                id: Ok(0x44),
                channels: Ok(data),
                failing_register: None,
                writes: Vec::new(),
            }
        }
    }

    impl ColorSensorPort for FakePort {
        async fn read_id(&mut self) -> Result<u8, ColorSensorError> {
            self.id
        }

        async fn read_channels(&mut self) -> Result<[u8; 8], ColorSensorError> {
            self.channels
        }

        async fn write_register(
            &mut self,
            register: ConfigRegister,
            value: u8,
        ) -> Result<(), ColorSensorError> {
            if self.failing_register == Some(register) {
                return Err(ColorSensorError::WriteFailed);
            }
            self.writes.push((register, value));
            Ok(())
        }
    }

    fn ready_controller(
        port: FakePort,
        config: &ColorSensorConfig,
    ) -> LightSensorController<FakePort> {
        let mut controller = LightSensorController::new(port, config).unwrap();
        block_on(controller.setup(&mut NoopDelay::new())).unwrap();
        controller.port.writes.clear();
        controller
    }

    #[test]
    fn test_setup_sequence() {
        let port = FakePort::reading(0, 0, 0, 0);
        let mut controller = LightSensorController::new(port, &ColorSensorConfig::default()).unwrap();
        assert_eq!(controller.health(), SensorHealth::Uninitialized);

        block_on(controller.setup(&mut NoopDelay::new())).unwrap();

        assert_eq!(controller.health(), SensorHealth::Ready);
        assert_eq!(
            controller.release().writes,
            vec![
                (ConfigRegister::IntegrationTime, 0xC0),
                (ConfigRegister::Gain, 0x00),
                (ConfigRegister::Enable, 0x01),
                (ConfigRegister::Enable, 0x03),
            ]
        );
    }

    #[test]
    fn test_setup_without_device_fails() {
        let mut port = FakePort::reading(0, 0, 0, 0);
        port.id = Err(ColorSensorError::ReadFailed);
        let mut controller = LightSensorController::new(port, &ColorSensorConfig::default()).unwrap();

        assert_eq!(
            block_on(controller.setup(&mut NoopDelay::new())),
            Err(ColorSensorError::NotDetected)
        );
        assert_eq!(controller.health(), SensorHealth::Failed);
        assert_eq!(
            block_on(controller.update()),
            Err(ColorSensorError::NotInitialized)
        );
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ColorSensorConfig {
            glass_attenuation: 0.0,
            ..ColorSensorConfig::default()
        };
        assert!(matches!(
            LightSensorController::new(FakePort::reading(0, 0, 0, 0), &config),
            Err(ColorSensorError::InvalidConfig)
        ));
    }

    #[test]
    fn test_update_retunes_in_auto_mode() {
        let port = FakePort::reading(20000, 8000, 9000, 3000);
        let mut controller = ready_controller(port, &ColorSensorConfig::default());

        let report = block_on(controller.update()).unwrap();

        assert!(report.result.illuminance.is_some());
        assert!(report.result.color_temperature.is_some());
        assert!(report.publish_photometry);
        assert_eq!(report.retune, RetuneStatus::Applied);
        assert_eq!(report.exposure.integration_reg, 130);
        assert_eq!(controller.exposure(), report.exposure);
        assert_eq!(controller.last_result(), Some(report.result));
        assert_eq!(
            controller.release().writes,
            vec![
                (ConfigRegister::IntegrationTime, 130),
                (ConfigRegister::Gain, 0x00),
            ]
        );
    }

    #[test]
    fn test_fixed_exposure_never_writes() {
        let port = FakePort::reading(20000, 8000, 9000, 3000);
        let config = ColorSensorConfig::fixed(IntegrationTime::Ms154, Gain::X1);
        let mut controller = ready_controller(port, &config);

        let report = block_on(controller.update()).unwrap();

        assert_eq!(report.retune, RetuneStatus::Disabled);
        assert_eq!(report.exposure, ExposureState::new(IntegrationTime::Ms154, Gain::X1));
        assert!(controller.release().writes.is_empty());
    }

    #[test]
    fn test_read_failure_aborts_cycle() {
        let mut port = FakePort::reading(0, 0, 0, 0);
        port.channels = Err(ColorSensorError::ReadFailed);
        let mut controller = ready_controller(port, &ColorSensorConfig::default());
        let before = controller.exposure();

        assert_eq!(
            block_on(controller.update()),
            Err(ColorSensorError::ReadFailed)
        );
        assert_eq!(controller.health(), SensorHealth::Warning);
        assert_eq!(controller.exposure(), before);
        assert_eq!(controller.last_result(), None);

        // next tick retries
        controller.port.channels = Ok([0x20, 0x4E, 0x40, 0x1F, 0x28, 0x23, 0xB8, 0x0B]);
        assert!(block_on(controller.update()).is_ok());
        assert_eq!(controller.health(), SensorHealth::Ready);
    }

    #[test]
    fn test_failed_retune_write_keeps_optimistic_exposure() {
        let mut port = FakePort::reading(20000, 8000, 9000, 3000);
        port.failing_register = Some(ConfigRegister::IntegrationTime);
        let mut controller = LightSensorController::new(port, &ColorSensorConfig::default()).unwrap();
        // skip setup writes, they would fail too
        controller.health = SensorHealth::Ready;

        let report = block_on(controller.update()).unwrap();

        assert_eq!(
            report.retune,
            RetuneStatus::WriteFailed(ColorSensorError::WriteFailed)
        );
        assert_eq!(controller.health(), SensorHealth::Warning);
        // not rolled back to the last exposure the device accepted
        assert_eq!(controller.exposure().integration_reg, 130);
        assert!((controller.exposure().time_ms - 301.98).abs() < 0.05);
        assert!(report.result.illuminance.is_some());
        assert!(report.publish_photometry);
        assert!(controller.write_pending());
        assert!(controller.release().writes.is_empty());
    }

    #[test]
    fn test_failed_retune_write_is_repeated_until_applied() {
        let port = FakePort::reading(20000, 8000, 9000, 3000);
        let mut controller = ready_controller(port, &ColorSensorConfig::default());
        controller.port.failing_register = Some(ConfigRegister::IntegrationTime);

        let first = block_on(controller.update()).unwrap();
        assert_eq!(
            first.retune,
            RetuneStatus::WriteFailed(ColorSensorError::WriteFailed)
        );
        assert_eq!(controller.exposure().integration_reg, 130);

        // bus recovers; 60% clear at ~302 ms keeps register 130
        controller.port.failing_register = None;
        controller.port.channels = FakePort::reading(39321, 15000, 16000, 6000).channels;

        let second = block_on(controller.update()).unwrap();
        assert_eq!(second.retune, RetuneStatus::Applied);
        assert_eq!(second.exposure.integration_reg, 130);
        // readout was taken before the device had the new exposure
        assert!(!second.publish_photometry);
        assert_eq!(controller.health(), SensorHealth::Ready);
        assert!(!controller.write_pending());
        assert_eq!(
            controller.port.writes,
            vec![
                (ConfigRegister::IntegrationTime, 130),
                (ConfigRegister::Gain, 0x00),
            ]
        );

        controller.port.writes.clear();
        let third = block_on(controller.update()).unwrap();
        assert_eq!(third.retune, RetuneStatus::Unchanged);
        assert!(third.publish_photometry);
        assert!(controller.release().writes.is_empty());
    }

    #[test]
    fn test_failed_retune_write_keeps_warning() {
        let port = FakePort::reading(20000, 8000, 9000, 3000);
        let mut controller = ready_controller(port, &ColorSensorConfig::default());
        controller.port.failing_register = Some(ConfigRegister::Gain);

        block_on(controller.update()).unwrap();
        controller.port.channels = FakePort::reading(39321, 15000, 16000, 6000).channels;
        let report = block_on(controller.update()).unwrap();

        assert_eq!(
            report.retune,
            RetuneStatus::WriteFailed(ColorSensorError::WriteFailed)
        );
        assert_eq!(controller.health(), SensorHealth::Warning);
        // ATIME went through both times, CONTROL never did
        assert_eq!(
            controller.release().writes,
            vec![
                (ConfigRegister::IntegrationTime, 130),
                (ConfigRegister::IntegrationTime, 130),
            ]
        );
    }

    #[test]
    fn test_update_interval_from_config() {
        let config = ColorSensorConfig {
            update_interval: Duration::from_secs(5),
            ..ColorSensorConfig::default()
        };
        let controller = ready_controller(FakePort::reading(0, 0, 0, 0), &config);

        assert_eq!(controller.update_interval(), Duration::from_secs(5));
        controller.log_config();
    }

    #[test]
    fn test_saturated_reading_withheld_in_auto_mode() {
        let port = FakePort::reading(65535, 30000, 30000, 20000);
        let config = ColorSensorConfig {
            gain: Gain::X4,
            ..ColorSensorConfig::default()
        };
        let mut controller = ready_controller(port, &config);

        let report = block_on(controller.update()).unwrap();

        assert_eq!(report.result.illuminance, None);
        assert!(!report.publish_photometry);
        // clear at 100% and 153.6 ms: gain steps down
        assert_eq!(report.exposure.gain, Gain::X1);
        assert_eq!(report.retune, RetuneStatus::Applied);
    }
}
