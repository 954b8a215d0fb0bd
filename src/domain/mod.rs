//! Domain layer - pure photometry and exposure logic
//!
//! Nothing in here touches the bus. Every function takes the raw counts and
//! the exposure they were taken with, so the whole measurement path can be
//! exercised on the host.

pub mod auto_exposure;
pub mod calibration;
pub mod exposure;
pub mod photometry;
pub mod readout;
pub mod saturation;

pub use calibration::{CalibrationConfig, PhotometricConstants};
pub use exposure::{ExposureState, Gain, IntegrationTime};
pub use photometry::{ChannelPercentages, PhotometricResult};
pub use readout::{Channel, RawReadout};
