//! Measurement frame shipped to a host
//!
//! One frame per measurement cycle, serialized with `postcard` and framed
//! with COBS so frames can be split on the zero byte of a serial stream.

use serde::{Deserialize, Serialize};

use crate::controller::{CycleReport, RetuneStatus};

/// Upper bound of an encoded frame, COBS overhead and sentinel included
pub const MAX_FRAME_LEN: usize = 64;

/// Flattened view of a [`CycleReport`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementFrame {
    /// Raw clear count
    pub clear: u16,
    /// Raw red count
    pub red: u16,
    /// Raw green count
    pub green: u16,
    /// Raw blue count
    pub blue: u16,
    /// Clear fill level (%)
    pub clear_percent: f32,
    /// Red share of clear (%)
    pub red_percent: f32,
    /// Green share of clear (%)
    pub green_percent: f32,
    /// Blue share of clear (%)
    pub blue_percent: f32,
    /// Lux, `None` when not computable or withheld
    pub illuminance: Option<f32>,
    /// Kelvin, `None` when not computable or withheld
    pub color_temperature: Option<f32>,
    /// ATIME register for the next cycle
    pub integration_reg: u8,
    /// Integration time for the next cycle (ms)
    pub integration_time_ms: f32,
    /// Gain ordinal for the next cycle
    pub gain: u8,
    /// Auto-exposure running
    pub auto_exposure: bool,
    /// Exposure write failed this cycle
    pub retune_failed: bool,
    /// Burst read duration (us)
    pub read_duration_us: u64,
}

impl From<&CycleReport> for MeasurementFrame {
    fn from(report: &CycleReport) -> Self {
        let result = &report.result;
        // Withheld values are not sent
        let (illuminance, color_temperature) = if report.publish_photometry {
            (result.illuminance, result.color_temperature)
        } else {
            (None, None)
        };

        Self {
            clear: report.raw.clear,
            red: report.raw.red,
            green: report.raw.green,
            blue: report.raw.blue,
            clear_percent: result.percentages.clear,
            red_percent: result.percentages.red,
            green_percent: result.percentages.green,
            blue_percent: result.percentages.blue,
            illuminance,
            color_temperature,
            integration_reg: report.exposure.integration_reg,
            integration_time_ms: report.exposure.time_ms,
            gain: report.exposure.gain.ordinal(),
            auto_exposure: report.exposure.auto_exposure,
            retune_failed: matches!(report.retune, RetuneStatus::WriteFailed(_)),
            read_duration_us: report.read_duration.as_micros(),
        }
    }
}

/// Encode a frame into `buf`, returning the COBS-framed bytes including
/// the trailing zero
pub fn encode_frame<'a>(
    frame: &MeasurementFrame,
    buf: &'a mut [u8],
) -> Result<&'a mut [u8], postcard::Error> {
    postcard::to_slice_cobs(frame, buf)
}

/// Decode one COBS-framed frame in place
pub fn decode_frame(buf: &mut [u8]) -> Result<MeasurementFrame, postcard::Error> {
    postcard::from_bytes_cobs(buf)
}

/// Encode a frame into a fresh buffer
#[cfg(feature = "std")]
pub fn encode_frame_vec(frame: &MeasurementFrame) -> Result<std::vec::Vec<u8>, postcard::Error> {
    postcard::to_stdvec_cobs(frame)
}
