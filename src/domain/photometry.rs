//! Photometric conversion: channel percentages, illuminance and CCT
//!
//! Illuminance and color temperature follow DN40 (section 3.2, modified
//! coefficients). Either quantity is `None` when the reading cannot support
//! it; that is a normal outcome, not an error.

use super::calibration::{CalibrationConfig, PhotometricConstants};
use super::exposure::ExposureState;
use super::readout::RawReadout;
use super::saturation::{is_saturated, saturation_threshold};

/// Channel levels in percent.
///
/// Red, green and blue are relative to the clear channel; clear is relative
/// to the theoretical full-scale count of the current integration time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelPercentages {
    /// Clear channel fill level (sensor saturation)
    pub clear: f32,
    /// Red share of clear
    pub red: f32,
    /// Green share of clear
    pub green: f32,
    /// Blue share of clear
    pub blue: f32,
}

impl ChannelPercentages {
    /// Normalize a readout. All zero when clear is zero.
    pub fn from_readout(raw: &RawReadout, exposure: &ExposureState) -> Self {
        if raw.clear == 0 {
            return Self::default();
        }

        let clear = raw.clear as f32;
        Self {
            clear: clear / exposure.max_count() * 100.0,
            red: raw.red as f32 / clear * 100.0,
            green: raw.green as f32 / clear * 100.0,
            blue: raw.blue as f32 / clear * 100.0,
        }
    }
}

/// Result of one photometric conversion
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhotometricResult {
    /// Illuminance in lux
    pub illuminance: Option<f32>,
    /// Correlated color temperature in Kelvin
    pub color_temperature: Option<f32>,
    /// Normalized channel levels
    pub percentages: ChannelPercentages,
}

impl PhotometricResult {
    /// Illuminance, NaN when absent
    pub fn illuminance_or_nan(&self) -> f32 {
        self.illuminance.unwrap_or(f32::NAN)
    }

    /// Color temperature, NaN when absent
    pub fn color_temperature_or_nan(&self) -> f32 {
        self.color_temperature.unwrap_or(f32::NAN)
    }
}

/// Convert a readout with the DN40 constants
pub fn compute(
    raw: &RawReadout,
    exposure: &ExposureState,
    calibration: &CalibrationConfig,
) -> PhotometricResult {
    compute_with(raw, exposure, calibration, &PhotometricConstants::DN40)
}

/// Convert a readout with an explicit constant table
///
/// `exposure.auto_exposure` only selects how saturation is logged: info
/// while auto-exposure backs off, warn in fixed exposure.
pub fn compute_with(
    raw: &RawReadout,
    exposure: &ExposureState,
    calibration: &CalibrationConfig,
    constants: &PhotometricConstants,
) -> PhotometricResult {
    let (illuminance, color_temperature) =
        illuminance_and_color_temperature(raw, exposure, calibration, constants);

    PhotometricResult {
        illuminance,
        color_temperature,
        percentages: ChannelPercentages::from_readout(raw, exposure),
    }
}

fn illuminance_and_color_temperature(
    raw: &RawReadout,
    exposure: &ExposureState,
    calibration: &CalibrationConfig,
    k: &PhotometricConstants,
) -> (Option<f32>, Option<f32>) {
    if raw.clear == 0 {
        return (None, None);
    }

    // Clear saturates first since R+G+B ~ C, so it is screened first
    let threshold = saturation_threshold(exposure.integration_reg, exposure.time_ms);
    let saturated = raw
        .channels()
        .iter()
        .any(|&(channel, value)| is_saturated(channel, value, threshold, exposure.auto_exposure));
    if saturated {
        return (None, None);
    }

    debug!(
        "c: {}, r: {}, g: {}, b: {}",
        raw.clear,
        raw.red,
        raw.green,
        raw.blue
    );

    let (r, g, b) = (raw.red as f32, raw.green as f32, raw.blue as f32);
    let g1 = k.r_coef * r + k.g_coef * g + k.b_coef * b;
    let g1_scaled = k.scaling_factor * g1;
    let cpl = (exposure.time_ms * exposure.gain_multiplier())
        / (calibration.glass_attenuation * k.device_factor);
    trace!("g1: {}, cpl: {}", g1_scaled, cpl);

    let illuminance = (g1_scaled / cpl).max(0.0);
    if illuminance > k.max_illuminance {
        warn!(
            "Calculated illuminance greater than limit ({}), discarding",
            illuminance
        );
        return (None, None);
    }

    if raw.red == 0 {
        warn!("Red channel is zero, cannot compute color temperature");
        return (Some(illuminance), None);
    }

    // Blue/red ratio
    let color_temperature = k.ct_coef * b / r + k.ct_offset;
    if color_temperature < k.min_color_temperature {
        warn!(
            "Calculated color temperature value too low ({}), discarding",
            color_temperature
        );
        return (Some(illuminance), None);
    }
    if color_temperature > k.max_color_temperature {
        warn!(
            "Calculated color temperature value too high ({}), discarding",
            color_temperature
        );
        return (Some(illuminance), None);
    }

    (Some(illuminance), Some(color_temperature))
}
