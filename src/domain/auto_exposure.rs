//! Auto-exposure control law
//!
//! A memoryless proportional controller: each cycle looks only at the
//! previous exposure and the clear count it produced, and picks the
//! integration time that would have put the clear channel at the target
//! level. Gain is stepped only at the ends of the integration range.

use super::calibration::CalibrationConfig;
use super::exposure::{integration_register, ExposureState, MAX_INTEGRATION_TIME_MS};
use super::photometry::{compute, PhotometricResult};
use super::readout::RawReadout;

/// Clear counts per percent of the 16-bit range (65535 / 100)
pub const COUNTS_PER_PERCENT: f32 = 655.35;

/// Clear level the integration time is scaled towards (% of 16-bit range)
pub const TARGET_CLEAR_PERCENT: f32 = 60.0;

/// Shortest integration time the controller selects (ms)
pub const MIN_AUTO_INTEGRATION_MS: f32 = 154.0;

/// Step gain up when clear is below this level (%)...
pub const GAIN_UP_BELOW_PERCENT: f32 = 20.0;
/// ...and integration is already longer than this (ms)
pub const GAIN_UP_ABOVE_MS: f32 = 600.0;

/// Step gain down when clear is above this level (%)...
pub const GAIN_DOWN_ABOVE_PERCENT: f32 = 70.0;
/// ...and integration is already shorter than this (ms)
pub const GAIN_DOWN_BELOW_MS: f32 = 200.0;

/// Sensitivity ratio between consecutive gain stages
const GAIN_STEP_RATIO: f32 = 4.0;

/// Raw clear count at which a reading counts as clipped for publishing
const CLEAR_CLIPPED_COUNT: u16 = 65530;

/// Outcome of one retune computation
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Retune {
    /// Ideal integration time after gain compensation, before clamping (ms)
    pub ideal_time_ms: f32,
    /// Proposed exposure for the next cycle
    pub next: ExposureState,
    /// Whether `next` differs from the previous exposure in register or gain
    pub changed: bool,
}

/// Output of one controller cycle
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step {
    /// Photometric conversion of this cycle's readout
    pub result: PhotometricResult,
    /// Exposure to use for the next cycle
    pub exposure: ExposureState,
    /// Retune details, `None` with auto-exposure disabled
    pub retune: Option<Retune>,
    /// Whether illuminance and color temperature should be published
    pub publish_photometry: bool,
}

/// Clear channel level in percent of the 16-bit range
#[inline]
pub fn clear_percent(clear: u16) -> f32 {
    clear as f32 / COUNTS_PER_PERCENT
}

/// Run one cycle of the control law.
///
/// The photometric result is always computed against `prev`, the exposure
/// the readout was taken with. The returned exposure equals `prev` unless
/// auto-exposure is enabled and the register or gain changes.
pub fn step(
    prev: &ExposureState,
    raw: &RawReadout,
    calibration: &CalibrationConfig,
    auto_enabled: bool,
) -> Step {
    // Saturation log level follows the loop that actually runs
    let measured = ExposureState {
        auto_exposure: auto_enabled,
        ..*prev
    };
    let result = compute(raw, &measured, calibration);
    let publish_photometry = photometry_publishable(prev, raw, auto_enabled);

    if !auto_enabled {
        return Step {
            result,
            exposure: *prev,
            retune: None,
            publish_photometry,
        };
    }

    let retune = next_exposure(prev, raw);
    Step {
        result,
        exposure: if retune.changed { retune.next } else { *prev },
        retune: Some(retune),
        publish_photometry,
    }
}

/// Compute the exposure that drives the clear channel towards the target
pub fn next_exposure(prev: &ExposureState, raw: &RawReadout) -> Retune {
    let clear_level = clear_percent(raw.clear);
    let mut ideal_time_ms =
        TARGET_CLEAR_PERCENT / clear_percent(raw.clear.max(1)) * prev.time_ms;

    let mut gain = prev.gain;
    // Low signal at long integration: more time will not help
    if clear_level < GAIN_UP_BELOW_PERCENT && prev.time_ms > GAIN_UP_ABOVE_MS {
        if let Some(higher) = prev.gain.step_up() {
            gain = higher;
            ideal_time_ms /= GAIN_STEP_RATIO;
        }
    }
    // High signal at short integration: less time is not allowed
    if clear_level > GAIN_DOWN_ABOVE_PERCENT && prev.time_ms < GAIN_DOWN_BELOW_MS {
        if let Some(lower) = prev.gain.step_down() {
            gain = lower;
            ideal_time_ms *= GAIN_STEP_RATIO;
        }
    }

    let next_time_ms = ideal_time_ms.clamp(MIN_AUTO_INTEGRATION_MS, MAX_INTEGRATION_TIME_MS);
    let integration_reg = integration_register(next_time_ms);
    let changed = integration_reg != prev.integration_reg || gain != prev.gain;

    debug!(
        "Integration time: {} ms, next: {} ms | reg {} -> {}, gain {} -> {}, clear raw: {}",
        prev.time_ms,
        next_time_ms,
        prev.integration_reg,
        integration_reg,
        prev.gain.ordinal(),
        gain.ordinal(),
        raw.clear
    );

    Retune {
        ideal_time_ms,
        next: ExposureState {
            integration_reg,
            time_ms: next_time_ms,
            gain,
            auto_exposure: prev.auto_exposure,
        },
        changed,
    }
}

/// Whether this cycle's illuminance and color temperature are worth
/// publishing.
///
/// While auto-exposure is still backing off from a clipped clear channel
/// the values are withheld, unless exposure is already at its minimum.
pub fn photometry_publishable(prev: &ExposureState, raw: &RawReadout, auto_enabled: bool) -> bool {
    !auto_enabled
        || raw.clear < CLEAR_CLIPPED_COUNT
        || (prev.gain.ordinal() == 0 && prev.time_ms < GAIN_DOWN_BELOW_MS)
}
