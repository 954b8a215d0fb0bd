//! Saturation screening
//!
//! The TCS34725 accumulates 1024 counts per 2.4 ms integration step, up to
//! the 16-bit ceiling of 65535. Up to 64 steps (153.6 ms) the analog
//! ceiling is reached first; above that the digital one is.

use super::exposure::COUNTS_PER_STEP;
use super::readout::Channel;

/// Digital saturation level (16-bit counter ceiling)
pub const DIGITAL_SATURATION: f32 = 65535.0;

/// Integration steps after which digital saturation dominates
const ANALOG_SATURATION_STEPS: u16 = 63;

/// Below this integration time the threshold is lowered to 75% (ms)
pub const RIPPLE_REJECTION_TIME_MS: f32 = 150.0;

/// Count at which a channel is considered saturated.
///
/// Light sources on AC mains ripple; at short integration times a reading
/// can be affected by saturation while still below the ceiling, so the
/// threshold drops by a quarter under 150 ms.
pub fn saturation_threshold(integration_reg: u8, time_ms: f32) -> f32 {
    let steps = 256 - integration_reg as u16;
    let mut threshold = if steps > ANALOG_SATURATION_STEPS {
        DIGITAL_SATURATION
    } else {
        COUNTS_PER_STEP * steps as f32
    };

    if time_ms < RIPPLE_REJECTION_TIME_MS {
        threshold -= threshold / 4.0;
    }
    threshold
}

/// Whether a channel count is at or above the saturation threshold.
///
/// With auto-exposure running the sample is simply discarded while the
/// loop backs off, so this is informational. In fixed exposure nothing will
/// correct it and a warning is logged.
pub fn is_saturated(channel: Channel, value: u16, threshold: f32, auto_mode: bool) -> bool {
    if (value as f32) < threshold {
        return false;
    }

    if auto_mode {
        info!(
            "Saturation too high on {} channel, sample discarded, autogain ongoing",
            channel.as_str()
        );
    } else {
        warn!(
            "Saturation too high on {} channel (value: {}, threshold: {}). Lux/color temperature cannot reliably be calculated. Reduce integration/gain or use a grey filter.",
            channel.as_str(),
            value,
            threshold
        );
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exposure::integration_time_ms;

    #[test]
    fn test_long_integration_uses_digital_ceiling() {
        // 0xC0 = 64 steps, 153.6 ms
        assert_eq!(saturation_threshold(0xC0, 153.6), 65535.0);
        assert_eq!(saturation_threshold(0x00, 614.4), 65535.0);
    }

    #[test]
    fn test_short_integration_uses_analog_ceiling() {
        // 0xC1 = 63 steps, 151.2 ms: analog ceiling, no ripple correction
        assert_eq!(saturation_threshold(0xC1, 151.2), 1024.0 * 63.0);
    }

    #[test]
    fn test_ripple_correction_is_a_quarter() {
        // 0xEB = 21 steps, 50.4 ms
        let threshold = saturation_threshold(0xEB, integration_time_ms(0xEB));
        assert_eq!(threshold, 1024.0 * 21.0 * 0.75);
    }

    #[test]
    fn test_threshold_never_exceeds_ceiling() {
        for reg in 0..=u8::MAX {
            let time = integration_time_ms(reg);
            let threshold = saturation_threshold(reg, time);
            assert!(threshold <= DIGITAL_SATURATION);

            let steps = 256 - reg as u16;
            let base = if steps > 63 { 65535.0 } else { 1024.0 * steps as f32 };
            if time < RIPPLE_REJECTION_TIME_MS {
                assert_eq!(threshold, base - base / 4.0);
            } else {
                assert_eq!(threshold, base);
            }
        }
    }

    #[test]
    fn test_is_saturated_at_threshold() {
        assert!(is_saturated(Channel::Clear, 65535, 65535.0, true));
        assert!(!is_saturated(Channel::Red, 65534, 65535.0, false));
        assert!(is_saturated(Channel::Blue, 48000, 47000.0, false));
    }

    #[test]
    #[cfg(feature = "log")]
    fn test_saturation_log_level_follows_mode() {
        use crate::log_capture;
        use log::Level;

        log_capture::start();
        assert!(is_saturated(Channel::Blue, 65535, DIGITAL_SATURATION, true));
        let records = log_capture::take();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, Level::Info);
        assert!(records[0].1.contains("blue"));

        assert!(is_saturated(Channel::Clear, 65535, DIGITAL_SATURATION, false));
        let records = log_capture::take();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, Level::Warn);
        assert!(records[0].1.contains("value: 65535"));

        assert!(!is_saturated(Channel::Red, 100, DIGITAL_SATURATION, false));
        assert!(log_capture::take().is_empty());
    }
}
