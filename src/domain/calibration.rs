//! Calibration parameters for the lux / color temperature conversion
//!
//! The conversion follows the TAOS/AMS design note DN40 with an
//! empirically adjusted set of channel coefficients. Only the cover glass
//! correction is user configuration.

/// Cover glass correction
///
/// The glass attenuation factor (GA) compensates for light lost in a
/// protective cover in front of the sensor. GA is the inverse of the glass
/// transmissivity: `GA = 1 / T`. No glass means `GA = 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationConfig {
    /// Glass attenuation factor (>= 1)
    pub glass_attenuation: f32,
}

impl CalibrationConfig {
    /// Open air, no cover glass
    pub const NO_GLASS: Self = Self {
        glass_attenuation: 1.0,
    };

    /// Create a calibration from a glass attenuation factor
    ///
    /// Returns `None` unless the factor is finite and at least 1.
    pub fn new(glass_attenuation: f32) -> Option<Self> {
        if glass_attenuation.is_finite() && glass_attenuation >= 1.0 {
            Some(Self { glass_attenuation })
        } else {
            None
        }
    }

    /// Create a calibration from the cover transmissivity (0, 1]
    ///
    /// A transmissivity of 50% gives `GA = 1 / 0.5 = 2`.
    pub fn from_transmissivity(transmissivity: f32) -> Option<Self> {
        if transmissivity > 0.0 && transmissivity <= 1.0 {
            Self::new(1.0 / transmissivity)
        } else {
            None
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::NO_GLASS
    }
}

/// Fixed constants of the photometric conversion
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhotometricConstants {
    /// Red coefficient of the illuminance proxy
    pub r_coef: f32,
    /// Green coefficient of the illuminance proxy
    pub g_coef: f32,
    /// Blue coefficient of the illuminance proxy
    pub b_coef: f32,
    /// Rescales the adjusted coefficients back to the DN40 sum
    pub scaling_factor: f32,
    /// Device factor (DF) of the counts-per-lux formula
    pub device_factor: f32,
    /// Color temperature coefficient applied to the blue/red ratio
    pub ct_coef: f32,
    /// Color temperature offset (K)
    pub ct_offset: f32,
    /// Illuminance above this is treated as a corrupt reading (lx)
    pub max_illuminance: f32,
    /// Lowest plausible color temperature (K)
    pub min_color_temperature: f32,
    /// Highest plausible color temperature (K)
    pub max_color_temperature: f32,
}

impl PhotometricConstants {
    /// DN40 with adjusted coefficients
    ///
    /// The DN40 coefficients (R 0.136, G 1.0, B -0.444) are shifted by
    /// +0.444 each so blue never subtracts, then rescaled by
    /// `dn40_sum / adjusted_sum`.
    pub const DN40: Self = Self {
        r_coef: 0.58,
        g_coef: 1.444,
        b_coef: 0.0,
        scaling_factor: 0.342,
        device_factor: 310.0,
        ct_coef: 3810.0,
        ct_offset: 1391.0,
        max_illuminance: 100_000.0,
        min_color_temperature: 1000.0,
        max_color_temperature: 15_000.0,
    };
}

impl Default for PhotometricConstants {
    fn default() -> Self {
        Self::DN40
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_open_air() {
        assert_eq!(CalibrationConfig::default().glass_attenuation, 1.0);
    }

    #[test]
    fn test_rejects_attenuation_below_one() {
        assert!(CalibrationConfig::new(0.5).is_none());
        assert!(CalibrationConfig::new(f32::NAN).is_none());
        assert_eq!(CalibrationConfig::new(2.5).map(|c| c.glass_attenuation), Some(2.5));
    }

    #[test]
    fn test_from_transmissivity() {
        let cal = CalibrationConfig::from_transmissivity(0.5).unwrap();
        assert!((cal.glass_attenuation - 2.0).abs() < 1e-6);
        assert!(CalibrationConfig::from_transmissivity(0.0).is_none());
        assert!(CalibrationConfig::from_transmissivity(1.5).is_none());
    }
}
