//! Exposure state: integration time and analog gain
//!
//! The TCS34725 encodes integration time inversely in the 8-bit ATIME
//! register: each step below 256 adds 2.4 ms of integration.

/// Integration time added per ATIME step (ms)
pub const INTEGRATION_STEP_MS: f32 = 2.4;

/// Longest representable integration time, `2.4 * 256` (ms)
pub const MAX_INTEGRATION_TIME_MS: f32 = INTEGRATION_STEP_MS * 256.0;

/// Counts accumulated per integration step
pub const COUNTS_PER_STEP: f32 = 1024.0;

/// Integration time in milliseconds for an ATIME register value
#[inline]
pub fn integration_time_ms(integration_reg: u8) -> f32 {
    (256 - integration_reg as u16) as f32 * INTEGRATION_STEP_MS
}

/// ATIME register value for an integration time, rounded towards the
/// longer integration.
///
/// Times outside `(0, 614.4]` saturate to the nearest register value.
#[inline]
pub fn integration_register(time_ms: f32) -> u8 {
    // float -> int `as` casts truncate and saturate
    (256.0 - time_ms / INTEGRATION_STEP_MS) as u8
}

/// Analog gain stage (CONTROL register AGAIN field)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Gain {
    /// 1x gain
    #[default]
    X1 = 0,
    /// 4x gain
    X4 = 1,
    /// 16x gain
    X16 = 2,
    /// 60x gain
    X60 = 3,
}

impl Gain {
    /// Highest gain ordinal
    pub const MAX_ORDINAL: u8 = 3;

    /// Gain from its ordinal / register value
    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Gain::X1),
            1 => Some(Gain::X4),
            2 => Some(Gain::X16),
            3 => Some(Gain::X60),
            _ => None,
        }
    }

    /// Ordinal 0-3, also the CONTROL register value
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Amplification factor
    pub const fn multiplier(self) -> f32 {
        match self {
            Gain::X1 => 1.0,
            Gain::X4 => 4.0,
            Gain::X16 => 16.0,
            Gain::X60 => 60.0,
        }
    }

    /// Next higher stage, `None` at 60x
    pub const fn step_up(self) -> Option<Self> {
        Self::from_ordinal(self.ordinal() + 1)
    }

    /// Next lower stage, `None` at 1x
    pub const fn step_down(self) -> Option<Self> {
        match self {
            Gain::X1 => None,
            other => Self::from_ordinal(other.ordinal() - 1),
        }
    }
}

/// Integration time presets from the datasheet, plus automatic mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IntegrationTime {
    /// Auto-exposure, starting from the 154 ms preset
    #[default]
    Auto,
    Ms2_4,
    Ms24,
    Ms50,
    Ms101,
    Ms120,
    Ms154,
    Ms180,
    Ms199,
    Ms240,
    Ms300,
    Ms360,
    Ms401,
    Ms420,
    Ms480,
    Ms499,
    Ms540,
    Ms600,
    Ms614,
}

impl IntegrationTime {
    /// ATIME register value (the starting value for `Auto`)
    pub const fn register(self) -> u8 {
        match self {
            IntegrationTime::Auto => 0xC0,
            IntegrationTime::Ms2_4 => 0xFF,
            IntegrationTime::Ms24 => 0xF6,
            IntegrationTime::Ms50 => 0xEB,
            IntegrationTime::Ms101 => 0xD5,
            IntegrationTime::Ms120 => 0xCE,
            IntegrationTime::Ms154 => 0xC0,
            IntegrationTime::Ms180 => 0xB5,
            IntegrationTime::Ms199 => 0xAD,
            IntegrationTime::Ms240 => 0x9C,
            IntegrationTime::Ms300 => 0x83,
            IntegrationTime::Ms360 => 0x6A,
            IntegrationTime::Ms401 => 0x59,
            IntegrationTime::Ms420 => 0x51,
            IntegrationTime::Ms480 => 0x38,
            IntegrationTime::Ms499 => 0x30,
            IntegrationTime::Ms540 => 0x1F,
            IntegrationTime::Ms600 => 0x06,
            IntegrationTime::Ms614 => 0x00,
        }
    }

    /// Whether this selects auto-exposure
    pub const fn is_auto(self) -> bool {
        matches!(self, IntegrationTime::Auto)
    }
}

/// Exposure settings carried from one measurement cycle to the next.
///
/// `time_ms` is normally `integration_time_ms(integration_reg)`; after an
/// auto-exposure retune it holds the controller's target time, which is
/// within one register step of the register value.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExposureState {
    /// ATIME register value (higher = shorter integration)
    pub integration_reg: u8,
    /// Integration time in milliseconds
    pub time_ms: f32,
    /// Analog gain stage
    pub gain: Gain,
    /// Whether the auto-exposure loop may retune this state
    pub auto_exposure: bool,
}

impl ExposureState {
    /// Initial state for a configured integration time and gain
    pub fn new(integration_time: IntegrationTime, gain: Gain) -> Self {
        Self::from_register(
            integration_time.register(),
            gain,
            integration_time.is_auto(),
        )
    }

    /// State for a raw ATIME register value
    pub fn from_register(integration_reg: u8, gain: Gain, auto_exposure: bool) -> Self {
        Self {
            integration_reg,
            time_ms: integration_time_ms(integration_reg),
            gain,
            auto_exposure,
        }
    }

    /// Gain multiplier of the current stage
    #[inline]
    pub fn gain_multiplier(&self) -> f32 {
        self.gain.multiplier()
    }

    /// Theoretical full-scale count for the current integration time
    #[inline]
    pub fn max_count(&self) -> f32 {
        self.time_ms * COUNTS_PER_STEP / INTEGRATION_STEP_MS
    }
}

impl Default for ExposureState {
    fn default() -> Self {
        Self::new(IntegrationTime::Auto, Gain::X1)
    }
}
