//! TCS34725 Ambient Light Library
//!
//! Turns the four raw channel counts of a TCS34725 into illuminance (lux)
//! and correlated color temperature, and keeps the sensor exposed correctly
//! with a closed-loop auto-exposure controller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                                 │
//! │  - RawReadout, ExposureState entities                           │
//! │  - Saturation screening, DN40 photometry                        │
//! │  - Auto-exposure control law                                    │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Ports (Traits)                               │
//! │  - ColorSensorPort: register access to the sensor               │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters                                     │
//! │  - Tcs34725Adapter: embedded-hal-async I2C                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`LightSensorController`] ties the layers together: call
//! [`setup`](LightSensorController::setup) once, then
//! [`update`](LightSensorController::update) every
//! [`ColorSensorConfig::update_interval`].

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

#[cfg(all(test, feature = "log"))]
mod log_capture;

/// Domain layer - pure business logic
pub mod domain;

/// Ports - traits defining boundaries
pub mod ports;

/// Adapters - concrete implementations
pub mod adapters;

pub mod controller;

/// Host-facing measurement frames
pub mod protocol;

// Re-export key domain types
pub use domain::{
    CalibrationConfig, Channel, ChannelPercentages, ExposureState, Gain, IntegrationTime,
    PhotometricConstants, PhotometricResult, RawReadout,
};

// Re-export key port traits
pub use ports::{ColorSensorConfig, ColorSensorError, ColorSensorPort, ConfigRegister};

// Re-export adapters
pub use adapters::Tcs34725Adapter;

pub use controller::{CycleReport, LightSensorController, RetuneStatus, SensorHealth};
pub use protocol::{decode_frame, encode_frame, MeasurementFrame, MAX_FRAME_LEN};
