//! Ports (interfaces) defining the boundaries of the application
//!
//! Ports are traits that define how the domain interacts with external systems.
//! They allow the domain to remain independent of specific implementations.
//!
//! # Hexagonal Architecture
//!
//! - **ColorSensorPort**: How we talk to the RGBC sensor (I2C, mock)

pub mod color_sensor;

pub use color_sensor::{ColorSensorConfig, ColorSensorError, ColorSensorPort, ConfigRegister};
