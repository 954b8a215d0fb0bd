//! Adapters - concrete implementations of ports
//!
//! Adapters connect the domain to the outside world by implementing
//! the port traits.
//!
//! # Available Adapters
//!
//! - **tcs34725**: TCS34725 RGBC light sensor via I2C

pub mod tcs34725;

pub use tcs34725::Tcs34725Adapter;
