//! TCS34725 color sensor adapter
//!
//! This adapter implements the ColorSensorPort trait over an
//! `embedded-hal-async` I2C bus for the AMS/TAOS TCS3472x family.

use embedded_hal_async::i2c::I2c;

use crate::domain::readout::BURST_LEN;
use crate::ports::color_sensor::{ColorSensorError, ColorSensorPort, ConfigRegister};

/// Default 7-bit I2C address
pub const I2C_ADDRESS: u8 = 0x29;

/// Every register access sets the command bit
const COMMAND_BIT: u8 = 0x80;

const REGISTER_ENABLE: u8 = 0x00;
const REGISTER_ATIME: u8 = 0x01;
const REGISTER_CONTROL: u8 = 0x0F;
const REGISTER_ID: u8 = 0x12;
const REGISTER_CDATAL: u8 = 0x14;

/// TCS34725 adapter implementing ColorSensorPort
pub struct Tcs34725Adapter<I: I2c> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Tcs34725Adapter<I> {
    /// Create an adapter at the default address
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, I2C_ADDRESS)
    }

    /// Create an adapter at a custom address
    pub fn with_address(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Release the underlying I2C bus
    pub fn release(self) -> I {
        self.i2c
    }

    const fn register_address(register: ConfigRegister) -> u8 {
        COMMAND_BIT
            | match register {
                ConfigRegister::Enable => REGISTER_ENABLE,
                ConfigRegister::IntegrationTime => REGISTER_ATIME,
                ConfigRegister::Gain => REGISTER_CONTROL,
            }
    }
}

impl<I: I2c> ColorSensorPort for Tcs34725Adapter<I> {
    async fn read_id(&mut self) -> Result<u8, ColorSensorError> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(self.address, &[COMMAND_BIT | REGISTER_ID], &mut id)
            .await
            .map_err(|_| ColorSensorError::ReadFailed)?;
        Ok(id[0])
    }

    async fn read_channels(&mut self) -> Result<[u8; BURST_LEN], ColorSensorError> {
        let mut data = [0u8; BURST_LEN];
        self.i2c
            .write_read(self.address, &[COMMAND_BIT | REGISTER_CDATAL], &mut data)
            .await
            .map_err(|_| ColorSensorError::ReadFailed)?;
        Ok(data)
    }

    async fn write_register(
        &mut self,
        register: ConfigRegister,
        value: u8,
    ) -> Result<(), ColorSensorError> {
        self.i2c
            .write(self.address, &[Self::register_address(register), value])
            .await
            .map_err(|_| ColorSensorError::WriteFailed)
    }
}
