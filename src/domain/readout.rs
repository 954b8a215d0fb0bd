//! Raw RGBC readout domain entity
//!
//! One burst read of the four 16-bit channel counts. A readout lives for a
//! single measurement cycle.

/// Number of bytes in one channel burst (4 channels x 16 bit).
pub const BURST_LEN: usize = 8;

/// Sensor channel identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Unfiltered photodiode
    Clear,
    /// Red filtered photodiode
    Red,
    /// Green filtered photodiode
    Green,
    /// Blue filtered photodiode
    Blue,
}

impl Channel {
    /// Lowercase channel name for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Channel::Clear => "clear",
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }
}

/// Raw photon counts captured in one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawReadout {
    /// Clear channel count
    pub clear: u16,
    /// Red channel count
    pub red: u16,
    /// Green channel count
    pub green: u16,
    /// Blue channel count
    pub blue: u16,
}

impl RawReadout {
    /// Create a readout from individual channel counts
    pub const fn new(clear: u16, red: u16, green: u16, blue: u16) -> Self {
        Self {
            clear,
            red,
            green,
            blue,
        }
    }

    /// Decode the 8-byte little-endian burst starting at CDATAL.
    ///
    /// Byte order: clear (0-1), red (2-3), green (4-5), blue (6-7).
    pub const fn from_le_bytes(data: [u8; BURST_LEN]) -> Self {
        Self {
            clear: u16::from_le_bytes([data[0], data[1]]),
            red: u16::from_le_bytes([data[2], data[3]]),
            green: u16::from_le_bytes([data[4], data[5]]),
            blue: u16::from_le_bytes([data[6], data[7]]),
        }
    }

    /// Channels in screening order: clear, red, green, blue
    pub const fn channels(&self) -> [(Channel, u16); 4] {
        [
            (Channel::Clear, self.clear),
            (Channel::Red, self.red),
            (Channel::Green, self.green),
            (Channel::Blue, self.blue),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_le_bytes_channel_order() {
        let raw = RawReadout::from_le_bytes([0x20, 0x4E, 0x40, 0x1F, 0x28, 0x23, 0xB8, 0x0B]);
        assert_eq!(raw, RawReadout::new(20000, 8000, 9000, 3000));
    }

    #[test]
    fn test_channels_screening_order() {
        let raw = RawReadout::new(4, 3, 2, 1);
        let order = raw.channels().map(|(channel, _)| channel);
        assert_eq!(
            order,
            [Channel::Clear, Channel::Red, Channel::Green, Channel::Blue]
        );
        assert_eq!(raw.channels()[0].1, 4);
    }
}
