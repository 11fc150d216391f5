//! Encoding of the configuration byte and decoding of sample buffers
//!
//! A read returns the sample bytes followed by an echo of the configuration
//! byte. The sample is signed-magnitude: one sign bit above a masked
//! magnitude, not two's complement.
//!
//! | Sample Rate | Buffer                      | Sign bit     | Magnitude mask |
//! | :---        | :---                        | :---         | ---:           |
//! | 12 bit      | `[upper, lower, config]`    | `upper` b3   | `0x7FF`        |
//! | 14 bit      | `[upper, lower, config]`    | `upper` b5   | `0x1FFF`       |
//! | 16 bit      | `[upper, lower, config]`    | `upper` b7   | `0x7FFF`       |
//! | 18 bit      | `[upper, mid, lower, cfg]`  | `upper` b1   | `0x1FFFF`      |

use core::fmt;

use crate::config::{
    Channel, ConversionMode, Gain, ReadSettings, SampleRate, Start, WriteSettings, READY_MASK,
};

/// A sample buffer whose length does not match the active sample rate.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct BufferLengthMismatch {
    pub rate: SampleRate,
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for BufferLengthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid buffer length for {}-bit samples: expected {}, got {}",
            self.rate.bits(),
            self.expected,
            self.actual
        )
    }
}

impl core::error::Error for BufferLengthMismatch {}

/// Assemble a configuration byte. `RDY` (bit 7) is left clear.
pub fn encode_config(gain: Gain, rate: SampleRate, mode: ConversionMode, channel: Channel) -> u8 {
    WriteSettings {
        start: Start::DontStart,
        channel,
        mode,
        rate,
        gain,
    }
    .to_value()
}

/// Split a configuration byte, such as the echo at the end of a sample,
/// back into its fields.
pub fn decode_config(value: u8) -> ReadSettings {
    ReadSettings::from(value)
}

/// Whether `buf` holds a conversion that has not been read before.
///
/// The device clears `RDY` in the config echo when a fresh result is latched.
/// A buffer too short to hold the echo is never ready.
pub fn is_conversion_ready(rate: SampleRate, buf: &[u8]) -> bool {
    match buf.get(rate.buffer_len() - 1) {
        Some(config) => config & READY_MASK == 0,
        None => false,
    }
}

/// Decode the signed sample held in `buf`.
pub fn decode_sample(rate: SampleRate, buf: &[u8]) -> Result<i32, BufferLengthMismatch> {
    let expected = rate.buffer_len();
    if buf.len() != expected {
        return Err(BufferLengthMismatch {
            rate,
            expected,
            actual: buf.len(),
        });
    }

    let upper = buf[0];
    let (value, sign, magnitude) = match rate {
        SampleRate::Bits12 => (
            (i32::from(upper & 0x0F) << 8) | i32::from(buf[1]),
            0b0000_1000,
            0x0000_07FF,
        ),
        SampleRate::Bits14 => (
            (i32::from(upper & 0x3F) << 8) | i32::from(buf[1]),
            0b0010_0000,
            0x0000_1FFF,
        ),
        SampleRate::Bits16 => (
            (i32::from(upper) << 8) | i32::from(buf[1]),
            0b1000_0000,
            0x0000_7FFF,
        ),
        SampleRate::Bits18 => (
            (i32::from(upper & 0x03) << 16) | (i32::from(buf[1]) << 8) | i32::from(buf[2]),
            0b0000_0010,
            0x0001_FFFF,
        ),
    };

    if upper & sign != 0 {
        Ok(-(value & magnitude))
    } else {
        Ok(value)
    }
}
