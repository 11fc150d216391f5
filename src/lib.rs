//! `adcpi`
//!
//! A driver for the ADC Pi board: two MCP3424 four channel delta-sigma ADCs
//! on one I2C bus, presented as eight channels.
//!
//! [`Mcp3424`] drives a single chip, [`DualAdc`] combines two of them and
//! scales raw counts to volts.
//!
//! ```
//! use adcpi::config::{Address, SampleRate};
//! use adcpi::DualAdc;
//! use embedded_hal_mock::eh1::i2c::{Mock, Transaction};
//!
//! let a = Mock::new(&[Transaction::write_read(0x68, vec![0x1C], vec![0x00, 0x00, 0x64, 0x0C])]);
//! let b = Mock::new(&[]);
//!
//! let mut adc = DualAdc::new(a, Address::A68, b, Address::A69);
//! adc.set_sample_rate(SampleRate::Bits18);
//! assert_eq!(adc.read_raw(1).unwrap(), 100);
//!
//! let (mut a, mut b) = adc.release();
//! a.done();
//! b.done();
//! ```

#![cfg_attr(not(test), no_std)]

use core::fmt;

use config::{Address, ChipConfig, ConversionMode, InvalidParameter, Start};
use embedded_hal::i2c::I2c;
use log::{debug, trace, warn};

pub use codec::BufferLengthMismatch;
pub use dual::{resolve_channel, ChipSelect, DualAdc, Reading};

pub mod codec;
pub mod config;
pub mod dual;

/// Driver error type
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// No fresh conversion was seen within the [PollPolicy]
    Timeout,
    /// An error with the underlying I2C bus
    I2c(E),
    /// A raw setting outside the values the device supports
    InvalidParameter(InvalidParameter),
    /// A sample buffer that does not match the active sample rate
    BufferLengthMismatch(BufferLengthMismatch),
}

impl<E> From<InvalidParameter> for Error<E> {
    fn from(e: InvalidParameter) -> Self {
        Error::InvalidParameter(e)
    }
}

impl<E> From<BufferLengthMismatch> for Error<E> {
    fn from(e: BufferLengthMismatch) -> Self {
        Error::BufferLengthMismatch(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout => f.write_str("timed out waiting for a fresh conversion"),
            Error::I2c(e) => write!(f, "I2C bus error: {e:?}"),
            Error::InvalidParameter(e) => write!(f, "{e}"),
            Error::BufferLengthMismatch(e) => write!(f, "{e}"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}

/// How many bus reads to spend waiting for the device to flag a fresh
/// conversion before giving up with [Error::Timeout].
///
/// Polling is back to back, without delays. At 100kHz one 18 bit read takes
/// around half a millisecond and an 18 bit conversion takes around 267ms,
/// so the default leaves several conversions worth of headroom even on a
/// 400kHz bus.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PollPolicy {
    max_attempts: u32,
}

impl PollPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 4096;

    /// Allow up to `max_attempts` reads per sample. At least one read is
    /// always made.
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::attempts(Self::DEFAULT_ATTEMPTS)
    }
}

/// Blocking driver for one MCP3424
pub struct Mcp3424<I> {
    i2c: I,
    config: ChipConfig,
    poll: PollPolicy,
}

impl<I> Mcp3424<I>
where
    I: I2c,
{
    /// Create a new [Mcp3424] with the given [Address] and [I2c] implementation.
    ///
    /// The chip starts out on channel 1, 12 bit, continuous conversion and
    /// gain x1. Nothing is sent until the first configure or read.
    pub fn new(i2c: I, addr: Address) -> Self {
        Self::with_config(i2c, ChipConfig::new(addr))
    }

    /// Create a new [Mcp3424] from a raw 7-bit address, handing the bus back
    /// if the address is not one the chip can be strapped to.
    pub fn from_addr(i2c: I, addr: u8) -> Result<Self, (I, InvalidParameter)> {
        match Address::try_from(addr) {
            Ok(addr) => Ok(Self::new(i2c, addr)),
            Err(e) => Err((i2c, e)),
        }
    }

    pub fn with_config(i2c: I, config: ChipConfig) -> Self {
        Self {
            i2c,
            config,
            poll: PollPolicy::default(),
        }
    }

    pub fn config(&self) -> &ChipConfig {
        &self.config
    }

    /// Change settings. They reach the device on the next configure or read.
    pub fn config_mut(&mut self) -> &mut ChipConfig {
        &mut self.config
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    pub fn set_poll_policy(&mut self, poll: PollPolicy) {
        self.poll = poll;
    }

    /// Write the current settings to the device without reading a sample
    pub fn configure(&mut self) -> Result<(), Error<I::Error>> {
        let addr = self.config.address().into_addr();
        let config = self.config.config_byte();
        debug!("mcp3424 {addr:#04x}: configure {config:#010b}");
        self.i2c.write(addr, &[config]).map_err(Error::I2c)
    }

    /// Apply the current settings and return the next fresh sample in raw
    /// counts, signed.
    ///
    /// In continuous mode every poll is a combined write/read: the
    /// configuration byte goes out, then the sample and its config echo come
    /// back. Samples whose echo still reports stale data are dropped and the
    /// read is repeated, up to the [PollPolicy] limit.
    ///
    /// In one-shot mode a conversion is started first, then the device is
    /// polled with plain reads so the conversion is not restarted.
    ///
    /// Bus errors end the read immediately and are never retried.
    ///
    /// The range of the result depends on the sample rate:
    ///
    /// | Sample Rate | Min Value | Max Value |
    /// | ---:        | ---:      | ---:      |
    /// | 12 bit      | -2,047    | 2,047     |
    /// | 14 bit      | -8,191    | 8,191     |
    /// | 16 bit      | -32,767   | 32,767    |
    /// | 18 bit      | -131,071  | 131,071   |
    pub fn read_raw(&mut self) -> Result<i32, Error<I::Error>> {
        let addr = self.config.address().into_addr();
        let rate = self.config.sample_rate();
        let config = self.config.config_byte();
        let oneshot = self.config.conversion_mode() == ConversionMode::OneShot;

        if oneshot {
            let start = self.config.write_settings(Start::StartConversion).to_value();
            debug!("mcp3424 {addr:#04x}: start conversion {start:#010b}");
            self.i2c.write(addr, &[start]).map_err(Error::I2c)?;
        }

        let mut buf = [0u8; 4];
        let buf = &mut buf[..rate.buffer_len()];
        for attempt in 1..=self.poll.max_attempts() {
            if oneshot {
                self.i2c.read(addr, buf).map_err(Error::I2c)?;
            } else {
                self.i2c
                    .write_read(addr, &[config], buf)
                    .map_err(Error::I2c)?;
            }

            let value = codec::decode_sample(rate, buf)?;
            if codec::is_conversion_ready(rate, buf) {
                return Ok(value);
            }
            trace!("mcp3424 {addr:#04x}: stale sample, attempt {attempt}");
        }

        warn!(
            "mcp3424 {addr:#04x}: no fresh sample after {} reads",
            self.poll.max_attempts()
        );
        Err(Error::Timeout)
    }

    /// Give back the I2C bus
    pub fn release(self) -> I {
        self.i2c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Channel, Gain, SampleRate};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn configure_writes_config_byte() {
        let expectations = [
            I2cTransaction::write(0x68, vec![0x10]),
            I2cTransaction::write(0x68, vec![0b0111_0110]),
        ];
        let mut adc = Mcp3424::new(I2cMock::new(&expectations), Address::A68);

        adc.configure().unwrap();
        adc.config_mut().set_channel(Channel::Ch4);
        adc.config_mut().set_sample_rate(SampleRate::Bits14);
        adc.config_mut().set_gain(Gain::X4);
        adc.configure().unwrap();

        adc.release().done();
    }

    #[test]
    fn read_raw_continuous() {
        let expectations = [I2cTransaction::write_read(
            0x69,
            vec![0x10],
            vec![0x00, 0x64, 0x10],
        )];
        let mut adc = Mcp3424::new(I2cMock::new(&expectations), Address::A69);

        assert_eq!(adc.read_raw(), Ok(100));

        adc.release().done();
    }

    #[test]
    fn read_raw_skips_stale_sample() {
        let expectations = [
            I2cTransaction::write_read(0x68, vec![0x10], vec![0x00, 0x01, 0x90]),
            I2cTransaction::write_read(0x68, vec![0x10], vec![0x00, 0x02, 0x10]),
        ];
        let mut adc = Mcp3424::new(I2cMock::new(&expectations), Address::A68);

        assert_eq!(adc.read_raw(), Ok(2));

        adc.release().done();
    }

    #[test]
    fn read_raw_18_bit_uses_four_bytes() {
        let expectations = [I2cTransaction::write_read(
            0x68,
            vec![0x1C],
            vec![0x02, 0x00, 0x01, 0x1C],
        )];
        let mut adc = Mcp3424::new(I2cMock::new(&expectations), Address::A68);
        adc.config_mut().set_sample_rate(SampleRate::Bits18);

        assert_eq!(adc.read_raw(), Ok(-1));

        adc.release().done();
    }

    #[test]
    fn read_raw_times_out() {
        let expectations = [
            I2cTransaction::write_read(0x68, vec![0x10], vec![0x00, 0x01, 0x90]),
            I2cTransaction::write_read(0x68, vec![0x10], vec![0x00, 0x01, 0x90]),
            I2cTransaction::write_read(0x68, vec![0x10], vec![0x00, 0x01, 0x90]),
        ];
        let mut adc = Mcp3424::new(I2cMock::new(&expectations), Address::A68);
        adc.set_poll_policy(PollPolicy::attempts(3));

        assert_eq!(adc.read_raw(), Err(Error::Timeout));

        adc.release().done();
    }

    #[test]
    fn bus_errors_are_not_retried() {
        let expectations = [
            I2cTransaction::write_read(0x68, vec![0x10], vec![0x00, 0x00, 0x00])
                .with_error(ErrorKind::Other),
        ];
        let mut adc = Mcp3424::new(I2cMock::new(&expectations), Address::A68);

        assert_eq!(adc.read_raw(), Err(Error::I2c(ErrorKind::Other)));

        adc.release().done();
    }

    #[test]
    fn read_raw_one_shot() {
        let expectations = [
            I2cTransaction::write(0x6A, vec![0b1010_0000]),
            I2cTransaction::read(0x6A, vec![0x00, 0x00, 0xA0]),
            I2cTransaction::read(0x6A, vec![0x08, 0x05, 0x20]),
        ];
        let mut adc = Mcp3424::new(I2cMock::new(&expectations), Address::A6A);
        adc.config_mut().set_conversion_mode(ConversionMode::OneShot);
        adc.config_mut().set_channel(Channel::Ch2);

        assert_eq!(adc.read_raw(), Ok(-5));

        adc.release().done();
    }

    #[test]
    fn read_raw_one_shot_times_out() {
        let expectations = [
            I2cTransaction::write(0x68, vec![0x80]),
            I2cTransaction::read(0x68, vec![0x00, 0x00, 0x80]),
            I2cTransaction::read(0x68, vec![0x00, 0x00, 0x80]),
        ];
        let mut adc = Mcp3424::new(I2cMock::new(&expectations), Address::A68);
        adc.config_mut().set_conversion_mode(ConversionMode::OneShot);
        adc.set_poll_policy(PollPolicy::attempts(2));

        assert_eq!(adc.read_raw(), Err(Error::Timeout));

        adc.release().done();
    }

    #[test]
    fn one_shot_start_error_skips_polling() {
        let expectations =
            [I2cTransaction::write(0x68, vec![0x80]).with_error(ErrorKind::Other)];
        let mut adc = Mcp3424::new(I2cMock::new(&expectations), Address::A68);
        adc.config_mut().set_conversion_mode(ConversionMode::OneShot);

        assert_eq!(adc.read_raw(), Err(Error::I2c(ErrorKind::Other)));

        adc.release().done();
    }

    #[test]
    fn from_addr_validates() {
        let adc = Mcp3424::from_addr(I2cMock::new(&[]), 0x6F).ok().unwrap();
        assert_eq!(adc.config().address(), Address::A6F);
        adc.release().done();

        let (mut i2c, err) = Mcp3424::from_addr(I2cMock::new(&[]), 0x48).err().unwrap();
        assert_eq!(err, InvalidParameter::Address(0x48));
        i2c.done();
    }

    #[test]
    fn poll_policy_makes_at_least_one_read() {
        assert_eq!(PollPolicy::attempts(0).max_attempts(), 1);
        assert_eq!(
            PollPolicy::default().max_attempts(),
            PollPolicy::DEFAULT_ATTEMPTS
        );
    }
}
