//! The ADC Pi board: two MCP3424 chips presented as channels 1-8
//!
//! | Board channel | Chip | Chip channel |
//! | :---          | :--- | :---         |
//! | 1-4           | A    | 1-4          |
//! | 5-8           | B    | 1-4          |

use embedded_hal::i2c::I2c;
use log::debug;

use crate::config::{Address, Channel, ConversionMode, Gain, InvalidParameter, SampleRate};
use crate::{Error, Mcp3424, PollPolicy};

/// Empirical correction for the board's input divider and reference.
pub const BOARD_SCALE: f32 = 2.471;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ChipSelect {
    /// Channels 1-4
    A,
    /// Channels 5-8
    B,
}

/// Map a board channel onto the chip and chip channel that serve it
pub fn resolve_channel(channel: u8) -> Result<(ChipSelect, Channel), InvalidParameter> {
    match channel {
        1..=4 => Ok((ChipSelect::A, Channel::try_from(channel)?)),
        5..=8 => Ok((ChipSelect::B, Channel::try_from(channel - 4)?)),
        _ => Err(InvalidParameter::LogicalChannel(channel)),
    }
}

/// A voltage reading along with the raw count it was scaled from
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Reading {
    pub volts: f32,
    pub raw: i32,
}

/// Both chips of an ADC Pi board.
///
/// Each chip owns its own bus handle. When both chips hang off the same
/// bus, hand in two handles to it, for example two opens of the same
/// `/dev/i2c-N` device.
pub struct DualAdc<I> {
    a: Mcp3424<I>,
    b: Mcp3424<I>,
    channel: u8,
}

impl<I> DualAdc<I>
where
    I: I2c,
{
    pub fn new(i2c_a: I, addr_a: Address, i2c_b: I, addr_b: Address) -> Self {
        Self::from_chips(Mcp3424::new(i2c_a, addr_a), Mcp3424::new(i2c_b, addr_b))
    }

    pub fn from_chips(a: Mcp3424<I>, b: Mcp3424<I>) -> Self {
        Self { a, b, channel: 1 }
    }

    /// The last board channel selected
    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn chip(&self, select: ChipSelect) -> &Mcp3424<I> {
        match select {
            ChipSelect::A => &self.a,
            ChipSelect::B => &self.b,
        }
    }

    pub fn chip_mut(&mut self, select: ChipSelect) -> &mut Mcp3424<I> {
        match select {
            ChipSelect::A => &mut self.a,
            ChipSelect::B => &mut self.b,
        }
    }

    /// Select board channel `channel` (1-8) on the chip that serves it.
    ///
    /// Nothing is sent to the device; the next read carries the selection.
    pub fn set_channel(&mut self, channel: u8) -> Result<(), InvalidParameter> {
        self.select(channel).map(|_| ())
    }

    fn select(&mut self, channel: u8) -> Result<ChipSelect, InvalidParameter> {
        let (select, local) = resolve_channel(channel)?;
        self.chip_mut(select).config_mut().set_channel(local);
        self.channel = channel;
        debug!("adcpi: channel {channel} is chip {select:?} channel {}", local.number());
        Ok(select)
    }

    fn read_selected(&mut self, channel: u8) -> Result<(ChipSelect, i32), Error<I::Error>> {
        let select = self.select(channel)?;
        let raw = self.chip_mut(select).read_raw()?;
        Ok((select, raw))
    }

    pub fn set_sample_rate(&mut self, rate: SampleRate) {
        self.a.config_mut().set_sample_rate(rate);
        self.b.config_mut().set_sample_rate(rate);
    }

    pub fn set_gain(&mut self, gain: Gain) {
        self.a.config_mut().set_gain(gain);
        self.b.config_mut().set_gain(gain);
    }

    pub fn set_conversion_mode(&mut self, mode: ConversionMode) {
        self.a.config_mut().set_conversion_mode(mode);
        self.b.config_mut().set_conversion_mode(mode);
    }

    pub fn set_poll_policy(&mut self, poll: PollPolicy) {
        self.a.set_poll_policy(poll);
        self.b.set_poll_policy(poll);
    }

    /// Read board channel `channel` in raw counts.
    /// See [Mcp3424::read_raw] for the ranges.
    pub fn read_raw(&mut self, channel: u8) -> Result<i32, Error<I::Error>> {
        self.read_selected(channel).map(|(_, raw)| raw)
    }

    /// Read board channel `channel` and scale it to volts.
    ///
    /// Negative readings are reported as 0V; [Reading::raw] keeps the sign.
    pub fn read_voltage(&mut self, channel: u8) -> Result<Reading, Error<I::Error>> {
        let (select, raw) = self.read_selected(channel)?;
        let volts = raw as f32 * self.chip(select).config().volts_per_count() * BOARD_SCALE;
        let volts = if volts < 0.0 { 0.0 } else { volts };
        Ok(Reading { volts, raw })
    }

    /// Give back both I2C handles, chip A first
    pub fn release(self) -> (I, I) {
        (self.a.release(), self.b.release())
    }
}
