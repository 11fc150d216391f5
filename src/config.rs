//! Configuration types read from and written to the MCP3424
//!
//! Every setting lives in a single configuration byte:
//!
//! | Bit   | Field                                  |
//! | :---  | :---                                   |
//! | 7     | `RDY`: start conversion / data ready   |
//! | 6-5   | Channel select                         |
//! | 4     | Conversion mode                        |
//! | 3-2   | Sample rate (resolution)               |
//! | 1-0   | PGA gain                               |

use core::fmt;

pub(crate) const READY_MASK: u8 = 0b1000_0000;
pub(crate) const CHANNEL_MASK: u8 = 0b0110_0000;
pub(crate) const MODE_MASK: u8 = 0b0001_0000;
pub(crate) const RATE_MASK: u8 = 0b0000_1100;
pub(crate) const GAIN_MASK: u8 = 0b0000_0011;

/// A raw value that does not name any of the settings the device supports.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InvalidParameter {
    /// Per-chip channel, must be 1-4
    Channel(u8),
    /// Board channel, must be 1-8
    LogicalChannel(u8),
    /// Resolution in bits, must be 12, 14, 16 or 18
    SampleRate(u8),
    /// Gain multiplier, must be 1, 2, 4 or 8
    Gain(u8),
    /// Bus address, must be 0x68-0x6F
    Address(u8),
}

impl fmt::Display for InvalidParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            InvalidParameter::Channel(v) => {
                write!(f, "invalid channel: {v}. Allowed values: 1, 2, 3, 4")
            }
            InvalidParameter::LogicalChannel(v) => {
                write!(f, "invalid channel: {v}. Allowed values: 1, 2, 3, 4, 5, 6, 7, 8")
            }
            InvalidParameter::SampleRate(v) => {
                write!(f, "invalid sample rate: {v}. Allowed values: 12, 14, 16, 18")
            }
            InvalidParameter::Gain(v) => {
                write!(f, "invalid gain: {v}. Allowed values: 1, 2, 4, 8")
            }
            InvalidParameter::Address(v) => write!(
                f,
                "invalid address: {v:#04x}. Allowed values: 0x68, 0x69, 0x6a, 0x6b, 0x6c, 0x6d, 0x6e, 0x6f"
            ),
        }
    }
}

impl core::error::Error for InvalidParameter {}

/// The MCP3424 has three address pins, giving eight possible addresses.
/// On the ADC Pi board these are set with jumpers, and the two chips default
/// to `0x68` and `0x69`.
///
/// | Address | Address (binary) | Address (hex, right aligned) |
/// | :---    | :---             | :---                         |
/// | A68     | `0b1101_000x`    | `0x68`                       |
/// | A69     | `0b1101_001x`    | `0x69`                       |
/// | A6A     | `0b1101_010x`    | `0x6A`                       |
/// | A6B     | `0b1101_011x`    | `0x6B`                       |
/// | A6C     | `0b1101_100x`    | `0x6C`                       |
/// | A6D     | `0b1101_101x`    | `0x6D`                       |
/// | A6E     | `0b1101_110x`    | `0x6E`                       |
/// | A6F     | `0b1101_111x`    | `0x6F`                       |
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Address {
    A68,
    A69,
    A6A,
    A6B,
    A6C,
    A6D,
    A6E,
    A6F,
}

impl Address {
    /// Convert into the right-aligned 7-bit address
    pub fn into_addr(&self) -> u8 {
        match self {
            Address::A68 => 0x68,
            Address::A69 => 0x69,
            Address::A6A => 0x6A,
            Address::A6B => 0x6B,
            Address::A6C => 0x6C,
            Address::A6D => 0x6D,
            Address::A6E => 0x6E,
            Address::A6F => 0x6F,
        }
    }

    /// Address byte for raw character-device access, where the three
    /// selectable address bits sit in bits 1-3 and bit 0 carries the
    /// transfer direction.
    pub fn address_byte(&self, rw: ReadWrite) -> u8 {
        let select = (self.into_addr() & 0b0000_0111) << 1;
        select
            | match rw {
                ReadWrite::Write => 0b0000_0000,
                ReadWrite::Read => 0b0000_0001,
            }
    }
}

impl TryFrom<u8> for Address {
    type Error = InvalidParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x68 => Ok(Address::A68),
            0x69 => Ok(Address::A69),
            0x6A => Ok(Address::A6A),
            0x6B => Ok(Address::A6B),
            0x6C => Ok(Address::A6C),
            0x6D => Ok(Address::A6D),
            0x6E => Ok(Address::A6E),
            0x6F => Ok(Address::A6F),
            _ => Err(InvalidParameter::Address(value)),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ReadWrite {
    /// Bit 0 clear
    Write,
    /// Bit 0 set
    Read,
}

/// Resolution of each conversion. Higher resolutions convert more slowly:
///
/// | Sample Rate | Samples/s | Sample bytes | LSB          |
/// | :---        | ---:      | :--:         | ---:         |
/// | 12 bit      | 240       | 3            | 0.5 mV       |
/// | 14 bit      | 60        | 3            | 125 µV       |
/// | 16 bit      | 15        | 3            | 31.25 µV     |
/// | 18 bit      | 3.75      | 4            | 7.8125 µV    |
///
/// The sample byte count includes the trailing configuration echo.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SampleRate {
    /// R/W: 00
    Bits12,
    /// R/W: 01
    Bits14,
    /// R/W: 10
    Bits16,
    /// R/W: 11
    Bits18,
}

impl SampleRate {
    /// Resolution in bits, including the sign bit
    pub fn bits(&self) -> u8 {
        match self {
            SampleRate::Bits12 => 12,
            SampleRate::Bits14 => 14,
            SampleRate::Bits16 => 16,
            SampleRate::Bits18 => 18,
        }
    }

    /// Number of bytes the device returns per sample, config echo included
    pub fn buffer_len(&self) -> usize {
        match self {
            SampleRate::Bits18 => 4,
            _ => 3,
        }
    }

    /// Voltage step of one raw count, in volts
    pub fn lsb(&self) -> f32 {
        match self {
            SampleRate::Bits12 => 0.0005,
            SampleRate::Bits14 => 0.000125,
            SampleRate::Bits16 => 0.000_031_25,
            SampleRate::Bits18 => 0.000_007_812_5,
        }
    }

    pub(crate) fn register_bits(&self) -> u8 {
        match self {
            SampleRate::Bits12 => 0b0000_0000,
            SampleRate::Bits14 => 0b0000_0100,
            SampleRate::Bits16 => 0b0000_1000,
            SampleRate::Bits18 => 0b0000_1100,
        }
    }
}

impl TryFrom<u8> for SampleRate {
    type Error = InvalidParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            12 => Ok(SampleRate::Bits12),
            14 => Ok(SampleRate::Bits14),
            16 => Ok(SampleRate::Bits16),
            18 => Ok(SampleRate::Bits18),
            _ => Err(InvalidParameter::SampleRate(value)),
        }
    }
}

/// Input channel of a single chip.
///
/// The select bits are listed low bit first below; the table is what the
/// board expects and is kept as-is.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Channel {
    /// bit5, bit6: 00
    Ch1,
    /// bit5, bit6: 10
    Ch2,
    /// bit5, bit6: 01
    Ch3,
    /// bit5, bit6: 11
    Ch4,
}

impl Channel {
    pub fn number(&self) -> u8 {
        match self {
            Channel::Ch1 => 1,
            Channel::Ch2 => 2,
            Channel::Ch3 => 3,
            Channel::Ch4 => 4,
        }
    }

    pub(crate) fn register_bits(&self) -> u8 {
        match self {
            Channel::Ch1 => 0b0000_0000,
            Channel::Ch2 => 0b0010_0000,
            Channel::Ch3 => 0b0100_0000,
            Channel::Ch4 => 0b0110_0000,
        }
    }
}

impl TryFrom<u8> for Channel {
    type Error = InvalidParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Channel::Ch1),
            2 => Ok(Channel::Ch2),
            3 => Ok(Channel::Ch3),
            4 => Ok(Channel::Ch4),
            _ => Err(InvalidParameter::Channel(value)),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Gain {
    /// R/W: 00
    X1,
    /// R/W: 01
    X2,
    /// R/W: 10
    X4,
    /// R/W: 11
    X8,
}

impl Gain {
    /// Divisor used when scaling raw counts back to volts.
    ///
    /// These are half the nominal gain; the board's input divider is folded in.
    pub fn pga(&self) -> f32 {
        match self {
            Gain::X1 => 0.5,
            Gain::X2 => 1.0,
            Gain::X4 => 2.0,
            Gain::X8 => 4.0,
        }
    }

    pub(crate) fn register_bits(&self) -> u8 {
        match self {
            Gain::X1 => 0b0000_0000,
            Gain::X2 => 0b0000_0001,
            Gain::X4 => 0b0000_0010,
            Gain::X8 => 0b0000_0011,
        }
    }
}

impl TryFrom<u8> for Gain {
    type Error = InvalidParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Gain::X1),
            2 => Ok(Gain::X2),
            4 => Ok(Gain::X4),
            8 => Ok(Gain::X8),
            _ => Err(InvalidParameter::Gain(value)),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConversionMode {
    /// R/W: 1
    Continuous,
    /// R/W: 0
    OneShot,
}

impl ConversionMode {
    pub(crate) fn register_bits(&self) -> u8 {
        match self {
            ConversionMode::Continuous => 0b0001_0000,
            ConversionMode::OneShot => 0b0000_0000,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Start {
    /// Write: 0, nothing happens
    DontStart,
    /// Write: 1, conversion started (one-shot mode only)
    StartConversion,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DataReady {
    /// Read: 0, New unread data
    FreshData,
    /// Read: 1, Data has been read, or no conversion has finished yet
    StaleData,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct WriteSettings {
    pub start: Start,
    pub channel: Channel,
    pub mode: ConversionMode,
    pub rate: SampleRate,
    pub gain: Gain,
}

impl Default for WriteSettings {
    fn default() -> Self {
        Self {
            start: Start::DontStart,
            channel: Channel::Ch1,
            mode: ConversionMode::Continuous,
            rate: SampleRate::Bits12,
            gain: Gain::X1,
        }
    }
}

impl WriteSettings {
    pub fn to_value(&self) -> u8 {
        let mut output = 0u8;
        output |= match self.start {
            Start::DontStart => 0b0000_0000,
            Start::StartConversion => READY_MASK,
        };
        output |= self.channel.register_bits();
        output |= self.mode.register_bits();
        output |= self.rate.register_bits();
        output |= self.gain.register_bits();
        output
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ReadSettings {
    pub n_rdy: DataReady,
    pub channel: Channel,
    pub mode: ConversionMode,
    pub rate: SampleRate,
    pub gain: Gain,
}

impl From<u8> for ReadSettings {
    fn from(value: u8) -> Self {
        let n_rdy = if (value & READY_MASK) == 0 {
            DataReady::FreshData
        } else {
            DataReady::StaleData
        };

        let channel = match value & CHANNEL_MASK {
            0b0000_0000 => Channel::Ch1,
            0b0010_0000 => Channel::Ch2,
            0b0100_0000 => Channel::Ch3,
            0b0110_0000 => Channel::Ch4,
            _ => unreachable!(),
        };

        let mode = if (value & MODE_MASK) == 0 {
            ConversionMode::OneShot
        } else {
            ConversionMode::Continuous
        };

        let rate = match value & RATE_MASK {
            0b0000_0000 => SampleRate::Bits12,
            0b0000_0100 => SampleRate::Bits14,
            0b0000_1000 => SampleRate::Bits16,
            0b0000_1100 => SampleRate::Bits18,
            _ => unreachable!(),
        };

        let gain = match value & GAIN_MASK {
            0b0000_0000 => Gain::X1,
            0b0000_0001 => Gain::X2,
            0b0000_0010 => Gain::X4,
            0b0000_0011 => Gain::X8,
            _ => unreachable!(),
        };

        Self {
            n_rdy,
            channel,
            mode,
            rate,
            gain,
        }
    }
}

/// Settings of one chip, kept in sync with the configuration byte that
/// gets written to it.
///
/// Every setter updates the typed field and the matching bits of the byte
/// together, leaving the other bits untouched.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ChipConfig {
    address: Address,
    channel: Channel,
    rate: SampleRate,
    gain: Gain,
    mode: ConversionMode,
    config: u8,
}

impl ChipConfig {
    /// Create the power-on configuration for a chip at `address`:
    /// channel 1, 12 bit, continuous conversion, gain x1.
    pub fn new(address: Address) -> Self {
        let mut cfg = Self {
            address,
            channel: Channel::Ch1,
            rate: SampleRate::Bits12,
            gain: Gain::X1,
            mode: ConversionMode::Continuous,
            config: 0,
        };
        cfg.set_channel(Channel::Ch1);
        cfg.set_sample_rate(SampleRate::Bits12);
        cfg.set_conversion_mode(ConversionMode::Continuous);
        cfg.set_gain(Gain::X1);
        cfg
    }

    fn update(&mut self, mask: u8, bits: u8) {
        self.config = (self.config & !mask) | (bits & mask);
    }

    pub fn set_channel(&mut self, channel: Channel) {
        self.channel = channel;
        self.update(CHANNEL_MASK, channel.register_bits());
    }

    pub fn set_sample_rate(&mut self, rate: SampleRate) {
        self.rate = rate;
        self.update(RATE_MASK, rate.register_bits());
    }

    pub fn set_gain(&mut self, gain: Gain) {
        self.gain = gain;
        self.update(GAIN_MASK, gain.register_bits());
    }

    pub fn set_conversion_mode(&mut self, mode: ConversionMode) {
        self.mode = mode;
        self.update(MODE_MASK, mode.register_bits());
    }

    pub fn set_address(&mut self, address: Address) {
        self.address = address;
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.rate
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    pub fn conversion_mode(&self) -> ConversionMode {
        self.mode
    }

    /// The configuration byte as written to the device, `RDY` clear
    pub fn config_byte(&self) -> u8 {
        self.config
    }

    pub fn lsb(&self) -> f32 {
        self.rate.lsb()
    }

    pub fn pga(&self) -> f32 {
        self.gain.pga()
    }

    /// Volts represented by one raw count at the current rate and gain
    pub fn volts_per_count(&self) -> f32 {
        self.lsb() / self.pga()
    }

    pub fn write_settings(&self, start: Start) -> WriteSettings {
        WriteSettings {
            start,
            channel: self.channel,
            mode: self.mode,
            rate: self.rate,
            gain: self.gain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ChipConfig::new(Address::A68);
        assert_eq!(cfg.config_byte(), 0x10);
        assert_eq!(cfg.channel(), Channel::Ch1);
        assert_eq!(cfg.sample_rate(), SampleRate::Bits12);
        assert_eq!(cfg.gain(), Gain::X1);
        assert_eq!(cfg.conversion_mode(), ConversionMode::Continuous);
        assert_eq!(cfg.config_byte(), WriteSettings::default().to_value());
    }

    #[test]
    fn channel_select_table() {
        let mut cfg = ChipConfig::new(Address::A68);
        let expected = [
            (Channel::Ch1, 0x10),
            (Channel::Ch2, 0x30),
            (Channel::Ch3, 0x50),
            (Channel::Ch4, 0x70),
        ];
        for (ch, byte) in expected {
            cfg.set_channel(ch);
            assert_eq!(cfg.config_byte(), byte, "{ch:?}");
        }
    }

    #[test]
    fn setters_only_touch_their_bits() {
        let mut cfg = ChipConfig::new(Address::A6C);
        cfg.set_channel(Channel::Ch4);
        cfg.set_sample_rate(SampleRate::Bits18);
        cfg.set_gain(Gain::X8);
        assert_eq!(cfg.config_byte(), 0b0111_1111);

        cfg.set_sample_rate(SampleRate::Bits14);
        assert_eq!(cfg.config_byte(), 0b0111_0111);

        cfg.set_gain(Gain::X2);
        assert_eq!(cfg.config_byte(), 0b0111_0101);

        cfg.set_conversion_mode(ConversionMode::OneShot);
        assert_eq!(cfg.config_byte(), 0b0110_0101);

        cfg.set_channel(Channel::Ch2);
        assert_eq!(cfg.config_byte(), 0b0010_0101);
        assert_eq!(cfg.address(), Address::A6C);
    }

    #[test]
    fn scale_factors() {
        let mut cfg = ChipConfig::new(Address::A68);
        assert_eq!(cfg.lsb(), 0.0005);
        assert_eq!(cfg.pga(), 0.5);
        assert!((cfg.volts_per_count() - 0.001).abs() < 1e-9);

        cfg.set_sample_rate(SampleRate::Bits18);
        cfg.set_gain(Gain::X8);
        assert_eq!(cfg.lsb(), 0.0000078125);
        assert_eq!(cfg.pga(), 4.0);
    }

    #[test]
    fn raw_values_are_validated() {
        assert_eq!(SampleRate::try_from(16), Ok(SampleRate::Bits16));
        assert_eq!(SampleRate::try_from(10), Err(InvalidParameter::SampleRate(10)));
        assert_eq!(Channel::try_from(4), Ok(Channel::Ch4));
        assert_eq!(Channel::try_from(0), Err(InvalidParameter::Channel(0)));
        assert_eq!(Channel::try_from(5), Err(InvalidParameter::Channel(5)));
        assert_eq!(Gain::try_from(8), Ok(Gain::X8));
        assert_eq!(Gain::try_from(3), Err(InvalidParameter::Gain(3)));
        assert_eq!(Address::try_from(0x6B), Ok(Address::A6B));
        assert_eq!(Address::try_from(0x70), Err(InvalidParameter::Address(0x70)));
    }

    #[test]
    fn invalid_parameter_lists_allowed_values() {
        let msg = InvalidParameter::Gain(3).to_string();
        assert_eq!(msg, "invalid gain: 3. Allowed values: 1, 2, 4, 8");
        let msg = InvalidParameter::Address(0x20).to_string();
        assert!(msg.starts_with("invalid address: 0x20."));
        assert!(msg.contains("0x6f"));
    }

    #[test]
    fn address_byte() {
        assert_eq!(Address::A68.address_byte(ReadWrite::Write), 0b0000);
        assert_eq!(Address::A68.address_byte(ReadWrite::Read), 0b0001);
        assert_eq!(Address::A69.address_byte(ReadWrite::Write), 0b0010);
        assert_eq!(Address::A6A.address_byte(ReadWrite::Write), 0b0100);
        assert_eq!(Address::A6D.address_byte(ReadWrite::Read), 0b1011);
        assert_eq!(Address::A6F.address_byte(ReadWrite::Read), 0b1111);
    }

    #[test]
    fn start_bit() {
        let cfg = ChipConfig::new(Address::A68);
        let start = cfg.write_settings(Start::StartConversion).to_value();
        assert_eq!(start, cfg.config_byte() | 0x80);
        assert_eq!(cfg.write_settings(Start::DontStart).to_value(), cfg.config_byte());
    }
}
