//! MPEG audio frame headers.
//!
//! ## Layout
//!
//! Every frame starts with a 32-bit header: 11 sync bits, version, layer,
//! protection flag, bitrate index, sampling frequency index, padding,
//! private bit, channel mode, mode extension, copyright, original and
//! emphasis. A 16-bit CRC follows when the protection flag is clear.
//!
//! ## Frame Length
//!
//! - **Layer I**: `(12 * bitrate / sample_rate + padding) * 4`
//! - **Layer II**: `144 * bitrate / sample_rate + padding`
//! - **Layer III**: as Layer II for MPEG-1, half the coefficient for
//!   MPEG-2 and MPEG-2.5
//!
//! Free format streams (bitrate index 0) carry no length in the header and
//! are rejected.

use std::fmt;

use anyhow::{Result, bail};

use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::HeaderError;

/// Size of the fixed frame header in bytes.
pub const HEADER_BYTES: usize = 4;

/// Largest frame any non-free-format header can describe.
///
/// MPEG-2.5 Layer II at 160 kbps and 8 kHz with padding.
pub const MAX_FRAME_BYTES: usize = 2881;

/// Most samples a single frame decodes to, per channel.
pub const MAX_SAMPLES_PER_CHANNEL: usize = 1152;

/// Most interleaved samples a single frame decodes to.
pub const MAX_FRAME_SAMPLES: usize = MAX_SAMPLES_PER_CHANNEL * 2;

const BITRATES_V1: [[u16; 15]; 3] = [
    [
        0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448,
    ],
    [
        0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384,
    ],
    [
        0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
    ],
];

const BITRATES_V2: [[u16; 15]; 2] = [
    [
        0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256,
    ],
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
];

const SAMPLE_RATES_V1: [u32; 3] = [44100, 48000, 32000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    I,
    II,
    III,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

impl ChannelMode {
    pub fn channels(self) -> u16 {
        match self {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Version::Mpeg1 => "MPEG-1",
            Version::Mpeg2 => "MPEG-2",
            Version::Mpeg25 => "MPEG-2.5",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::I => "Layer I",
            Layer::II => "Layer II",
            Layer::III => "Layer III",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelMode::Stereo => "Stereo",
            ChannelMode::JointStereo => "Joint stereo",
            ChannelMode::DualChannel => "Dual channel",
            ChannelMode::Mono => "Mono",
        };
        write!(f, "{name}")
    }
}

/// Parsed fixed header of one MPEG audio frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: Version,
    pub layer: Layer,
    pub crc_protected: bool,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub mode: ChannelMode,
    pub mode_extension: u8,
    pub copyright: bool,
    pub original: bool,
    pub emphasis: u8,
}

impl FrameHeader {
    /// Parses the header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_BYTES {
            bail!(HeaderError::Truncated(data.len()));
        }

        let reader = &mut BsIoSliceReader::from_slice(&data[..HEADER_BYTES]);
        Self::read(reader)
    }

    fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        let sync: u16 = reader.get_n(11)?;
        if sync != 0x7FF {
            bail!(HeaderError::NoSync(sync << 5));
        }

        let version = match reader.get_n::<u8>(2)? {
            0b00 => Version::Mpeg25,
            0b10 => Version::Mpeg2,
            0b11 => Version::Mpeg1,
            _ => bail!(HeaderError::ReservedVersion),
        };

        let layer = match reader.get_n::<u8>(2)? {
            0b01 => Layer::III,
            0b10 => Layer::II,
            0b11 => Layer::I,
            _ => bail!(HeaderError::ReservedLayer),
        };

        let crc_protected = !reader.get()?;

        let bitrate_index: usize = reader.get_n::<u8>(4)? as usize;
        let bitrate_kbps = match bitrate_index {
            0 => bail!(HeaderError::FreeFormat),
            15 => bail!(HeaderError::BadBitrate),
            i => Self::bitrate_table(version, layer)[i] as u32,
        };

        let sample_rate_index: usize = reader.get_n::<u8>(2)? as usize;
        if sample_rate_index == 3 {
            bail!(HeaderError::BadSampleRate);
        }
        let sample_rate = match version {
            Version::Mpeg1 => SAMPLE_RATES_V1[sample_rate_index],
            Version::Mpeg2 => SAMPLE_RATES_V1[sample_rate_index] / 2,
            Version::Mpeg25 => SAMPLE_RATES_V1[sample_rate_index] / 4,
        };

        let padding = reader.get()?;
        reader.skip_n(1)?;

        let mode = match reader.get_n::<u8>(2)? {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        Ok(Self {
            version,
            layer,
            crc_protected,
            bitrate_kbps,
            sample_rate,
            padding,
            mode,
            mode_extension: reader.get_n(2)?,
            copyright: reader.get()?,
            original: reader.get()?,
            emphasis: reader.get_n(2)?,
        })
    }

    /// Locates the first valid header in `data`.
    ///
    /// Returns the offset of the header and the parsed header. The frame it
    /// describes may extend past the end of `data`.
    pub fn find(data: &[u8]) -> Option<(usize, Self)> {
        let last = data.len().checked_sub(HEADER_BYTES)?;

        (0..=last)
            .filter(|&i| data[i] == 0xFF && data[i + 1] & 0xE0 == 0xE0)
            .find_map(|i| Self::parse(&data[i..]).ok().map(|header| (i, header)))
    }

    fn bitrate_table(version: Version, layer: Layer) -> &'static [u16; 15] {
        match (version, layer) {
            (Version::Mpeg1, Layer::I) => &BITRATES_V1[0],
            (Version::Mpeg1, Layer::II) => &BITRATES_V1[1],
            (Version::Mpeg1, Layer::III) => &BITRATES_V1[2],
            (_, Layer::I) => &BITRATES_V2[0],
            (_, _) => &BITRATES_V2[1],
        }
    }

    pub fn channels(&self) -> u16 {
        self.mode.channels()
    }

    /// Samples per channel carried by the frame.
    pub fn samples_per_frame(&self) -> usize {
        match (self.layer, self.version) {
            (Layer::I, _) => 384,
            (Layer::II, _) | (Layer::III, Version::Mpeg1) => 1152,
            (Layer::III, _) => 576,
        }
    }

    /// Total frame length in bytes, header included.
    pub fn frame_bytes(&self) -> usize {
        let bitrate = self.bitrate_kbps as usize * 1000;
        let sample_rate = self.sample_rate as usize;
        let padding = self.padding as usize;

        match (self.layer, self.version) {
            (Layer::I, _) => (12 * bitrate / sample_rate + padding) * 4,
            (Layer::II, _) | (Layer::III, Version::Mpeg1) => 144 * bitrate / sample_rate + padding,
            (Layer::III, _) => 72 * bitrate / sample_rate + padding,
        }
    }

    /// Frame duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples_per_frame() as f64 / self.sample_rate as f64
    }
}
