// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::{error::Error, fmt, str::FromStr, sync::Once};

use tracing::warn;

use super::g711;

/// Guards the diagnostic emitted the first time an unsupported format is encoded.
static UNSUPPORTED_WARNING: Once = Once::new();

/// OSS-style format codes, as reported by classic sound drivers.
pub const AFMT_MU_LAW: u32 = 0x0000_0001;
pub const AFMT_A_LAW: u32 = 0x0000_0002;
pub const AFMT_IMA_ADPCM: u32 = 0x0000_0004;
pub const AFMT_U8: u32 = 0x0000_0008;
pub const AFMT_S16_LE: u32 = 0x0000_0010;
pub const AFMT_S16_BE: u32 = 0x0000_0020;
pub const AFMT_U16_LE: u32 = 0x0000_0080;
pub const AFMT_U16_BE: u32 = 0x0000_0100;

/// The on-the-wire sample encoding a playback device expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// 8-bit G.711 mu-law.
    MuLaw,
    /// 8-bit G.711 A-law.
    ALaw,
    /// Unsigned 8-bit linear.
    U8,
    /// Signed 16-bit little endian.
    S16Le,
    /// Signed 16-bit big endian.
    S16Be,
    /// Unsigned 16-bit little endian.
    U16Le,
    /// Unsigned 16-bit big endian.
    U16Be,
    /// A format we can't produce. Encodes to a single zero byte.
    Unsupported(u32),
}

impl WireFormat {
    /// Maps an OSS format code to a wire format.
    pub fn from_code(code: u32) -> WireFormat {
        match code {
            AFMT_MU_LAW => WireFormat::MuLaw,
            AFMT_A_LAW => WireFormat::ALaw,
            AFMT_U8 => WireFormat::U8,
            AFMT_S16_LE => WireFormat::S16Le,
            AFMT_S16_BE => WireFormat::S16Be,
            AFMT_U16_LE => WireFormat::U16Le,
            AFMT_U16_BE => WireFormat::U16Be,
            other => WireFormat::Unsupported(other),
        }
    }

    /// The OSS format code for this wire format.
    pub fn code(self) -> u32 {
        match self {
            WireFormat::MuLaw => AFMT_MU_LAW,
            WireFormat::ALaw => AFMT_A_LAW,
            WireFormat::U8 => AFMT_U8,
            WireFormat::S16Le => AFMT_S16_LE,
            WireFormat::S16Be => AFMT_S16_BE,
            WireFormat::U16Le => AFMT_U16_LE,
            WireFormat::U16Be => AFMT_U16_BE,
            WireFormat::Unsupported(code) => code,
        }
    }

    /// Number of bytes each encoded sample occupies.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            WireFormat::S16Le | WireFormat::S16Be | WireFormat::U16Le | WireFormat::U16Be => 2,
            _ => 1,
        }
    }

    pub fn bits_per_sample(self) -> u16 {
        (self.bytes_per_sample() * 8) as u16
    }

    /// Appends the encoding of the given sample to out.
    pub fn encode(self, sample: i16, out: &mut Vec<u8>) {
        match self {
            WireFormat::MuLaw => out.push(g711::linear_to_ulaw(sample)),
            WireFormat::ALaw => out.push(g711::linear_to_alaw(sample)),
            WireFormat::U8 => out.push((sample / 256 + 128) as u8),
            WireFormat::S16Le => out.extend_from_slice(&sample.to_le_bytes()),
            WireFormat::S16Be => out.extend_from_slice(&sample.to_be_bytes()),
            WireFormat::U16Le => out.extend_from_slice(&((sample as u16) ^ 0x8000).to_le_bytes()),
            WireFormat::U16Be => out.extend_from_slice(&((sample as u16) ^ 0x8000).to_be_bytes()),
            WireFormat::Unsupported(code) => {
                UNSUPPORTED_WARNING.call_once(|| {
                    warn!(
                        format = format!("{:#x}", code),
                        "Unsupported wire format, producing silence"
                    );
                });
                out.push(0);
            }
        }
    }

    /// Decodes one sample from the front of bytes. Missing bytes decode as zero.
    pub fn decode(self, bytes: &[u8]) -> i16 {
        let byte = |i: usize| bytes.get(i).copied().unwrap_or(0);
        match self {
            WireFormat::MuLaw => g711::ulaw_to_linear(byte(0)),
            WireFormat::ALaw => g711::alaw_to_linear(byte(0)),
            WireFormat::U8 => (i16::from(byte(0)) - 128) << 8,
            WireFormat::S16Le => i16::from_le_bytes([byte(0), byte(1)]),
            WireFormat::S16Be => i16::from_be_bytes([byte(0), byte(1)]),
            WireFormat::U16Le => (u16::from_le_bytes([byte(0), byte(1)]) ^ 0x8000) as i16,
            WireFormat::U16Be => (u16::from_be_bytes([byte(0), byte(1)]) ^ 0x8000) as i16,
            WireFormat::Unsupported(_) => 0,
        }
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            WireFormat::MuLaw => "mu-law",
            WireFormat::ALaw => "a-law",
            WireFormat::U8 => "u8",
            WireFormat::S16Le => "s16le",
            WireFormat::S16Be => "s16be",
            WireFormat::U16Le => "u16le",
            WireFormat::U16Be => "u16be",
            WireFormat::Unsupported(_) => "unsupported",
        }
    }
}

impl FromStr for WireFormat {
    type Err = Box<dyn Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mu-law" | "mulaw" | "ulaw" => Ok(WireFormat::MuLaw),
            "a-law" | "alaw" => Ok(WireFormat::ALaw),
            "u8" => Ok(WireFormat::U8),
            "s16le" | "s16" => Ok(WireFormat::S16Le),
            "s16be" => Ok(WireFormat::S16Be),
            "u16le" | "u16" => Ok(WireFormat::U16Le),
            "u16be" => Ok(WireFormat::U16Be),
            _ => Err(format!("Unsupported wire format: {}", s).into()),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Unsupported(code) => write!(f, "unsupported ({:#x})", code),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

/// The configuration negotiated with the playback device, plus the volume
/// applied when rendering ticks for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channels per frame
    pub channels: u16,
    /// Sample encoding on the wire
    pub format: WireFormat,
    /// Size of one device fragment in bytes
    pub fragment_size: usize,
    /// Output gain, 0.0 to 1.0
    pub volume: f64,
}

impl PlaybackConfig {
    pub fn bits_per_sample(&self) -> u16 {
        self.format.bits_per_sample()
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.format.bytes_per_sample()
    }

    /// Bytes in one frame: one encoded sample per channel.
    pub fn frame_width(&self) -> usize {
        usize::from(self.channels) * self.bytes_per_sample()
    }

    /// Bytes of audio played per second.
    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.frame_width()
    }
}

impl Default for PlaybackConfig {
    /// 44.1kHz mono signed 16-bit little endian, full volume.
    fn default() -> Self {
        PlaybackConfig {
            sample_rate: 44100,
            channels: 1,
            format: WireFormat::S16Le,
            fragment_size: 512,
            volume: 1.0,
        }
    }
}
