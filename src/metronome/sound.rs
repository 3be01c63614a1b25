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
use std::{
    f64::consts::PI,
    fmt,
    fs::File,
    path::{Path, PathBuf},
};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info};

pub use crate::audio::Waveform;

use super::tickdata;

/// Sound spec name for the bundled tick.
pub const DEFAULT_SOUND: &str = "<default>";
/// Sound spec name for the synthesized sine burst.
pub const SINE_SOUND: &str = "<sine>";

/// Sine burst parameters.
pub const SINE_RATE: u32 = 44100;
pub const SINE_FREQUENCY: f64 = 880.0;
pub const SINE_DURATION: f64 = 0.01;
pub const SINE_FADE: f64 = 0.002;

#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    #[error("sound file {path} is unavailable: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("unable to decode sound file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: SymphoniaError,
    },
}

/// Which waveform the metronome ticks with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SoundSpec {
    #[default]
    Default,
    Sine,
    File(PathBuf),
}

impl SoundSpec {
    /// Parses a sound spec string. Anything other than the two built-in names
    /// is treated as a file path; an empty string selects the default.
    pub fn parse(spec: &str) -> SoundSpec {
        match spec.trim() {
            "" | DEFAULT_SOUND => SoundSpec::Default,
            SINE_SOUND => SoundSpec::Sine,
            path => SoundSpec::File(PathBuf::from(path)),
        }
    }

    /// Produces the waveform for this sound.
    pub fn load(&self) -> Result<Waveform, SoundError> {
        let waveform = match self {
            SoundSpec::Default => Waveform::new(
                tickdata::TICK.to_vec(),
                tickdata::TICK_RATE,
                tickdata::TICK_CHANNELS,
            ),
            SoundSpec::Sine => sine(SINE_RATE, SINE_FREQUENCY, SINE_DURATION, SINE_FADE),
            SoundSpec::File(path) => load_file(path)?,
        };

        info!(
            sound = self.to_string(),
            frames = waveform.frame_count(),
            rate = waveform.sample_rate(),
            channels = waveform.channels(),
            "Loaded sound."
        );
        Ok(waveform)
    }
}

impl From<&str> for SoundSpec {
    fn from(spec: &str) -> Self {
        SoundSpec::parse(spec)
    }
}

impl fmt::Display for SoundSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundSpec::Default => write!(f, "{}", DEFAULT_SOUND),
            SoundSpec::Sine => write!(f, "{}", SINE_SOUND),
            SoundSpec::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Synthesizes a mono sine burst with a raised-cosine fade at each end.
pub fn sine(rate: u32, frequency: f64, duration: f64, fade: f64) -> Waveform {
    let rate_f = f64::from(rate);
    let size = (rate_f * duration) as usize;
    let scale = f64::from(i16::MAX);

    let samples = (0..size)
        .map(|i| {
            let position = i as f64;
            let mut sample = (position / rate_f * frequency * 2.0 * PI).sin();
            if position < rate_f * fade {
                sample *= (1.0 - (position / (rate_f * duration) * 2.0 * PI).cos()) * 0.5;
            }
            if position > rate_f * (duration - fade) {
                let remaining = (size - i) as f64;
                sample *= (1.0 - (remaining / (rate_f * duration) * 2.0 * PI).cos()) * 0.5;
            }
            (sample * scale) as i16
        })
        .collect();

    Waveform::new(samples, rate, 1)
}

/// Decodes a sound file into interleaved 16-bit samples.
fn load_file(path: &Path) -> Result<Waveform, SoundError> {
    let unavailable = |reason: String| SoundError::SourceUnavailable {
        path: path.to_path_buf(),
        reason,
    };
    let decode_error = |source: SymphoniaError| SoundError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
    if !file.is_seekable() {
        return Err(unavailable("not seekable".to_string()));
    }
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| unavailable(e.to_string()))?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| unavailable("no audio track found".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &decoder_opts)
        .map_err(decode_error)?;

    let mut sample_rate = params.sample_rate.unwrap_or(0);
    let mut channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);
    let mut samples: Vec<i16> = Vec::new();

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(decode_error(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(err = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(decode_error(e)),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;

        let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if samples.is_empty() || sample_rate == 0 || channels == 0 {
        return Err(unavailable("no audio frames".to_string()));
    }

    Ok(Waveform::new(samples, sample_rate, channels))
}
