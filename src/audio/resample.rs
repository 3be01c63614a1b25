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

//! Rate conversion, channel mixing and wire encoding of tick waveforms.
//!
//! Each output frame covers the input time window `[i * speed, (i + 1) * speed)`
//! where `speed` is the input rate divided by the output rate. The window is
//! walked in steps of one input frame, linearly interpolating between
//! neighbouring input frames, and the weighted sum is normalized by the total
//! weight traversed.

use super::format::PlaybackConfig;

/// Interleaved 16-bit PCM and the rate and channel count it was recorded at.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl Waveform {
    /// Creates a new waveform. Trailing samples that don't fill a frame are dropped.
    pub fn new(mut samples: Vec<i16>, sample_rate: u32, channels: u16) -> Waveform {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % usize::from(channels);
        samples.truncate(whole);
        Waveform {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (one sample per channel) in the waveform.
    pub fn frame_count(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns a copy of this waveform that claims a different sample rate.
    pub fn with_sample_rate(&self, sample_rate: u32) -> Waveform {
        Waveform {
            samples: self.samples.clone(),
            sample_rate,
            channels: self.channels,
        }
    }

    /// Returns a copy of this waveform with every sample halved.
    pub fn halved(&self) -> Waveform {
        Waveform {
            samples: self.samples.iter().map(|sample| sample / 2).collect(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Index of the first frame where any channel reaches the given magnitude.
    pub fn first_frame_above(&self, threshold: i16) -> Option<usize> {
        let threshold = i32::from(threshold);
        self.samples
            .iter()
            .position(|sample| i32::from(*sample).abs() >= threshold)
            .map(|index| index / usize::from(self.channels))
    }

    /// Sample at the given frame and channel, clamping the frame to the last one.
    #[inline]
    fn clamped(&self, frame: usize, channel: usize) -> f64 {
        let frame = frame.min(self.frame_count() - 1);
        f64::from(self.samples[frame * usize::from(self.channels) + channel])
    }
}

/// Number of frames the input becomes once converted to the target rate.
pub fn output_frames(input: &Waveform, target: &PlaybackConfig) -> usize {
    if input.sample_rate == 0 || target.sample_rate == 0 {
        return 0;
    }
    (input.frame_count() as f64 * f64::from(target.sample_rate) / f64::from(input.sample_rate))
        .round() as usize
}

/// Converts the input waveform to the target configuration and encodes it.
pub fn generate(input: &Waveform, target: &PlaybackConfig) -> Vec<u8> {
    let frames = output_frames(input, target);
    let out_channels = usize::from(target.channels);
    let mut out = Vec::with_capacity(frames * target.frame_width());
    if frames == 0 || input.is_empty() {
        return out;
    }

    let speed = f64::from(input.sample_rate) / f64::from(target.sample_rate);
    let in_channels = usize::from(input.channels);
    let mixdown = out_channels != in_channels;

    for i in 0..frames {
        let left = i as f64 * speed;
        let right = (i + 1) as f64 * speed;

        if mixdown {
            let sample = window(input, left, right, 0..in_channels) / in_channels as f64;
            for _ in 0..out_channels {
                push_sample(sample, target, &mut out);
            }
        } else {
            for channel in 0..out_channels {
                let sample = window(input, left, right, channel..channel + 1);
                push_sample(sample, target, &mut out);
            }
        }
    }

    out
}

/// Weighted average over [left, right) of the sum of the given input channels.
fn window(input: &Waveform, left: f64, right: f64, channels: std::ops::Range<usize>) -> f64 {
    let mut sum = 0.0;
    let mut total_weight = 0.0;
    let mut position = left;
    while position < right {
        let index = position.trunc() as usize;
        let frac = position.fract();
        let weight = (right - position).min(1.0);
        for channel in channels.clone() {
            sum += weight
                * ((1.0 - frac) * input.clamped(index, channel)
                    + frac * input.clamped(index + 1, channel));
        }
        total_weight += weight;
        position += 1.0;
    }

    if total_weight > 0.0 {
        sum / total_weight
    } else {
        0.0
    }
}

#[inline]
fn push_sample(sample: f64, target: &PlaybackConfig, out: &mut Vec<u8>) {
    // Float to int casts saturate, which clamps to the 16-bit range.
    let scaled = (sample * target.volume) as i16;
    target.format.encode(scaled, out);
}
