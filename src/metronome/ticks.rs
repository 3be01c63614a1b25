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
use tracing::debug;

use crate::audio::{resample, PlaybackConfig, Waveform};

use super::meter::TickKind;

/// A frame counts as the tick's onset once any channel reaches this magnitude.
const ATTACK_THRESHOLD: i16 = i16::MAX / 20;

/// Ready-to-write tick sounds for one device configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TickBuffers {
    plain: Vec<u8>,
    accented: Vec<u8>,
    secondary: Vec<u8>,
    silence: Vec<u8>,
}

impl TickBuffers {
    /// Renders every tick buffer for the given waveform and configuration.
    pub fn rebuild(source: &Waveform, config: &PlaybackConfig) -> TickBuffers {
        let silence = render_silence(config);
        let plain = resample::generate(source, config);

        // Claiming twice the input rate yields a shorter, higher pitched tick.
        let accented = resample::generate(
            &source.with_sample_rate(source.sample_rate().saturating_mul(2)),
            config,
        );
        let accented = pad_attack(source, accented, &silence, config.frame_width());

        let secondary = resample::generate(&source.halved(), config);

        TickBuffers {
            plain,
            accented,
            secondary,
            silence,
        }
    }

    /// The buffer played for the given kind of tick.
    pub fn buffer(&self, kind: TickKind) -> &[u8] {
        match kind {
            TickKind::Plain => &self.plain,
            TickKind::Accented => &self.accented,
            TickKind::Secondary => &self.secondary,
        }
    }

    /// One frame of silence in the device's wire format.
    pub fn silence(&self) -> &[u8] {
        &self.silence
    }
}

/// One frame of encoded silence.
pub fn render_silence(config: &PlaybackConfig) -> Vec<u8> {
    let zero = Waveform::new(vec![0], config.sample_rate, 1);
    let silence = resample::generate(&zero, config);
    if silence.is_empty() {
        // Only reachable with a zero sample rate.
        let mut frame = Vec::with_capacity(config.frame_width());
        for _ in 0..config.channels {
            config.format.encode(0, &mut frame);
        }
        return frame;
    }
    silence
}

/// Prefixes the accented tick with silence when the source has a short
/// delay before its onset, so the accent lands with the beat.
fn pad_attack(source: &Waveform, accented: Vec<u8>, silence: &[u8], frame_width: usize) -> Vec<u8> {
    let frames = source.frame_count();
    let attack = source.first_frame_above(ATTACK_THRESHOLD).unwrap_or(frames);
    if attack >= frames / 3 || silence.is_empty() {
        return accented;
    }

    let offset = attack / 2 * frame_width;
    if offset == 0 {
        return accented;
    }
    debug!(frames = attack / 2, "Attack padding for accents.");

    let mut padded = Vec::with_capacity(offset + accented.len());
    padded.extend((0..offset).map(|i| silence[i % silence.len()]));
    padded.extend_from_slice(&accented);
    padded
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::WireFormat;

    fn config(format: WireFormat, channels: u16) -> PlaybackConfig {
        PlaybackConfig {
            sample_rate: 44100,
            channels,
            format,
            fragment_size: 1024,
            volume: 1.0,
        }
    }

    /// A waveform with `lead` quiet frames followed by loud ones.
    fn delayed_onset(lead: usize, total: usize) -> Waveform {
        let samples = (0..total)
            .map(|i| if i < lead { 10 } else { 20000 })
            .collect();
        Waveform::new(samples, 44100, 1)
    }

    #[test]
    fn test_silence_is_one_frame() {
        let ticks = TickBuffers::rebuild(&delayed_onset(0, 10), &config(WireFormat::S16Le, 2));
        assert_eq!(ticks.silence(), &[0, 0, 0, 0]);

        let ticks = TickBuffers::rebuild(&delayed_onset(0, 10), &config(WireFormat::U8, 1));
        assert_eq!(ticks.silence(), &[0x80]);

        let ticks = TickBuffers::rebuild(&delayed_onset(0, 10), &config(WireFormat::MuLaw, 2));
        assert_eq!(ticks.silence(), &[0xff, 0xff]);
    }

    #[test]
    fn test_plain_and_secondary() {
        let source = delayed_onset(0, 300);
        let ticks = TickBuffers::rebuild(&source, &config(WireFormat::S16Le, 1));
        let plain = ticks.buffer(TickKind::Plain);
        let secondary = ticks.buffer(TickKind::Secondary);
        assert_eq!(plain.len(), 600);
        assert_eq!(secondary.len(), 600);
        assert_eq!(i16::from_le_bytes([plain[0], plain[1]]), 20000);
        assert_eq!(i16::from_le_bytes([secondary[0], secondary[1]]), 10000);
    }

    #[test]
    fn test_accented_is_shorter_without_onset_delay() {
        let source = delayed_onset(0, 300);
        let ticks = TickBuffers::rebuild(&source, &config(WireFormat::S16Le, 1));
        assert_eq!(ticks.buffer(TickKind::Accented).len(), 300);
    }

    #[test]
    fn test_attack_padding() {
        let lead = 60;
        let source = delayed_onset(lead, 300);
        let config = config(WireFormat::S16Le, 2);
        let ticks = TickBuffers::rebuild(&source, &config);

        let unpadded = resample::generate(&source.with_sample_rate(88200), &config);
        let accented = ticks.buffer(TickKind::Accented);
        let padding = lead / 2 * config.frame_width();
        assert_eq!(accented.len(), unpadded.len() + padding);
        assert!(accented[..padding].iter().all(|byte| *byte == 0));
        assert_eq!(&accented[padding..], unpadded.as_slice());
    }

    #[test]
    fn test_attack_padding_uses_silence_pattern() {
        let source = delayed_onset(40, 300);
        let ticks = TickBuffers::rebuild(&source, &config(WireFormat::U16Le, 1));
        let accented = ticks.buffer(TickKind::Accented);
        // Unsigned silence is 0x8000, little endian.
        for frame in accented[..40].chunks(2) {
            assert_eq!(frame, &[0x00, 0x80]);
        }
    }

    #[test]
    fn test_no_padding_for_late_onset() {
        let source = delayed_onset(100, 300);
        let config = config(WireFormat::S16Le, 1);
        let ticks = TickBuffers::rebuild(&source, &config);
        let unpadded = resample::generate(&source.with_sample_rate(88200), &config);
        assert_eq!(ticks.buffer(TickKind::Accented), unpadded.as_slice());
    }

    #[test]
    fn test_no_padding_without_onset() {
        let source = Waveform::new(vec![5; 300], 44100, 1);
        let config = config(WireFormat::S16Le, 1);
        let ticks = TickBuffers::rebuild(&source, &config);
        assert_eq!(ticks.buffer(TickKind::Accented).len(), 300);
    }

    #[test]
    fn test_volume_rebuild() {
        let source = delayed_onset(0, 100);
        let loud = TickBuffers::rebuild(&source, &config(WireFormat::S16Le, 1));
        let quiet = TickBuffers::rebuild(
            &source,
            &PlaybackConfig {
                volume: 0.0,
                ..config(WireFormat::S16Le, 1)
            },
        );
        assert_ne!(loud, quiet);
        assert!(quiet.buffer(TickKind::Plain).iter().all(|byte| *byte == 0));
        assert!(quiet
            .buffer(TickKind::Accented)
            .iter()
            .all(|byte| *byte == 0));
    }
}
