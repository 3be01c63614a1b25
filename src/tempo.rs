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
use std::time::{Duration, Instant};

use tracing::debug;

/// The slowest tempo the metronome plays.
pub const MIN_BPM: u32 = 10;

/// The fastest tempo the metronome plays.
pub const MAX_BPM: u32 = 1000;

pub const DEFAULT_BPM: u32 = 75;

/// Default lower bound for tempo adjustments.
pub const DEFAULT_MIN_BPM: u32 = 30;

/// Default upper bound for tempo adjustments.
pub const DEFAULT_MAX_BPM: u32 = 250;

/// Taps further apart than this start a new measurement.
pub const TAP_TIMEOUT: Duration = Duration::from_secs(10);

/// A named tempo covering `min..max` beats per minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoName {
    pub name: &'static str,
    pub min: u32,
    pub max: u32,
}

#[rustfmt::skip]
pub const TEMPO_NAMES: [TempoName; 9] = [
    TempoName { name: "Larghissimo", min: 0, max: 40 },
    TempoName { name: "Largo", min: 40, max: 60 },
    TempoName { name: "Larghetto", min: 60, max: 66 },
    TempoName { name: "Adagio", min: 66, max: 76 },
    TempoName { name: "Andante", min: 76, max: 108 },
    TempoName { name: "Moderato", min: 108, max: 120 },
    TempoName { name: "Allegro", min: 120, max: 168 },
    TempoName { name: "Presto", min: 168, max: 208 },
    TempoName { name: "Prestissimo", min: 208, max: MAX_BPM },
];

/// The name of the tempo range containing the given BPM, if any.
pub fn tempo_name(bpm: u32) -> Option<&'static str> {
    TEMPO_NAMES
        .iter()
        .find(|tempo| tempo.min <= bpm && bpm < tempo.max)
        .map(|tempo| tempo.name)
}

/// The middle of the named tempo range. Names match case insensitively.
pub fn center_bpm(name: &str) -> Option<u32> {
    TEMPO_NAMES
        .iter()
        .find(|tempo| tempo.name.eq_ignore_ascii_case(name.trim()))
        .map(|tempo| (tempo.min + tempo.max) / 2)
}

/// Beats per minute to ticks per second.
pub fn bpm_to_frequency(bpm: u32) -> f64 {
    f64::from(bpm) / 60.0
}

/// Clamps the BPM into the given bounds, which are themselves kept within
/// MIN_BPM..=MAX_BPM.
pub fn clamp_bpm(bpm: i64, min: u32, max: u32) -> u32 {
    let min = min.clamp(MIN_BPM, MAX_BPM);
    let max = max.clamp(min, MAX_BPM);
    bpm.clamp(i64::from(min), i64::from(max)) as u32
}

/// Measures tempo from the interval between taps.
#[derive(Debug, Default)]
pub struct TapTempo {
    last: Option<Instant>,
}

impl TapTempo {
    pub fn new() -> TapTempo {
        TapTempo::default()
    }

    /// Records a tap now.
    pub fn tap(&mut self) -> Option<u32> {
        self.tap_at(Instant::now())
    }

    /// Records a tap at the given instant. Returns the BPM if the previous tap
    /// was recent enough.
    pub fn tap_at(&mut self, now: Instant) -> Option<u32> {
        let previous = self.last.replace(now)?;
        let interval = now.saturating_duration_since(previous);
        if interval >= TAP_TIMEOUT || interval.is_zero() {
            debug!(interval = ?interval, "No new tempo yet, tap again");
            return None;
        }
        Some((60.0 / interval.as_secs_f64()).round() as u32)
    }
}
