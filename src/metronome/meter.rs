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
use std::{fmt, str::FromStr};

/// The largest supported meter.
pub const MAX_METER: usize = 100;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum MeterError {
    #[error("meter {0} is out of range 1..=100")]
    OutOfRange(usize),

    #[error("invalid accent character {0:?}, expected '0' or '1'")]
    InvalidAccent(char),
}

/// Per-beat accent flags. Beats beyond the end of the table are unaccented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accents(Vec<bool>);

impl Accents {
    pub fn new(flags: Vec<bool>) -> Accents {
        let mut flags = flags;
        flags.truncate(MAX_METER);
        Accents(flags)
    }

    /// Returns true if the given beat is accented.
    pub fn is_accented(&self, beat: usize) -> bool {
        self.0.get(beat).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pads the table with unaccented beats up to the given length.
    fn extend_to(&mut self, len: usize) {
        if self.0.len() < len {
            self.0.resize(len, false);
        }
    }
}

impl Default for Accents {
    /// Only the first beat is accented.
    fn default() -> Self {
        Accents(vec![true])
    }
}

impl FromStr for Accents {
    type Err = MeterError;

    /// Parses a string of '0' and '1' characters, one per beat.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .chars()
            .map(|c| match c {
                '1' => Ok(true),
                '0' => Ok(false),
                other => Err(MeterError::InvalidAccent(other)),
            })
            .collect::<Result<Vec<bool>, MeterError>>()
            .map(Accents::new)
    }
}

impl fmt::Display for Accents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for accented in &self.0 {
            write!(f, "{}", if *accented { '1' } else { '0' })?;
        }
        Ok(())
    }
}

/// Which precomputed tick buffer a beat plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    Plain,
    Accented,
    Secondary,
}

/// The meter and its accent table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterState {
    meter: usize,
    accents: Accents,
}

impl MeterState {
    pub fn new(meter: usize, accents: Accents) -> Result<MeterState, MeterError> {
        let mut state = MeterState {
            meter: 1,
            accents,
        };
        state.set_meter(meter)?;
        Ok(state)
    }

    pub fn meter(&self) -> usize {
        self.meter
    }

    pub fn accents(&self) -> &Accents {
        &self.accents
    }

    /// Sets the meter, growing the accent table if it's too short.
    pub fn set_meter(&mut self, meter: usize) -> Result<(), MeterError> {
        if !(1..=MAX_METER).contains(&meter) {
            return Err(MeterError::OutOfRange(meter));
        }
        self.meter = meter;
        self.accents.extend_to(meter);
        Ok(())
    }

    /// Replaces the accent table.
    pub fn set_accents(&mut self, accents: Accents) {
        self.accents = accents;
        self.accents.extend_to(self.meter);
    }

    /// The tick played on the given beat. A meter of one always plays plain ticks.
    pub fn tick_kind(&self, cycle_pos: usize) -> TickKind {
        if self.meter == 1 {
            TickKind::Plain
        } else if self.accents.is_accented(cycle_pos) {
            TickKind::Accented
        } else {
            TickKind::Secondary
        }
    }
}

impl Default for MeterState {
    fn default() -> Self {
        MeterState {
            meter: 1,
            accents: Accents::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_accents() {
        let accents = Accents::from_str("1010").unwrap();
        assert_eq!(accents.len(), 4);
        assert!(accents.is_accented(0));
        assert!(!accents.is_accented(1));
        assert!(accents.is_accented(2));
        assert!(!accents.is_accented(3));
        assert!(!accents.is_accented(50));
        assert_eq!(accents.to_string(), "1010");

        assert_eq!(
            Accents::from_str("10x1"),
            Err(MeterError::InvalidAccent('x'))
        );
        assert!(Accents::from_str("").unwrap().is_empty());
    }

    #[test]
    fn test_accents_are_capped() {
        let accents = Accents::new(vec![true; MAX_METER + 20]);
        assert_eq!(accents.len(), MAX_METER);
    }

    #[test]
    fn test_set_meter() {
        let mut state = MeterState::default();
        assert_eq!(state.meter(), 1);
        assert_eq!(state.set_meter(0), Err(MeterError::OutOfRange(0)));
        assert_eq!(
            state.set_meter(MAX_METER + 1),
            Err(MeterError::OutOfRange(MAX_METER + 1))
        );
        assert_eq!(state.meter(), 1);

        state.set_meter(4).unwrap();
        assert_eq!(state.meter(), 4);
        assert_eq!(state.accents().to_string(), "1000");

        // Shrinking keeps the table.
        state.set_meter(2).unwrap();
        assert_eq!(state.accents().to_string(), "1000");
    }

    #[test]
    fn test_set_accents_resizes() {
        let mut state = MeterState::new(3, Accents::default()).unwrap();
        state.set_accents(Accents::from_str("01").unwrap());
        assert_eq!(state.accents().to_string(), "010");
    }

    #[test]
    fn test_accent_selection() {
        let state = MeterState::new(4, Accents::from_str("1").unwrap()).unwrap();
        assert_eq!(state.tick_kind(0), TickKind::Accented);
        for beat in 1..4 {
            assert_eq!(state.tick_kind(beat), TickKind::Secondary);
        }
    }

    #[test]
    fn test_single_beat_meter_is_always_plain() {
        for accents in ["0", "1", "1111", "0101"] {
            let state = MeterState::new(1, Accents::from_str(accents).unwrap()).unwrap();
            assert_eq!(state.tick_kind(0), TickKind::Plain);
        }
    }
}
