// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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
use std::str::FromStr;

use serde::Deserialize;

use crate::metronome::meter::{Accents, MAX_METER};
use crate::tempo;

use super::error::ConfigError;

/// A named speed, meter and accent pattern that can be switched to at once.
/// Unset fields leave the current value alone.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Profile {
    /// The name used to select the profile.
    name: String,

    /// Speed in BPM.
    speed: Option<u32>,

    /// Beats per measure.
    meter: Option<usize>,

    /// One '0' or '1' per beat.
    accents: Option<String>,
}

impl Profile {
    /// Creates a new Profile.
    pub fn new(
        name: &str,
        speed: Option<u32>,
        meter: Option<usize>,
        accents: Option<String>,
    ) -> Profile {
        Profile {
            name: name.to_string(),
            speed,
            meter,
            accents,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn speed(&self) -> Option<u32> {
        self.speed
    }

    pub fn meter(&self) -> Option<usize> {
        self.meter
    }

    /// Returns the parsed accent pattern, if set.
    pub fn accents(&self) -> Result<Option<Accents>, ConfigError> {
        self.accents
            .as_deref()
            .map(|accents| {
                Accents::from_str(accents).map_err(|e| ConfigError::invalid("profile accents", e))
            })
            .transpose()
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(speed) = self.speed {
            if !(tempo::MIN_BPM..=tempo::MAX_BPM).contains(&speed) {
                return Err(ConfigError::invalid(
                    "profile speed",
                    format!("{} in profile {} is out of range", speed, self.name),
                ));
            }
        }
        if let Some(meter) = self.meter {
            if !(1..=MAX_METER).contains(&meter) {
                return Err(ConfigError::invalid(
                    "profile meter",
                    format!("{} in profile {} is out of range", meter, self.name),
                ));
            }
        }
        self.accents()?;
        Ok(())
    }
}

/// Finds a profile by name.
pub fn find<'a>(profiles: &'a [Profile], name: &str) -> Result<&'a Profile, ConfigError> {
    profiles
        .iter()
        .find(|profile| profile.name == name)
        .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
}
