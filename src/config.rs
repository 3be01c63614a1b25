// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
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
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::controller::{keyboard, Controller};
use crate::metronome::Settings;

mod error;
mod metronome;
mod profile;

pub use self::error::ConfigError;
pub use self::metronome::Metronome;
pub use self::profile::{find as find_profile, Profile};

/// Starts the audio thread and a keyboard controlled controller from the given
/// config file, optionally switching to a named profile first. Must be called
/// from within a tokio runtime.
pub fn init_controller(path: &Path, profile: Option<&str>) -> Result<Controller, Box<dyn Error>> {
    let config = Metronome::deserialize(path)?;
    let mut settings = config.settings()?;

    if let Some(name) = profile {
        let profile = find_profile(config.profiles(), name)?;
        info!(profile = name, "Using profile");
        settings = apply_profile(settings, profile)?;
    }

    let (control, audio_thread) = crate::metronome::spawn(settings.clone())?;
    Ok(Controller::new(
        control,
        audio_thread,
        &config,
        settings,
        Arc::new(keyboard::Driver::new()),
    ))
}

/// Applies a profile's speed, meter and accents on top of the given settings.
pub fn apply_profile(
    mut settings: Settings,
    profile: &Profile,
) -> Result<Settings, ConfigError> {
    if let Some(speed) = profile.speed() {
        settings.frequency = crate::tempo::bpm_to_frequency(speed);
    }
    if let Some(meter) = profile.meter() {
        settings
            .meter
            .set_meter(meter)
            .map_err(|e| ConfigError::Invalid {
                key: "profile meter",
                reason: e.to_string(),
            })?;
    }
    if let Some(accents) = profile.accents()? {
        settings.meter.set_accents(accents);
    }
    Ok(settings)
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;
    use crate::metronome::meter::Accents;

    #[test]
    fn test_apply_profile() {
        let settings = Settings::default();
        let profile = Profile::new("waltz", Some(90), Some(3), Some("100".to_string()));
        let settings = apply_profile(settings, &profile).unwrap();
        assert_eq!(settings.frequency, 1.5);
        assert_eq!(settings.meter.meter(), 3);
        assert_eq!(settings.meter.accents(), &Accents::from_str("100").unwrap());

        // Unset fields are left alone.
        let profile = Profile::new("faster", Some(120), None, None);
        let settings = apply_profile(settings, &profile).unwrap();
        assert_eq!(settings.frequency, 2.0);
        assert_eq!(settings.meter.meter(), 3);
    }
}
