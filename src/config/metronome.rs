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
use std::{path::Path, str::FromStr, time::Duration};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use crate::audio::{DeviceRequest, WireFormat, DEFAULT_DEVICE};
use crate::metronome::{
    self,
    meter::{Accents, MeterState},
    sound::SoundSpec,
};
use crate::tempo;

use super::error::ConfigError;
use super::profile::Profile;

const DEFAULT_SOUND_SYSTEM: &str = "cpal";
const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_CHANNELS: u16 = 1;

/// A YAML representation of the metronome configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Metronome {
    /// `<default>`, `<sine>` or a path to a sound file.
    sound: Option<String>,

    /// The output device (default: "default").
    sound_device: Option<String>,

    /// The backend providing the device (default: "cpal").
    sound_system: Option<String>,

    /// Speed in BPM (default: 75).
    speed: Option<u32>,

    /// Lower bound for tempo adjustments (default: 30).
    min_bpm: Option<u32>,

    /// Upper bound for tempo adjustments (default: 250).
    max_bpm: Option<u32>,

    /// Output volume from 0.0 to 1.0 (default: 1.0).
    volume: Option<f64>,

    /// Beats per measure (default: 1).
    meter: Option<usize>,

    /// One '0' or '1' per beat (default: "1").
    accents: Option<String>,

    /// How far ahead of playback to keep the device filled (default: 100ms).
    write_ahead: Option<String>,

    /// Requested sample rate in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// Requested channel count (default: 1).
    channels: Option<u16>,

    /// Requested wire format (default: "s16le").
    wire_format: Option<String>,

    /// Shell command run when the metronome starts.
    command_on_start: Option<String>,

    /// Shell command run when the metronome stops.
    command_on_stop: Option<String>,

    /// Named speed, meter and accent presets.
    #[serde(default)]
    profiles: Vec<Profile>,
}

impl Metronome {
    /// Parses and validates a metronome configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Metronome, ConfigError> {
        let metronome = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Metronome>()?;
        metronome.validate()?;
        Ok(metronome)
    }

    /// Checks every value that has a constrained range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, bpm) in [
            ("speed", self.speed),
            ("min_bpm", self.min_bpm),
            ("max_bpm", self.max_bpm),
        ] {
            if let Some(bpm) = bpm {
                if !(tempo::MIN_BPM..=tempo::MAX_BPM).contains(&bpm) {
                    return Err(ConfigError::invalid(
                        key,
                        format!(
                            "{} is outside {}..={}",
                            bpm,
                            tempo::MIN_BPM,
                            tempo::MAX_BPM
                        ),
                    ));
                }
            }
        }
        if self.min_bpm() > self.max_bpm() {
            return Err(ConfigError::invalid(
                "min_bpm",
                format!("{} is above max_bpm {}", self.min_bpm(), self.max_bpm()),
            ));
        }
        if let Some(volume) = self.volume {
            if !(0.0..=1.0).contains(&volume) {
                return Err(ConfigError::invalid(
                    "volume",
                    format!("{} is outside 0.0..=1.0", volume),
                ));
            }
        }
        if self.channels == Some(0) {
            return Err(ConfigError::invalid("channels", "must be at least 1"));
        }
        if self.sample_rate == Some(0) {
            return Err(ConfigError::invalid("sample_rate", "must be at least 1"));
        }

        self.meter_state()?;
        self.write_ahead()?;
        self.wire_format()?;
        for profile in &self.profiles {
            profile.validate()?;
        }
        Ok(())
    }

    pub fn sound(&self) -> SoundSpec {
        self.sound
            .as_deref()
            .map(SoundSpec::parse)
            .unwrap_or_default()
    }

    pub fn sound_device(&self) -> &str {
        self.sound_device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    pub fn sound_system(&self) -> &str {
        self.sound_system.as_deref().unwrap_or(DEFAULT_SOUND_SYSTEM)
    }

    /// Returns the starting speed, clamped into min_bpm..=max_bpm.
    pub fn speed(&self) -> u32 {
        tempo::clamp_bpm(
            i64::from(self.speed.unwrap_or(tempo::DEFAULT_BPM)),
            self.min_bpm(),
            self.max_bpm(),
        )
    }

    pub fn min_bpm(&self) -> u32 {
        self.min_bpm.unwrap_or(tempo::DEFAULT_MIN_BPM)
    }

    pub fn max_bpm(&self) -> u32 {
        self.max_bpm.unwrap_or(tempo::DEFAULT_MAX_BPM)
    }

    pub fn volume(&self) -> f64 {
        self.volume.unwrap_or(1.0)
    }

    /// Returns the meter and accents together, since accents are sized to the meter.
    pub fn meter_state(&self) -> Result<MeterState, ConfigError> {
        let accents = match self.accents.as_deref() {
            Some(accents) => {
                Accents::from_str(accents).map_err(|e| ConfigError::invalid("accents", e))?
            }
            None => Accents::default(),
        };
        MeterState::new(self.meter.unwrap_or(1), accents)
            .map_err(|e| ConfigError::invalid("meter", e))
    }

    /// Returns the write-ahead lead time (default: 100ms), which must lie
    /// within 10ms..=2s.
    pub fn write_ahead(&self) -> Result<Duration, ConfigError> {
        let write_ahead: Duration = match &self.write_ahead {
            Some(write_ahead) => DurationString::from_string(write_ahead.clone())
                .map_err(|e| ConfigError::invalid("write_ahead", e))?
                .into(),
            None => return Ok(metronome::DEFAULT_WRITE_AHEAD),
        };
        if !(metronome::MIN_WRITE_AHEAD..=metronome::MAX_WRITE_AHEAD).contains(&write_ahead) {
            return Err(ConfigError::invalid(
                "write_ahead",
                format!(
                    "{:?} is outside {:?}..={:?}",
                    write_ahead,
                    metronome::MIN_WRITE_AHEAD,
                    metronome::MAX_WRITE_AHEAD
                ),
            ));
        }
        Ok(write_ahead)
    }

    pub fn wire_format(&self) -> Result<WireFormat, ConfigError> {
        match self.wire_format.as_deref() {
            Some(format) => {
                WireFormat::from_str(format).map_err(|e| ConfigError::invalid("wire_format", e))
            }
            None => Ok(WireFormat::S16Le),
        }
    }

    pub fn command_on_start(&self) -> Option<&str> {
        self.command_on_start.as_deref().filter(|c| !c.is_empty())
    }

    pub fn command_on_stop(&self) -> Option<&str> {
        self.command_on_stop.as_deref().filter(|c| !c.is_empty())
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Builds the audio thread settings described by this configuration.
    pub fn settings(&self) -> Result<metronome::Settings, ConfigError> {
        Ok(metronome::Settings {
            device: self.sound_device().to_string(),
            sound: self.sound(),
            sound_system: self.sound_system().to_string(),
            meter: self.meter_state()?,
            frequency: tempo::bpm_to_frequency(self.speed()),
            volume: self.volume(),
            sync: true,
            request: DeviceRequest {
                name: self.sound_device().to_string(),
                sample_rate: self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
                channels: self.channels.unwrap_or(DEFAULT_CHANNELS),
                format: self.wire_format()?,
                ..DeviceRequest::default()
            },
            write_ahead: self.write_ahead()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(yaml: &str) -> Result<Metronome, ConfigError> {
        let metronome = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Metronome>()?;
        metronome.validate()?;
        Ok(metronome)
    }

    #[test]
    fn test_defaults() {
        let metronome = parse("{}").unwrap();
        let settings = metronome.settings().unwrap();
        assert_eq!(settings, metronome::Settings::default());
        assert_eq!(metronome.speed(), 75);
        assert_eq!(metronome.min_bpm(), 30);
        assert_eq!(metronome.max_bpm(), 250);
        assert_eq!(metronome.command_on_start(), None);
        assert!(metronome.profiles().is_empty());
    }

    #[test]
    fn test_full_config() {
        let metronome = parse(
            r#"
            sound: <sine>
            sound_device: hw:1
            sound_system: mock
            speed: 120
            min_bpm: 40
            max_bpm: 200
            volume: 0.5
            meter: 4
            accents: "1010"
            write_ahead: 50ms
            sample_rate: 48000
            channels: 2
            wire_format: mu-law
            command_on_start: echo start
            command_on_stop: ""
            profiles:
              - name: waltz
                speed: 90
                meter: 3
                accents: "100"
        "#,
        )
        .unwrap();

        let settings = metronome.settings().unwrap();
        assert_eq!(settings.sound, SoundSpec::Sine);
        assert_eq!(settings.device, "hw:1");
        assert_eq!(settings.sound_system, "mock");
        assert_eq!(settings.frequency, 2.0);
        assert_eq!(settings.volume, 0.5);
        assert_eq!(settings.meter.meter(), 4);
        assert_eq!(settings.meter.accents().to_string(), "1010");
        assert_eq!(settings.write_ahead, Duration::from_millis(50));
        assert_eq!(settings.request.sample_rate, 48000);
        assert_eq!(settings.request.channels, 2);
        assert_eq!(settings.request.format, WireFormat::MuLaw);
        assert_eq!(metronome.command_on_start(), Some("echo start"));
        assert_eq!(metronome.command_on_stop(), None);
        assert_eq!(metronome.profiles().len(), 1);
        assert_eq!(metronome.profiles()[0].name(), "waltz");
    }

    #[test]
    fn test_speed_is_clamped() {
        let metronome = parse("speed: 300\nmax_bpm: 200\n").unwrap();
        assert_eq!(metronome.speed(), 200);
    }

    #[test]
    fn test_invalid_values() {
        for yaml in [
            "speed: 5",
            "max_bpm: 2000",
            "min_bpm: 200\nmax_bpm: 100",
            "volume: 1.5",
            "meter: 0",
            "meter: 101",
            "accents: \"12\"",
            "write_ahead: soon",
            "write_ahead: 0ms",
            "write_ahead: 5ms",
            "write_ahead: 1h",
            "wire_format: mp3",
            "channels: 0",
            "profiles:\n  - name: slow\n    speed: 1",
        ] {
            assert!(
                matches!(parse(yaml), Err(ConfigError::Invalid { .. })),
                "{}",
                yaml
            );
        }
    }

    #[test]
    fn test_write_ahead_bounds() {
        for (yaml, expected) in [
            ("write_ahead: 10ms", Duration::from_millis(10)),
            ("write_ahead: 2s", Duration::from_secs(2)),
            ("write_ahead: 250ms", Duration::from_millis(250)),
        ] {
            let metronome = parse(yaml).unwrap();
            assert_eq!(metronome.write_ahead().unwrap(), expected, "{}", yaml);
        }
    }

    #[test]
    fn test_deserialize_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/mtick.yaml");
        let metronome = Metronome::deserialize(&path).unwrap();
        assert_eq!(metronome.speed(), 100);
        assert_eq!(metronome.meter_state().unwrap().meter(), 4);
        assert_eq!(metronome.profiles().len(), 2);

        assert!(Metronome::deserialize(Path::new("/nonexistent/mtick.yaml")).is_err());
    }
}
