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
use std::{error::Error, fmt};

pub mod cpal;
pub mod error;
pub mod format;
pub mod g711;
pub mod mock;
pub mod resample;
pub mod thread_priority;

pub use error::DeviceError;
pub use format::{PlaybackConfig, WireFormat};
pub use resample::Waveform;

/// Name of the device the backend picks when none is given.
pub const DEFAULT_DEVICE: &str = "default";

/// The smallest fragment, in bytes, we ask a device for.
pub const MIN_FRAGMENT_SIZE: usize = 256;

/// What we ask a device for when opening it. Devices may grant something else.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRequest {
    /// The device to open.
    pub name: String,
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Requested channel count.
    pub channels: u16,
    /// Requested wire format.
    pub format: WireFormat,
    /// Minimum fragment size in bytes.
    pub min_fragment_size: usize,
}

impl DeviceRequest {
    pub fn new(name: &str) -> DeviceRequest {
        DeviceRequest {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

impl Default for DeviceRequest {
    /// The default device, mono 44.1kHz signed 16-bit little endian.
    fn default() -> Self {
        DeviceRequest {
            name: DEFAULT_DEVICE.to_string(),
            sample_rate: 44100,
            channels: 1,
            format: WireFormat::S16Le,
            min_fragment_size: MIN_FRAGMENT_SIZE,
        }
    }
}

/// What a device actually granted when it was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: WireFormat,
    /// Bytes per fragment.
    pub fragment_size: usize,
    /// Fragments the device can hold queued.
    pub fragments_total: usize,
}

impl DeviceFormat {
    /// The playback configuration for this format at the given volume.
    pub fn playback_config(&self, volume: f64) -> PlaybackConfig {
        PlaybackConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            format: self.format,
            fragment_size: self.fragment_size,
            volume,
        }
    }
}

/// Device buffer occupancy, in fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backlog {
    pub fragments_total: usize,
    pub fragments_queued: usize,
}

/// A playback device the metronome writes raw wire-format bytes to.
pub trait Device: fmt::Display + Send {
    /// Opens and configures the device, returning what was granted.
    fn open(&mut self, request: &DeviceRequest) -> Result<DeviceFormat, DeviceError>;

    /// Queues bytes for playback.
    fn write(&mut self, data: &[u8]) -> Result<(), DeviceError>;

    /// Reports how full the device buffer is.
    fn query_backlog(&self) -> Result<Backlog, DeviceError>;

    /// Discards anything queued but not yet played.
    fn reset(&mut self) -> Result<(), DeviceError>;

    /// Stops playback and releases the device. Closing a closed device does nothing.
    fn close(&mut self);
}

/// Gets an unopened device for the given sound system.
pub fn get_device(sound_system: &str) -> Result<Box<dyn Device>, DeviceError> {
    match sound_system.trim() {
        "" | "cpal" | "default" | "<default>" => Ok(Box::new(cpal::Device::new())),
        name if name.starts_with("mock") => Ok(Box::new(mock::Device::realtime(name))),
        other => Err(DeviceError::UnknownSoundSystem(other.to_string())),
    }
}

/// Lists the names of the output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    cpal::Device::list()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_device() {
        assert!(get_device("cpal").is_ok());
        assert!(get_device("<default>").is_ok());
        assert!(get_device("mock").is_ok());
        assert!(matches!(
            get_device("oss"),
            Err(DeviceError::UnknownSoundSystem(name)) if name == "oss"
        ));
    }

    #[test]
    fn test_request_defaults() {
        let request = DeviceRequest::new("hw:1");
        assert_eq!(request.name, "hw:1");
        assert_eq!(request.sample_rate, 44100);
        assert_eq!(request.channels, 1);
        assert_eq!(request.format, WireFormat::S16Le);
        assert_eq!(request.min_fragment_size, MIN_FRAGMENT_SIZE);
    }

    #[test]
    fn test_playback_config_from_format() {
        let format = DeviceFormat {
            sample_rate: 48000,
            channels: 2,
            format: WireFormat::S16Le,
            fragment_size: 1024,
            fragments_total: 32,
        };
        let config = format.playback_config(0.25);
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.channels, 2);
        assert_eq!(config.fragment_size, 1024);
        assert_eq!(config.volume, 0.25);
    }
}
