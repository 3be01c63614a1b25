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
    io,
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    audio::{self, DeviceRequest},
    protocol::{self, ControlHandle},
    tempo,
};

pub mod engine;
pub mod meter;
pub mod sound;
pub mod tickdata;
pub mod ticks;

pub use engine::{AudioEngine, DeviceFactory, StartError};

/// How far ahead of playback the engine keeps the device buffer filled.
pub const DEFAULT_WRITE_AHEAD: Duration = Duration::from_millis(100);

/// Shortest accepted write-ahead. The feeder sleeps half of it between runs.
pub const MIN_WRITE_AHEAD: Duration = Duration::from_millis(10);

/// Longest accepted write-ahead.
pub const MAX_WRITE_AHEAD: Duration = Duration::from_secs(2);

/// Everything the audio thread needs to know to play.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// The output device to open.
    pub device: String,
    pub sound: sound::SoundSpec,
    /// The backend that provides the device.
    pub sound_system: String,
    pub meter: meter::MeterState,
    /// Ticks per second.
    pub frequency: f64,
    /// Output volume in 0.0..=1.0.
    pub volume: f64,
    /// Whether a sync response is sent at every beat.
    pub sync: bool,
    /// Requested output format. The device name comes from `device`.
    pub request: DeviceRequest,
    pub write_ahead: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            device: audio::DEFAULT_DEVICE.to_string(),
            sound: sound::SoundSpec::Default,
            sound_system: "cpal".to_string(),
            meter: meter::MeterState::default(),
            frequency: tempo::bpm_to_frequency(tempo::DEFAULT_BPM),
            volume: 1.0,
            sync: true,
            request: DeviceRequest::default(),
            write_ahead: DEFAULT_WRITE_AHEAD,
        }
    }
}

/// Starts the audio thread. The returned handle controls it.
pub fn spawn(settings: Settings) -> io::Result<(ControlHandle, JoinHandle<()>)> {
    let (control, endpoint) = protocol::channel();
    let engine = AudioEngine::new(endpoint, settings);
    Ok((control, start_thread(engine)?))
}

/// Starts the audio thread with a custom source of devices.
pub fn spawn_with_device_factory(
    settings: Settings,
    device_factory: DeviceFactory,
) -> io::Result<(ControlHandle, JoinHandle<()>)> {
    let (control, endpoint) = protocol::channel();
    let engine = AudioEngine::with_device_factory(endpoint, settings, device_factory);
    Ok((control, start_thread(engine)?))
}

fn start_thread(mut engine: AudioEngine) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("mtick-audio".to_string())
        .spawn(move || {
            audio::thread_priority::promote_current_thread();
            engine.run();
        })
}
