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

/// Error types for playback devices
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("no output device found with name {0}")]
    NotFound(String),

    #[error("unknown sound system {0}")]
    UnknownSoundSystem(String),

    #[error("unable to open device {device}: {reason}")]
    Open { device: String, reason: String },

    #[error("device {device} offers no usable output format")]
    UnsupportedFormat { device: String },

    #[error("device is not open")]
    NotOpen,

    #[error("write failed: {0}")]
    Write(String),
}
