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
use std::{fmt, sync::Arc, time::Instant};

use parking_lot::Mutex;
use tracing::{info, span, Level};

use super::{Backlog, DeviceError, DeviceFormat, DeviceRequest};

/// Fragments a mock device can hold.
pub const MOCK_FRAGMENTS_TOTAL: usize = 64;

/// How queued audio drains out of a mock device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Consumption {
    /// Nothing plays until the test takes the written bytes.
    Manual,
    /// Audio drains at the granted byte rate, like real hardware.
    RealTime,
}

#[derive(Default)]
struct State {
    format: Option<DeviceFormat>,
    grant: Option<DeviceFormat>,
    fail_open: bool,
    fail_writes: bool,
    opens: usize,
    /// Bytes written since the last take, kept only in manual mode.
    written: Vec<u8>,
    /// Bytes written and not yet played, in manual mode.
    queued: usize,
    /// Bytes written since opening, in real time mode.
    total_written: usize,
    opened_at: Option<Instant>,
}

/// A mock device. Doesn't actually play anything.
#[derive(Clone)]
pub struct Device {
    name: String,
    consumption: Consumption,
    state: Arc<Mutex<State>>,
}

impl Device {
    /// A mock device that keeps everything written to it until taken.
    pub fn get(name: &str) -> Device {
        Device::with_consumption(name, Consumption::Manual)
    }

    /// A mock device that plays written audio in real time.
    pub fn realtime(name: &str) -> Device {
        Device::with_consumption(name, Consumption::RealTime)
    }

    fn with_consumption(name: &str, consumption: Consumption) -> Device {
        Device {
            name: name.to_string(),
            consumption,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Makes future opens grant this format regardless of the request.
    pub fn grant(&self, format: DeviceFormat) {
        self.state.lock().grant = Some(format);
    }

    /// Makes future opens fail.
    pub fn fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Makes future writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().format.is_some()
    }

    /// The number of times the device has been opened.
    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    /// The format granted by the most recent open.
    pub fn format(&self) -> Option<DeviceFormat> {
        self.state.lock().format
    }

    /// Returns everything written since the last call and marks it as played.
    pub fn take_written(&self) -> Vec<u8> {
        let mut state = self.state.lock();
        state.queued = 0;
        std::mem::take(&mut state.written)
    }

    /// Number of bytes written since the last take.
    pub fn written_len(&self) -> usize {
        self.state.lock().written.len()
    }

    fn granted(request: &DeviceRequest) -> DeviceFormat {
        DeviceFormat {
            sample_rate: request.sample_rate,
            channels: request.channels,
            format: request.format,
            fragment_size: request.min_fragment_size.max(1).next_power_of_two(),
            fragments_total: MOCK_FRAGMENTS_TOTAL,
        }
    }
}

impl super::Device for Device {
    fn open(&mut self, request: &DeviceRequest) -> Result<DeviceFormat, DeviceError> {
        let span = span!(Level::INFO, "open device (mock)");
        let _enter = span.enter();

        let mut state = self.state.lock();
        if state.fail_open {
            return Err(DeviceError::Open {
                device: request.name.clone(),
                reason: "mock open failure".to_string(),
            });
        }

        let format = state.grant.unwrap_or_else(|| Device::granted(request));
        info!(
            device = self.name,
            requested = request.name,
            rate = format.sample_rate,
            channels = format.channels,
            format = format.format.to_string(),
            fragment_size = format.fragment_size,
            fragments_total = format.fragments_total,
            "Opened device."
        );

        state.format = Some(format);
        state.opens += 1;
        state.written.clear();
        state.queued = 0;
        state.total_written = 0;
        state.opened_at = Some(Instant::now());
        Ok(format)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if state.format.is_none() {
            return Err(DeviceError::NotOpen);
        }
        if state.fail_writes {
            return Err(DeviceError::Write("mock write failure".to_string()));
        }

        match self.consumption {
            Consumption::Manual => {
                state.written.extend_from_slice(data);
                state.queued += data.len();
            }
            Consumption::RealTime => state.total_written += data.len(),
        }
        Ok(())
    }

    fn query_backlog(&self) -> Result<Backlog, DeviceError> {
        let state = self.state.lock();
        let format = state.format.ok_or(DeviceError::NotOpen)?;

        let queued_bytes = match self.consumption {
            Consumption::Manual => state.queued,
            Consumption::RealTime => {
                let elapsed = state
                    .opened_at
                    .map(|opened| opened.elapsed().as_secs_f64())
                    .unwrap_or(0.0);
                let bytes_per_second = format.sample_rate as f64
                    * f64::from(format.channels)
                    * format.format.bytes_per_sample() as f64;
                let played = (elapsed * bytes_per_second) as usize;
                state.total_written.saturating_sub(played)
            }
        };

        let fragment_size = format.fragment_size.max(1);
        Ok(Backlog {
            fragments_total: format.fragments_total,
            fragments_queued: queued_bytes.div_ceil(fragment_size).min(format.fragments_total),
        })
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        state.queued = 0;
        state.total_written = 0;
        if state.opened_at.is_some() {
            state.opened_at = Some(Instant::now());
        }
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        if state.format.take().is_some() {
            info!(device = self.name, "Closed device.");
        }
        state.queued = 0;
        state.total_written = 0;
        state.opened_at = None;
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
