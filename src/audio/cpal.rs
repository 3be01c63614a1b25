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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, warn, Level};

use super::{Backlog, DeviceError, DeviceFormat, DeviceRequest, WireFormat, DEFAULT_DEVICE};

/// How much audio the ring between the feeder and the stream callback holds.
const RING_DURATION_MS: usize = 500;

/// Fewest fragments the ring is allowed to hold.
const MIN_FRAGMENTS: usize = 4;

/// A playback device backed by a cpal output stream.
///
/// The stream lives on its own output thread. Written bytes go through a
/// lock-free ring that the stream callback decodes from the wire format into
/// the stream's native sample type.
#[derive(Default)]
pub struct Device {
    output: Option<Output>,
}

/// An open output stream.
struct Output {
    /// The name of the device.
    name: String,
    /// What was granted when opening.
    format: DeviceFormat,
    /// Feeder side of the ring.
    producer: rtrb::Producer<u8>,
    /// Asks the callback to discard everything queued.
    flush: Arc<AtomicBool>,
    /// Asks the output thread to drop the stream.
    stop: Arc<AtomicBool>,
    /// Handle to the output thread (keeps the stream alive).
    output_thread: Option<thread::JoinHandle<()>>,
}

impl Drop for Output {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
    }
}

/// Everything the output thread hands back once the stream is running.
type Opened = (String, DeviceFormat, rtrb::Producer<u8>);

impl Device {
    /// Creates an unopened device.
    pub fn new() -> Device {
        Device::default()
    }

    /// Lists output devices known to cpal.
    pub fn list() -> Result<Vec<String>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<String> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let max_channels = match device.supported_output_configs() {
                    Ok(configs) => configs.map(|config| config.channels()).max().unwrap_or(0),
                    Err(_) => continue,
                };

                if max_channels > 0 {
                    devices.push(format!(
                        "{} (Channels={}) ({})",
                        device.name()?,
                        max_channels,
                        host_id.name()
                    ));
                }
            }
        }

        devices.sort();
        Ok(devices)
    }
}

/// Finds the named output device. "default" selects the host's default output.
fn find_device(name: &str) -> Result<cpal::Device, DeviceError> {
    // Suppress noisy output here.
    let _shh_stdout = shh::stdout().ok();
    let _shh_stderr = shh::stderr().ok();

    let host = cpal::default_host();
    if name.is_empty() || name == DEFAULT_DEVICE {
        return host
            .default_output_device()
            .ok_or_else(|| DeviceError::NotFound(name.to_string()));
    }

    let devices = host.output_devices().map_err(|e| DeviceError::Open {
        device: name.to_string(),
        reason: e.to_string(),
    })?;
    for device in devices {
        if device.name().map(|n| n.trim() == name).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(DeviceError::NotFound(name.to_string()))
}

/// Lower is better. 16-bit integer streams need no conversion.
fn sample_format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::I16 => 0,
        cpal::SampleFormat::F32 => 1,
        _ => 2,
    }
}

/// Picks the supported stream configuration closest to the request.
fn negotiate(
    device: &cpal::Device,
    request: &DeviceRequest,
) -> Result<cpal::SupportedStreamConfig, DeviceError> {
    let rate = cpal::SampleRate(request.sample_rate);
    let best = device
        .supported_output_configs()
        .map_err(|e| DeviceError::Open {
            device: request.name.clone(),
            reason: e.to_string(),
        })?
        .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
        .min_by_key(|range| {
            (
                range.channels() != request.channels,
                sample_format_rank(range.sample_format()),
                range.channels(),
            )
        });

    match best {
        Some(range) => Ok(range.with_sample_rate(rate)),
        None => device
            .default_output_config()
            .map_err(|_| DeviceError::UnsupportedFormat {
                device: request.name.clone(),
            }),
    }
}

/// Fills the stream buffer from the ring, decoding wire-format samples.
fn fill_from_ring<T>(
    data: &mut [T],
    consumer: &mut rtrb::Consumer<u8>,
    format: WireFormat,
    flush: &AtomicBool,
) where
    T: cpal::Sample + cpal::FromSample<i16>,
{
    if flush.swap(false, Ordering::Relaxed) {
        let queued = consumer.slots();
        if let Ok(chunk) = consumer.read_chunk(queued) {
            chunk.commit_all();
        }
    }

    let width = format.bytes_per_sample();
    let mut bytes = [0u8; 2];
    for sample in data.iter_mut() {
        if consumer.slots() < width {
            *sample = T::EQUILIBRIUM;
            continue;
        }
        for byte in bytes.iter_mut().take(width) {
            *byte = consumer.pop().unwrap_or(0);
        }
        *sample = T::from_sample(format.decode(&bytes[..width]));
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut consumer: rtrb::Consumer<u8>,
    format: WireFormat,
    flush: Arc<AtomicBool>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            fill_from_ring(data, &mut consumer, format, &flush);
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}

/// Opens the device and starts a stream; returns once the stream is playing.
/// The stream itself stays on the output thread.
fn start_output_thread(
    request: &DeviceRequest,
    flush: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
) -> Result<(Opened, thread::JoinHandle<()>), DeviceError> {
    let (opened_tx, opened_rx) = crossbeam_channel::bounded::<Result<Opened, DeviceError>>(1);
    let thread_request = request.clone();

    let output_thread = thread::spawn(move || {
        let request = thread_request;
        let span = span!(Level::INFO, "cpal output");
        let _enter = span.enter();

        let device = match find_device(&request.name) {
            Ok(device) => device,
            Err(e) => {
                let _ = opened_tx.send(Err(e));
                return;
            }
        };
        let name = device.name().unwrap_or_else(|_| request.name.clone());

        let supported = match negotiate(&device, &request) {
            Ok(supported) => supported,
            Err(e) => {
                let _ = opened_tx.send(Err(e));
                return;
            }
        };
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        // The ring carries whatever wire format was asked for.
        let wire_format = match request.format {
            WireFormat::Unsupported(_) => WireFormat::S16Le,
            format => format,
        };
        let fragment_size = request.min_fragment_size.max(1).next_power_of_two();
        let bytes_per_second = config.sample_rate.0 as usize
            * usize::from(config.channels)
            * wire_format.bytes_per_sample();
        let fragments_total = (bytes_per_second * RING_DURATION_MS / 1000)
            .div_ceil(fragment_size)
            .max(MIN_FRAGMENTS);
        let (producer, consumer) = rtrb::RingBuffer::<u8>::new(fragments_total * fragment_size);

        let stream_result = match sample_format {
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, consumer, wire_format, flush)
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, consumer, wire_format, flush)
            }
            cpal::SampleFormat::I32 => {
                build_stream::<i32>(&device, &config, consumer, wire_format, flush)
            }
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, consumer, wire_format, flush)
            }
            cpal::SampleFormat::F64 => {
                build_stream::<f64>(&device, &config, consumer, wire_format, flush)
            }
            other => {
                warn!(format = ?other, "Unsupported stream sample format");
                let _ = opened_tx.send(Err(DeviceError::UnsupportedFormat {
                    device: name.clone(),
                }));
                return;
            }
        };

        let stream = match stream_result {
            Ok(stream) => stream,
            Err(e) => {
                let _ = opened_tx.send(Err(DeviceError::Open {
                    device: name.clone(),
                    reason: e.to_string(),
                }));
                return;
            }
        };
        if let Err(e) = stream.play() {
            let _ = opened_tx.send(Err(DeviceError::Open {
                device: name.clone(),
                reason: e.to_string(),
            }));
            return;
        }

        let format = DeviceFormat {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
            format: wire_format,
            fragment_size,
            fragments_total,
        };
        info!(
            device = name,
            stream_format = ?sample_format,
            "CPAL output stream started successfully"
        );
        if opened_tx.send(Ok((name, format, producer))).is_err() {
            return;
        }

        // Keep the stream alive until closed.
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(10));
        }
        drop(stream);
    });

    match opened_rx.recv() {
        Ok(Ok(opened)) => Ok((opened, output_thread)),
        Ok(Err(e)) => {
            let _ = output_thread.join();
            Err(e)
        }
        Err(_) => {
            let _ = output_thread.join();
            Err(DeviceError::Open {
                device: request.name.clone(),
                reason: "output thread exited".to_string(),
            })
        }
    }
}

impl super::Device for Device {
    fn open(&mut self, request: &DeviceRequest) -> Result<DeviceFormat, DeviceError> {
        let span = span!(Level::INFO, "open device (cpal)");
        let _enter = span.enter();

        super::Device::close(self);

        let flush = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let ((name, format, producer), output_thread) =
            start_output_thread(request, flush.clone(), stop.clone())?;

        info!(
            device = name,
            rate = format.sample_rate,
            channels = format.channels,
            format = format.format.to_string(),
            fragment_size = format.fragment_size,
            fragments_total = format.fragments_total,
            "Opened device."
        );

        self.output = Some(Output {
            name,
            format,
            producer,
            flush,
            stop,
            output_thread: Some(output_thread),
        });
        Ok(format)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), DeviceError> {
        let output = self.output.as_mut().ok_or(DeviceError::NotOpen)?;
        let free = output.producer.slots();
        let len = data.len().min(free);
        if len > 0 {
            if let Ok(chunk) = output.producer.write_chunk_uninit(len) {
                chunk.fill_from_iter(data.iter().copied());
            }
        }
        if len < data.len() {
            return Err(DeviceError::Write(format!(
                "ring full, dropped {} bytes",
                data.len() - len
            )));
        }
        Ok(())
    }

    fn query_backlog(&self) -> Result<Backlog, DeviceError> {
        let output = self.output.as_ref().ok_or(DeviceError::NotOpen)?;
        let total = output.format.fragments_total;
        let free = output.producer.slots() / output.format.fragment_size;
        Ok(Backlog {
            fragments_total: total,
            fragments_queued: total.saturating_sub(free),
        })
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        let output = self.output.as_ref().ok_or(DeviceError::NotOpen)?;
        output.flush.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(output) = self.output.take() {
            info!(device = output.name, "Closed device.");
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.output {
            Some(output) => write!(f, "{} (CPAL)", output.name),
            None => write!(f, "closed (CPAL)"),
        }
    }
}
