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

//! The audio thread's state machine and feeder loop.
//!
//! The engine is either idle or running a session. While running, each step
//! tops the device buffer up to the write-ahead target, one fragment at a
//! time, walking the tick and cycle position byte by byte.

use std::time::Duration;

use tracing::{debug, error, info, span, warn, Level};

use crate::{
    audio::{self, Device, DeviceError, DeviceRequest, PlaybackConfig, Waveform},
    protocol::{Command, Response, ServerEndpoint},
    tempo,
};

use super::{
    meter::MeterState,
    sound::{SoundError, SoundSpec},
    ticks::TickBuffers,
    Settings,
};

/// Creates unopened devices for a sound system name.
pub type DeviceFactory = Box<dyn Fn(&str) -> Result<Box<dyn Device>, DeviceError> + Send>;

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Sound(#[from] SoundError),
}

/// Where playback is within the current tick and cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// The current beat within the meter.
    pub cycle_pos: usize,
    /// Byte offset within the current tick.
    pub tick_pos: usize,
}

impl Position {
    /// Moves to the next beat if the tick is over. Returns the new beat.
    fn wrap(&mut self, tick_len: usize, meter: usize) -> Option<usize> {
        if self.tick_pos < tick_len {
            return None;
        }
        self.tick_pos = 0;
        self.cycle_pos = (self.cycle_pos + 1) % meter.max(1);
        Some(self.cycle_pos)
    }

    /// Advances one byte. Returns the new beat if a tick ended.
    fn advance(&mut self, tick_len: usize, meter: usize) -> Option<usize> {
        self.tick_pos += 1;
        self.wrap(tick_len, meter)
    }
}

/// Bytes from the start of one tick to the start of the next.
pub fn tick_length_bytes(config: &PlaybackConfig, frequency: f64) -> usize {
    let frames = (f64::from(config.sample_rate) / frequency).round().max(1.0) as usize;
    frames.saturating_mul(config.frame_width())
}

/// How many fragments to keep queued for the given lead time. Never fewer than two.
pub fn write_ahead_fragments(config: &PlaybackConfig, write_ahead: Duration) -> usize {
    let bytes = config.bytes_per_second() as u128 * write_ahead.as_millis();
    let per_fragment = 1000 * config.fragment_size.max(1) as u128;
    (bytes.div_ceil(per_fragment) as usize).max(2)
}

/// How long the feeder sleeps between runs: half the write-ahead, kept within
/// the accepted write-ahead range.
pub fn feed_interval(write_ahead: Duration) -> Duration {
    write_ahead.clamp(super::MIN_WRITE_AHEAD, super::MAX_WRITE_AHEAD) / 2
}

/// An open device and everything rendered for it.
struct Session {
    device: Box<dyn Device>,
    config: PlaybackConfig,
    waveform: Waveform,
    ticks: TickBuffers,
    position: Position,
    fragment: Vec<u8>,
}

impl Session {
    /// Renders the next fragment, collecting the beats that start in it.
    fn fill_fragment(&mut self, meter: &MeterState, tick_len: usize, beats: &mut Vec<usize>) {
        let Session {
            config,
            ticks,
            position,
            fragment,
            ..
        } = self;

        fragment.clear();
        let silence = ticks.silence();
        for _ in 0..config.fragment_size {
            let buffer = ticks.buffer(meter.tick_kind(position.cycle_pos));
            let byte = match buffer.get(position.tick_pos) {
                Some(byte) => *byte,
                None => silence
                    .get(position.tick_pos % silence.len().max(1))
                    .copied()
                    .unwrap_or(0),
            };
            fragment.push(byte);

            if let Some(beat) = position.advance(tick_len, meter.meter()) {
                beats.push(beat);
            }
        }
    }

    fn rebuild(&mut self) {
        self.ticks = TickBuffers::rebuild(&self.waveform, &self.config);
    }
}

enum State {
    Idle,
    Running(Session),
}

/// The metronome's audio side. Owned by the audio thread.
pub struct AudioEngine {
    settings: Settings,
    state: State,
    endpoint: ServerEndpoint,
    device_factory: DeviceFactory,
    beats: Vec<usize>,
}

impl AudioEngine {
    /// Creates an idle engine that opens devices by sound system name.
    pub fn new(endpoint: ServerEndpoint, settings: Settings) -> AudioEngine {
        AudioEngine::with_device_factory(endpoint, settings, Box::new(audio::get_device))
    }

    /// Creates an idle engine with a custom source of devices.
    pub fn with_device_factory(
        endpoint: ServerEndpoint,
        settings: Settings,
        device_factory: DeviceFactory,
    ) -> AudioEngine {
        AudioEngine {
            settings,
            state: State::Idle,
            endpoint,
            device_factory,
            beats: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// The current position, if running.
    pub fn position(&self) -> Option<Position> {
        match &self.state {
            State::Running(session) => Some(session.position),
            State::Idle => None,
        }
    }

    /// Runs until a StopServer command arrives or the control side goes away.
    pub fn run(&mut self) {
        let span = span!(Level::INFO, "audio engine");
        let _enter = span.enter();

        info!("Audio engine started.");
        let interval = feed_interval(self.settings.write_ahead);
        while self.step() {
            spin_sleep::sleep(interval);
        }
        self.stop();
        info!("Audio engine stopped.");
    }

    /// Handles all pending commands, then feeds the device if running.
    /// Returns false once the engine should exit.
    pub fn step(&mut self) -> bool {
        loop {
            match self.endpoint.try_recv() {
                Ok(Some(command)) => {
                    if !self.handle_command(command) {
                        return false;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(err = %e, "Control channel closed, stopping");
                    return false;
                }
            }
        }

        self.feed();
        true
    }

    /// Applies one command. Returns false for StopServer.
    pub fn handle_command(&mut self, command: Command) -> bool {
        debug!(command = ?command, "Received command");
        match command {
            Command::StopServer => return false,
            Command::SetDevice(device) => self.settings.device = device,
            Command::SetSound(sound) => self.set_sound(sound),
            Command::SetSoundSystem(sound_system) => self.settings.sound_system = sound_system,
            Command::SetMeter(meter) => {
                if let Err(e) = self.settings.meter.set_meter(meter) {
                    warn!(err = %e, "Ignoring meter");
                }
            }
            Command::SetAccents(accents) => self.settings.meter.set_accents(accents),
            Command::SetFrequency(frequency) => {
                if frequency.is_finite() && frequency >= tempo::bpm_to_frequency(tempo::MIN_BPM)
                {
                    self.settings.frequency = frequency;
                } else {
                    warn!(frequency, "Ignoring frequency");
                }
            }
            Command::StartMetronome => {
                if self.is_running() {
                    warn!("Metronome already running");
                } else if let Err(e) = self.start() {
                    error!(err = %e, "Unable to start metronome");
                    self.respond(Response::StartError(e.to_string()));
                }
            }
            Command::StopMetronome => self.stop(),
            Command::StartSync => self.settings.sync = true,
            Command::StopSync => self.settings.sync = false,
            Command::SetVolume(volume) => self.set_volume(volume),
            Command::GetVolume => self.respond(Response::Volume(self.settings.volume)),
        }
        true
    }

    /// Opens the device and renders the ticks. On failure nothing stays open.
    fn start(&mut self) -> Result<(), StartError> {
        let mut device = (self.device_factory)(&self.settings.sound_system)?;
        let request = DeviceRequest {
            name: self.settings.device.clone(),
            ..self.settings.request.clone()
        };

        let format = match device.open(&request) {
            Ok(format) => format,
            Err(e) => {
                device.close();
                return Err(e.into());
            }
        };
        let config = format.playback_config(self.settings.volume);

        let waveform = match self.settings.sound.load() {
            Ok(waveform) => waveform,
            Err(e) => {
                device.close();
                return Err(e.into());
            }
        };
        let ticks = TickBuffers::rebuild(&waveform, &config);

        info!(
            device = device.to_string(),
            sound = self.settings.sound.to_string(),
            frequency = self.settings.frequency,
            meter = self.settings.meter.meter(),
            "Metronome running."
        );
        self.state = State::Running(Session {
            device,
            fragment: Vec::with_capacity(config.fragment_size),
            config,
            waveform,
            ticks,
            position: Position::default(),
        });
        Ok(())
    }

    /// Closes the device and drops the rendered ticks. Does nothing when idle.
    fn stop(&mut self) {
        if let State::Running(mut session) = std::mem::replace(&mut self.state, State::Idle) {
            if let Err(e) = session.device.reset() {
                debug!(err = %e, "Unable to reset device");
            }
            session.device.close();
            info!("Metronome stopped.");
        }
    }

    fn set_volume(&mut self, volume: f64) {
        if volume.is_nan() {
            warn!("Ignoring volume");
            return;
        }
        self.settings.volume = volume.clamp(0.0, 1.0);
        if let State::Running(session) = &mut self.state {
            session.config.volume = self.settings.volume;
            session.rebuild();
        }
    }

    fn set_sound(&mut self, sound: SoundSpec) {
        self.settings.sound = sound;
        if let State::Running(session) = &mut self.state {
            match self.settings.sound.load() {
                Ok(waveform) => {
                    session.waveform = waveform;
                    session.rebuild();
                }
                Err(e) => warn!(err = %e, "Keeping the current sound"),
            }
        }
    }

    /// Tops the device buffer up to the write-ahead target.
    fn feed(&mut self) {
        let State::Running(session) = &mut self.state else {
            return;
        };

        let backlog = match session.device.query_backlog() {
            Ok(backlog) => backlog,
            Err(e) => {
                warn!(err = %e, "Unable to query device backlog");
                return;
            }
        };
        let target = write_ahead_fragments(&session.config, self.settings.write_ahead)
            .min(backlog.fragments_total);
        let missing = target.saturating_sub(backlog.fragments_queued);

        let tick_len = tick_length_bytes(&session.config, self.settings.frequency);
        let meter = &self.settings.meter;
        self.beats.clear();
        if let Some(beat) = session.position.wrap(tick_len, meter.meter()) {
            self.beats.push(beat);
        }

        for _ in 0..missing {
            session.fill_fragment(meter, tick_len, &mut self.beats);
            if let Err(e) = session.device.write(&session.fragment) {
                warn!(err = %e, "Dropped fragment");
            }
        }

        if self.settings.sync {
            for beat in &self.beats {
                if self.endpoint.send(Response::Sync(*beat)).is_err() {
                    break;
                }
            }
        }
    }

    fn respond(&self, response: Response) {
        if let Err(e) = self.endpoint.send(response) {
            debug!(err = %e, "Dropping response");
        }
    }
}

#[cfg(test)]
mod test {
    use std::{str::FromStr, thread};

    use super::*;
    use crate::{
        audio::{mock, DeviceFormat, WireFormat},
        metronome::meter::{Accents, TickKind},
        protocol::{self, ControlHandle},
    };

    /// 1kHz mono 16-bit with one fragment per 10Hz tick.
    fn tick_format() -> DeviceFormat {
        DeviceFormat {
            sample_rate: 1000,
            channels: 1,
            format: WireFormat::S16Le,
            fragment_size: 200,
            fragments_total: 16,
        }
    }

    fn settings() -> Settings {
        Settings {
            sound_system: "mock".to_string(),
            frequency: 10.0,
            // Three 200 byte fragments at 2000 bytes per second.
            write_ahead: Duration::from_millis(300),
            ..Default::default()
        }
    }

    fn engine_with(settings: Settings) -> (AudioEngine, ControlHandle, mock::Device) {
        let device = mock::Device::get("mock");
        device.grant(tick_format());
        let (control, endpoint) = protocol::channel();
        let factory_device = device.clone();
        let engine = AudioEngine::with_device_factory(
            endpoint,
            settings,
            Box::new(move |_| Ok(Box::new(factory_device.clone()))),
        );
        (engine, control, device)
    }

    fn responses(control: &ControlHandle) -> Vec<Response> {
        let mut responses = Vec::new();
        while let Ok(Some(response)) = control.try_recv() {
            responses.push(response);
        }
        responses
    }

    fn expected_ticks(settings: &Settings) -> TickBuffers {
        let waveform = settings.sound.load().unwrap();
        TickBuffers::rebuild(&waveform, &tick_format().playback_config(settings.volume))
    }

    #[test]
    fn test_tick_length() {
        let config = PlaybackConfig::default();
        assert_eq!(tick_length_bytes(&config, 1.25), 35280 * 2);
        let stereo = PlaybackConfig {
            channels: 2,
            ..PlaybackConfig::default()
        };
        // 44100 / 7 = 6300 frames.
        assert_eq!(tick_length_bytes(&stereo, 7.0), 6300 * 4);
        // Never shorter than one frame.
        assert_eq!(tick_length_bytes(&config, 1e9), 2);
        // Absurdly slow ticks saturate instead of overflowing.
        assert_eq!(tick_length_bytes(&stereo, 1e-20), usize::MAX);
    }

    #[test]
    fn test_write_ahead_fragments() {
        let config = PlaybackConfig {
            fragment_size: 256,
            ..PlaybackConfig::default()
        };
        // 88200 bytes per second * 0.1s / 256 = 34.45.
        assert_eq!(
            write_ahead_fragments(&config, Duration::from_millis(100)),
            35
        );
        assert_eq!(write_ahead_fragments(&config, Duration::from_millis(1)), 2);
        assert_eq!(write_ahead_fragments(&config, Duration::ZERO), 2);
    }

    #[test]
    fn test_feed_interval() {
        assert_eq!(feed_interval(Duration::from_millis(100)), Duration::from_millis(50));
        assert_eq!(feed_interval(Duration::ZERO), Duration::from_millis(5));
        assert_eq!(feed_interval(Duration::from_secs(3600)), Duration::from_secs(1));
    }

    #[test]
    fn test_position_wrap() {
        let mut position = Position::default();
        let mut beats = Vec::new();
        for _ in 0..3 * 4 {
            if let Some(beat) = position.advance(4, 3) {
                beats.push(beat);
            }
        }
        assert_eq!(beats, vec![1, 2, 0]);
        assert_eq!(position, Position::default());
    }

    #[test]
    fn test_start_and_feed() {
        let (mut engine, control, device) = engine_with(settings());
        assert!(engine.handle_command(Command::StartMetronome));
        assert!(engine.is_running());
        assert!(device.is_open());

        assert!(engine.step());
        assert_eq!(device.written_len(), 600);

        // The device is full, so nothing more is written.
        assert!(engine.step());
        assert_eq!(device.written_len(), 600);

        let written = device.take_written();
        let ticks = expected_ticks(engine.settings());
        let plain = ticks.buffer(TickKind::Plain);
        assert_eq!(&written[..plain.len()], plain);
        assert!(written[plain.len()..200].iter().all(|byte| *byte == 0));
        // A single beat meter still syncs on every tick.
        assert_eq!(
            responses(&control),
            vec![Response::Sync(0), Response::Sync(0), Response::Sync(0)]
        );
    }

    #[test]
    fn test_sync_per_beat() {
        let mut settings = settings();
        settings.meter = MeterState::new(3, Accents::default()).unwrap();
        settings.sync = true;
        let (mut engine, control, device) = engine_with(settings);
        engine.handle_command(Command::StartMetronome);

        // Exactly three ticks are written.
        engine.step();
        assert_eq!(device.written_len(), 600);
        assert_eq!(
            responses(&control),
            vec![Response::Sync(1), Response::Sync(2), Response::Sync(0)]
        );
        assert_eq!(engine.position(), Some(Position::default()));

        device.take_written();
        engine.step();
        assert_eq!(
            responses(&control),
            vec![Response::Sync(1), Response::Sync(2), Response::Sync(0)]
        );
    }

    #[test]
    fn test_stop_sync() {
        let mut settings = settings();
        settings.sync = true;
        let (mut engine, control, _device) = engine_with(settings);
        engine.handle_command(Command::StopSync);
        engine.handle_command(Command::StartMetronome);
        engine.step();
        assert!(responses(&control).is_empty());
    }

    #[test]
    fn test_accents() {
        let mut settings = settings();
        settings.meter = MeterState::new(3, Accents::from_str("1").unwrap()).unwrap();
        let (mut engine, _control, device) = engine_with(settings);
        engine.handle_command(Command::StartMetronome);
        engine.step();

        let written = device.take_written();
        let ticks = expected_ticks(engine.settings());
        let accented = ticks.buffer(TickKind::Accented);
        let secondary = ticks.buffer(TickKind::Secondary);
        assert_ne!(accented, secondary);
        assert_eq!(&written[..accented.len()], accented);
        assert_eq!(&written[200..200 + secondary.len()], secondary);
        assert_eq!(&written[400..400 + secondary.len()], secondary);
    }

    #[test]
    fn test_single_beat_meter_plays_plain() {
        let mut settings = settings();
        settings.meter = MeterState::new(1, Accents::from_str("0").unwrap()).unwrap();
        let (mut engine, _control, device) = engine_with(settings);
        engine.handle_command(Command::StartMetronome);
        engine.step();

        let written = device.take_written();
        let ticks = expected_ticks(engine.settings());
        let plain = ticks.buffer(TickKind::Plain);
        for tick in written.chunks(200) {
            assert_eq!(&tick[..plain.len()], plain);
        }
    }

    #[test]
    fn test_stop_while_idle_is_a_noop() {
        let (mut engine, control, device) = engine_with(settings());
        let before = engine.settings().clone();
        assert!(engine.handle_command(Command::StopMetronome));
        assert!(!engine.is_running());
        assert_eq!(engine.settings(), &before);
        assert_eq!(device.opens(), 0);
        assert!(responses(&control).is_empty());
    }

    #[test]
    fn test_start_while_running_is_a_noop() {
        let (mut engine, control, device) = engine_with(settings());
        engine.handle_command(Command::StartMetronome);
        engine.handle_command(Command::StartMetronome);
        assert!(engine.is_running());
        assert_eq!(device.opens(), 1);
        assert!(responses(&control).is_empty());
    }

    #[test]
    fn test_stop_closes_device() {
        let (mut engine, _control, device) = engine_with(settings());
        engine.handle_command(Command::StartMetronome);
        engine.handle_command(Command::StopMetronome);
        assert!(!engine.is_running());
        assert!(!device.is_open());
        assert_eq!(engine.position(), None);
    }

    #[test]
    fn test_open_failure_reports_start_error() {
        let (mut engine, control, device) = engine_with(settings());
        device.fail_open(true);
        engine.handle_command(Command::StartMetronome);
        assert!(!engine.is_running());
        assert!(!device.is_open());
        assert!(matches!(
            responses(&control).as_slice(),
            [Response::StartError(_)]
        ));
    }

    #[test]
    fn test_sound_failure_rolls_back() {
        let (mut engine, control, device) = engine_with(settings());
        engine.handle_command(Command::SetSound(SoundSpec::parse("/nonexistent/tick.wav")));
        engine.handle_command(Command::StartMetronome);
        assert!(!engine.is_running());
        assert_eq!(device.opens(), 1);
        assert!(!device.is_open());
        match responses(&control).as_slice() {
            [Response::StartError(reason)] => assert!(reason.contains("tick.wav")),
            other => panic!("unexpected responses {:?}", other),
        }
    }

    #[test]
    fn test_unknown_sound_system() {
        let (control, endpoint) = protocol::channel();
        let mut engine = AudioEngine::new(
            endpoint,
            Settings {
                sound_system: "carrier-pigeon".to_string(),
                ..Default::default()
            },
        );
        engine.handle_command(Command::StartMetronome);
        assert!(!engine.is_running());
        assert!(matches!(
            responses(&control).as_slice(),
            [Response::StartError(reason)] if reason.contains("carrier-pigeon")
        ));
    }

    #[test]
    fn test_volume() {
        let (mut engine, control, device) = engine_with(settings());
        engine.handle_command(Command::SetVolume(2.0));
        engine.handle_command(Command::GetVolume);
        engine.handle_command(Command::SetVolume(-1.0));
        engine.handle_command(Command::GetVolume);
        engine.handle_command(Command::SetVolume(f64::NAN));
        engine.handle_command(Command::GetVolume);
        assert_eq!(
            responses(&control),
            vec![
                Response::Volume(1.0),
                Response::Volume(0.0),
                Response::Volume(0.0)
            ]
        );

        // Volume changes while running rebuild the ticks.
        engine.handle_command(Command::SetVolume(1.0));
        engine.handle_command(Command::StartMetronome);
        engine.step();
        assert!(device.take_written().iter().any(|byte| *byte != 0));

        engine.handle_command(Command::SetVolume(0.0));
        engine.step();
        assert!(device.take_written().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let (mut engine, _control, _device) = engine_with(settings());
        engine.handle_command(Command::SetFrequency(0.0));
        engine.handle_command(Command::SetFrequency(-3.0));
        engine.handle_command(Command::SetFrequency(f64::INFINITY));
        engine.handle_command(Command::SetFrequency(f64::NAN));
        assert_eq!(engine.settings().frequency, 10.0);

        engine.handle_command(Command::SetMeter(0));
        engine.handle_command(Command::SetMeter(101));
        assert_eq!(engine.settings().meter.meter(), 1);
    }

    #[test]
    fn test_too_slow_frequency_is_ignored() {
        let (mut engine, control, device) = engine_with(settings());
        engine.handle_command(Command::StartMetronome);
        engine.handle_command(Command::SetFrequency(1e-20));
        engine.handle_command(Command::SetFrequency(
            tempo::bpm_to_frequency(tempo::MIN_BPM) / 2.0,
        ));
        assert_eq!(engine.settings().frequency, 10.0);

        assert!(engine.step());
        assert_eq!(device.written_len(), 600);
        assert_eq!(
            responses(&control),
            vec![Response::Sync(0), Response::Sync(0), Response::Sync(0)]
        );

        // The slowest playable tempo is accepted.
        let slowest = tempo::bpm_to_frequency(tempo::MIN_BPM);
        engine.handle_command(Command::SetFrequency(slowest));
        assert_eq!(engine.settings().frequency, slowest);
        assert!(engine.step());
    }

    #[test]
    fn test_write_failures_are_not_fatal() {
        let (mut engine, _control, device) = engine_with(settings());
        engine.handle_command(Command::StartMetronome);
        device.fail_writes(true);
        assert!(engine.step());
        assert!(engine.is_running());

        device.fail_writes(false);
        assert!(engine.step());
        assert_eq!(device.written_len(), 600);
    }

    #[test]
    fn test_sound_change_while_running() {
        let (mut engine, _control, device) = engine_with(settings());
        engine.handle_command(Command::StartMetronome);
        engine.handle_command(Command::SetSound(SoundSpec::Sine));
        engine.step();

        let written = device.take_written();
        let ticks = expected_ticks(engine.settings());
        let plain = ticks.buffer(TickKind::Plain);
        assert_eq!(&written[..plain.len()], plain);
    }

    #[test]
    fn test_stop_server() {
        let (mut engine, control, _device) = engine_with(settings());
        control.send(Command::StartMetronome).unwrap();
        control.send(Command::StopServer).unwrap();
        control.send(Command::SetMeter(4)).unwrap();
        assert!(!engine.step());
        // Commands after StopServer are not handled.
        assert_eq!(engine.settings().meter.meter(), 1);
    }

    #[test]
    fn test_disconnect_stops_engine() {
        let (mut engine, control, _device) = engine_with(settings());
        drop(control);
        assert!(!engine.step());
    }

    #[test]
    fn test_concurrent_commands_match_sequential_replay() {
        let volumes: Vec<Command> = (0..500)
            .map(|i| Command::SetVolume((i % 101) as f64 / 100.0))
            .collect();
        let meters: Vec<Command> = (0..500)
            .map(|i| Command::SetMeter(i % 100 + 1))
            .collect();

        let (mut engine, control, _device) = engine_with(settings());
        control.send(Command::StartMetronome).unwrap();
        let audio_thread = thread::spawn(move || {
            engine.run();
            engine
        });

        let senders: Vec<_> = [volumes.clone(), meters.clone()]
            .into_iter()
            .map(|commands| {
                let sender = control.command_sender();
                thread::spawn(move || {
                    for command in commands {
                        sender.send(command).unwrap();
                    }
                })
            })
            .collect();
        for sender in senders {
            sender.join().unwrap();
        }
        control.send(Command::StopServer).unwrap();
        let engine = audio_thread.join().unwrap();

        // Volume and meter commands don't interact, so any interleaving ends
        // in the same state as replaying each sender in turn.
        let (mut replay, _replay_control, _replay_device) = engine_with(settings());
        replay.handle_command(Command::StartMetronome);
        for command in volumes.into_iter().chain(meters) {
            replay.handle_command(command);
        }

        assert_eq!(engine.settings(), replay.settings());
        assert_eq!(engine.settings().meter.meter(), 100);
        assert_eq!(engine.settings().volume, 0.95);
    }
}
