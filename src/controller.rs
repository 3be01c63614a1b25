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
use std::io;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, error, info, span, warn, Level};

use crate::config::{self, Profile};
use crate::metronome::{
    meter::{Accents, MeterState},
    Settings,
};
use crate::protocol::{Command, ControlHandle, Response};
use crate::tempo::{self, TapTempo};

pub mod keyboard;

/// How often responses from the audio thread are checked.
pub const RESPONSE_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Controller events that change what the metronome plays.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Starts ticking. If already running, does nothing.
    Start,

    /// Stops ticking. If not running, does nothing.
    Stop,

    /// Starts if stopped, stops if running.
    Toggle,

    /// Sets the tempo in BPM.
    SetBpm(u32),

    /// Changes the tempo by the given number of BPM.
    AdjustBpm(i32),

    /// Multiplies the tempo by the given factor.
    ScaleBpm(f64),

    SetMeter(usize),

    SetAccents(Accents),

    SetVolume(f64),

    /// Sets the tempo from the time since the previous tap.
    Tap,

    /// Switches to the named profile's speed, meter and accents.
    Profile(String),

    /// Stops the metronome and shuts down the audio thread.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// What the controller currently believes about the metronome.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub running: bool,
    pub bpm: u32,
    pub meter: usize,
    pub accents: Accents,
    pub volume: f64,
    /// The most recently started beat.
    pub beat: Option<usize>,
    /// Why the last start failed, if it did.
    pub last_error: Option<String>,
}

/// Controls the metronome's audio thread.
pub struct Controller {
    handle: JoinHandle<()>,
    status: Arc<Mutex<Status>>,
}

impl Controller {
    /// Creates a new controller driving the given audio thread. Must be called
    /// from within a tokio runtime.
    pub fn new(
        control: ControlHandle,
        audio_thread: thread::JoinHandle<()>,
        config: &config::Metronome,
        settings: Settings,
        driver: Arc<dyn Driver>,
    ) -> Controller {
        let bpm = (settings.frequency * 60.0).round() as u32;
        let status = Arc::new(Mutex::new(Status {
            running: false,
            bpm,
            meter: settings.meter.meter(),
            accents: settings.meter.accents().clone(),
            volume: settings.volume,
            beat: None,
            last_error: None,
        }));
        let state = State {
            control,
            audio_thread: Some(audio_thread),
            status: status.clone(),
            meter: settings.meter.clone(),
            min_bpm: config.min_bpm(),
            max_bpm: config.max_bpm(),
            profiles: config.profiles().to_vec(),
            command_on_start: config.command_on_start().map(str::to_string),
            command_on_stop: config.command_on_stop().map(str::to_string),
            tap: TapTempo::new(),
        };
        state.push_settings(&settings);

        Controller {
            handle: tokio::spawn(async move { Controller::trigger_events(state, driver).await }),
            status,
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// A snapshot of the current status.
    pub fn status(&self) -> Status {
        self.status.lock().clone()
    }

    /// Handles driver events and audio thread responses until told to quit.
    async fn trigger_events(mut state: State, driver: Arc<dyn Driver>) {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);
        let mut poll = tokio::time::interval(RESPONSE_POLL_INTERVAL);

        info!(bpm = state.status.lock().bpm, "Controller started.");

        loop {
            tokio::select! {
                event = events_rx.recv() => match event {
                    Some(Event::Quit) => {
                        info!("Controller quitting.");
                        break;
                    }
                    Some(event) => {
                        info!(event = format!("{:?}", event), "Received event.");
                        state.handle(event);
                    }
                    None => {
                        info!("Controller closing.");
                        break;
                    }
                },
                _ = poll.tick() => state.poll_responses(),
            }
        }

        state.shutdown().await;
        if let Err(e) = join_handle.await {
            error!("Error waiting for event monitor to stop: {}", e);
        }
    }
}

/// The controller's side of the metronome.
struct State {
    control: ControlHandle,
    audio_thread: Option<thread::JoinHandle<()>>,
    status: Arc<Mutex<Status>>,
    meter: MeterState,
    min_bpm: u32,
    max_bpm: u32,
    profiles: Vec<Profile>,
    command_on_start: Option<String>,
    command_on_stop: Option<String>,
    tap: TapTempo,
}

impl State {
    fn send(&self, command: Command) {
        if let Err(e) = self.control.send(command) {
            error!(err = %e, "Error talking to audio thread");
        }
    }

    /// Sends the full configuration so the audio thread matches our view of it.
    fn push_settings(&self, settings: &Settings) {
        self.send(Command::SetSoundSystem(settings.sound_system.clone()));
        self.send(Command::SetDevice(settings.device.clone()));
        self.send(Command::SetSound(settings.sound.clone()));
        self.send(Command::SetMeter(settings.meter.meter()));
        self.send(Command::SetAccents(settings.meter.accents().clone()));
        self.send(Command::SetFrequency(settings.frequency));
        self.send(Command::SetVolume(settings.volume));
        self.send(Command::StartSync);
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Start => self.start(),
            Event::Stop => self.stop(),
            Event::Toggle => {
                if self.status.lock().running {
                    self.stop()
                } else {
                    self.start()
                }
            }
            Event::SetBpm(bpm) => self.set_bpm(i64::from(bpm)),
            Event::AdjustBpm(delta) => {
                let bpm = self.status.lock().bpm;
                self.set_bpm(i64::from(bpm) + i64::from(delta));
            }
            Event::ScaleBpm(factor) => {
                let bpm = self.status.lock().bpm;
                self.set_bpm((f64::from(bpm) * factor).round() as i64);
            }
            Event::SetMeter(meter) => self.set_meter(meter),
            Event::SetAccents(accents) => self.set_accents(accents),
            Event::SetVolume(volume) => {
                self.send(Command::SetVolume(volume));
                self.send(Command::GetVolume);
            }
            Event::Tap => match self.tap.tap() {
                Some(bpm) => self.set_bpm(i64::from(bpm)),
                None => info!("Tap again to set the tempo."),
            },
            Event::Profile(name) => self.apply_profile(&name),
            Event::Quit => {}
        }
    }

    fn start(&mut self) {
        {
            let mut status = self.status.lock();
            if status.running {
                return;
            }
            status.running = true;
            status.beat = None;
            status.last_error = None;
        }
        self.send(Command::StartMetronome);
        run_hook(self.command_on_start.as_deref());
    }

    fn stop(&mut self) {
        {
            let mut status = self.status.lock();
            if !status.running {
                return;
            }
            status.running = false;
            status.beat = None;
        }
        self.send(Command::StopMetronome);
        run_hook(self.command_on_stop.as_deref());
    }

    fn set_bpm(&mut self, bpm: i64) {
        let bpm = tempo::clamp_bpm(bpm, self.min_bpm, self.max_bpm);
        self.status.lock().bpm = bpm;
        self.send(Command::SetFrequency(tempo::bpm_to_frequency(bpm)));
        info!(
            bpm,
            tempo = tempo::tempo_name(bpm).unwrap_or_default(),
            "Tempo set."
        );
    }

    fn set_meter(&mut self, meter: usize) {
        if let Err(e) = self.meter.set_meter(meter) {
            warn!(err = %e, "Ignoring meter");
            return;
        }
        let mut status = self.status.lock();
        status.meter = self.meter.meter();
        status.accents = self.meter.accents().clone();
        drop(status);
        self.send(Command::SetMeter(meter));
    }

    fn set_accents(&mut self, accents: Accents) {
        self.meter.set_accents(accents.clone());
        self.status.lock().accents = self.meter.accents().clone();
        self.send(Command::SetAccents(accents));
    }

    fn apply_profile(&mut self, name: &str) {
        let profile = match config::find_profile(&self.profiles, name) {
            Ok(profile) => profile.clone(),
            Err(e) => {
                warn!(err = %e, "Ignoring profile");
                return;
            }
        };
        info!(profile = name, "Switching profile.");

        if let Some(speed) = profile.speed() {
            self.set_bpm(i64::from(speed));
        }
        if let Some(meter) = profile.meter() {
            self.set_meter(meter);
        }
        match profile.accents() {
            Ok(Some(accents)) => self.set_accents(accents),
            Ok(None) => {}
            Err(e) => warn!(err = %e, "Ignoring profile accents"),
        }
    }

    /// Drains every pending response from the audio thread.
    fn poll_responses(&mut self) {
        loop {
            match self.control.try_recv() {
                Ok(Some(Response::Sync(beat))) => {
                    let mut status = self.status.lock();
                    status.beat = Some(beat);
                    debug!(beat = beat + 1, meter = status.meter, "Beat");
                }
                Ok(Some(Response::Volume(volume))) => {
                    self.status.lock().volume = volume;
                    info!(volume, "Volume set.");
                }
                Ok(Some(Response::StartError(reason))) => {
                    error!(reason, "Metronome failed to start");
                    let mut status = self.status.lock();
                    status.running = false;
                    status.last_error = Some(reason);
                }
                Ok(None) => return,
                Err(e) => {
                    error!(err = %e, "Audio thread is gone");
                    self.status.lock().running = false;
                    return;
                }
            }
        }
    }

    /// Stops the metronome and waits for the audio thread to exit.
    async fn shutdown(&mut self) {
        self.stop();
        self.send(Command::StopServer);

        if let Some(audio_thread) = self.audio_thread.take() {
            match tokio::task::spawn_blocking(move || audio_thread.join()).await {
                Ok(Ok(())) => info!("Audio thread stopped."),
                Ok(Err(_)) => error!("Audio thread panicked"),
                Err(e) => error!("Error waiting for audio thread: {}", e),
            }
        }
    }
}

/// Runs a shell command in the background.
fn run_hook(command: Option<&str>) {
    let Some(command) = command else {
        return;
    };

    debug!(command, "Running hook");
    match process::Command::new("sh").arg("-c").arg(command).spawn() {
        Ok(mut child) => {
            thread::spawn(move || {
                if let Err(e) = child.wait() {
                    warn!(err = %e, "Error waiting for hook");
                }
            });
        }
        Err(e) => error!(command, err = %e, "Unable to run hook"),
    }
}
