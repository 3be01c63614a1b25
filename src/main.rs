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
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use mtick::audio;
use mtick::config;
use mtick::controller::RESPONSE_POLL_INTERVAL;
use mtick::metronome::{
    self,
    meter::{Accents, MeterState},
    sound::SoundSpec,
    Settings,
};
use mtick::protocol::{Command, ControlHandle, Response};
use mtick::tempo;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A software metronome."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Plays the metronome until interrupted or the duration passes.
    Play {
        /// Speed in beats per minute.
        #[arg(short, long, default_value_t = tempo::DEFAULT_BPM)]
        bpm: u32,
        /// Beats per measure.
        #[arg(short, long, default_value_t = 1)]
        meter: usize,
        /// One '0' or '1' per beat, where '1' is accented.
        #[arg(short, long, default_value = "1")]
        accents: String,
        /// Output volume from 0.0 to 1.0.
        #[arg(short, long, default_value_t = 1.0)]
        volume: f64,
        /// <default>, <sine> or a path to a sound file.
        #[arg(short, long, default_value = "<default>")]
        sound: String,
        /// The output device.
        #[arg(short, long, default_value = audio::DEFAULT_DEVICE)]
        device: String,
        /// The backend providing the device (cpal, mock).
        #[arg(long, default_value = "cpal")]
        sound_system: String,
        /// How long to play for, e.g. 30s or 2m.
        #[arg(long)]
        duration: Option<String>,
    },
    /// Starts the metronome with keyboard control from a config file.
    Start {
        /// The path to the metronome config.
        config_path: String,
        /// The profile to start with.
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Prints the name of a tempo.
    Tempo {
        /// Speed in beats per minute.
        bpm: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            bpm,
            meter,
            accents,
            volume,
            sound,
            device,
            sound_system,
            duration,
        } => {
            if !(tempo::MIN_BPM..=tempo::MAX_BPM).contains(&bpm) {
                return Err(format!(
                    "BPM {} is outside {}..={}",
                    bpm,
                    tempo::MIN_BPM,
                    tempo::MAX_BPM
                )
                .into());
            }
            let duration: Option<Duration> = match duration {
                Some(duration) => Some(DurationString::from_string(duration)?.into()),
                None => None,
            };
            let settings = Settings {
                device,
                sound: SoundSpec::parse(&sound),
                sound_system,
                meter: MeterState::new(meter, Accents::from_str(&accents)?)?,
                frequency: tempo::bpm_to_frequency(bpm),
                volume: volume.clamp(0.0, 1.0),
                sync: true,
                ..Settings::default()
            };

            info!(
                bpm,
                tempo = tempo::tempo_name(bpm).unwrap_or_default(),
                meter,
                accents,
                "Playing."
            );
            let (control, audio_thread) = metronome::spawn(settings)?;
            control.send(Command::StartMetronome)?;
            play(&control, duration).await;

            control.send(Command::StopMetronome)?;
            control.send(Command::StopServer)?;
            if tokio::task::spawn_blocking(move || audio_thread.join())
                .await?
                .is_err()
            {
                return Err("audio thread panicked".into());
            }
        }
        Commands::Start {
            config_path,
            profile,
        } => {
            let mut controller =
                config::init_controller(&PathBuf::from(config_path), profile.as_deref())?;
            controller.join().await?;
        }
        Commands::Tempo { bpm } => match tempo::tempo_name(bpm) {
            Some(name) => println!("{} BPM: {}", bpm, name),
            None => println!("{} BPM is faster than any named tempo.", bpm),
        },
    }

    Ok(())
}

/// Logs beats until interrupted, the duration passes or the metronome fails.
async fn play(control: &ControlHandle, duration: Option<Duration>) {
    let deadline = tokio::time::sleep(duration.unwrap_or(Duration::from_secs(u64::from(u32::MAX))));
    tokio::pin!(deadline);
    let mut poll = tokio::time::interval(RESPONSE_POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted.");
                return;
            }
            _ = &mut deadline, if duration.is_some() => {
                info!("Done.");
                return;
            }
            _ = poll.tick() => loop {
                match control.try_recv() {
                    Ok(Some(Response::Sync(beat))) => info!(beat = beat + 1, "Beat"),
                    Ok(Some(Response::Volume(volume))) => info!(volume, "Volume"),
                    Ok(Some(Response::StartError(reason))) => {
                        error!(reason, "Metronome failed to start");
                        return;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(err = %e, "Audio thread is gone");
                        return;
                    }
                }
            },
        }
    }
}
