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
use std::{io, str::FromStr};

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use crate::metronome::meter::Accents;

use super::Event;

const START: &str = "start";
const STOP: &str = "stop";
const TOGGLE: &str = "toggle";
const BPM: &str = "bpm";
const DOUBLE: &str = "double";
const HALF: &str = "half";
const METER: &str = "meter";
const ACCENTS: &str = "accents";
const VOLUME: &str = "volume";
const TAP: &str = "tap";
const PROFILE: &str = "profile";
const QUIT: &str = "quit";

/// A driver that controls the metronome with line commands on stdin.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads one command. Returns false once there's nothing more to read.
    fn monitor_io<R, W>(events_tx: &Sender<Event>, mut reader: R, mut writer: W) -> io::Result<bool>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({}, {}, {}, {} <n>, +<n>, -<n>, {}, {}, {} <n>, {} <0/1...>, {} <0-1>, {}, {} <name>, {}): ",
            START, STOP, TOGGLE, BPM, DOUBLE, HALF, METER, ACCENTS, VOLUME, TAP, PROFILE, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            info!("End of input.");
            return Ok(false);
        }

        let event = match parse_command(&input) {
            Some(event) => event,
            None => {
                warn!(input = input.trim(), "Unrecognized input");
                return Ok(true);
            }
        };
        let quit = event == Event::Quit;
        events_tx
            .blocking_send(event)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(!quit)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

/// Parses a line of keyboard input.
pub fn parse_command(input: &str) -> Option<Event> {
    let input = input.trim();
    let (command, argument) = match input.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (input, ""),
    };

    match (command.to_lowercase().as_str(), argument) {
        (START, "") => Some(Event::Start),
        (STOP, "") => Some(Event::Stop),
        (TOGGLE, "") => Some(Event::Toggle),
        (DOUBLE, "") => Some(Event::ScaleBpm(2.0)),
        (HALF, "") => Some(Event::ScaleBpm(0.5)),
        (TAP, "") => Some(Event::Tap),
        (QUIT, "") => Some(Event::Quit),
        (BPM, bpm) => bpm.parse().ok().map(Event::SetBpm),
        (METER, meter) => meter.parse().ok().map(Event::SetMeter),
        (ACCENTS, accents) if !accents.is_empty() => {
            Accents::from_str(accents).ok().map(Event::SetAccents)
        }
        (VOLUME, volume) => volume.parse().ok().map(Event::SetVolume),
        (PROFILE, name) if !name.is_empty() => Some(Event::Profile(name.to_string())),
        (delta, "") if delta.starts_with('+') || delta.starts_with('-') => {
            delta.parse().ok().map(Event::AdjustBpm)
        }
        _ => None,
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader, BufWriter};

    use tokio::sync::mpsc;

    use crate::controller::{keyboard::*, Event};

    use super::Driver;

    fn get_event(event: &str) -> Result<(bool, Option<Event>), io::Error> {
        let (sender, mut receiver) = mpsc::channel::<Event>(1);

        let reader = BufReader::new(event.as_bytes());
        let writer = BufWriter::new(Vec::new());
        let more = Driver::monitor_io(&sender, reader, writer)?;

        // Force the sender to close.
        drop(sender);
        Ok((more, receiver.blocking_recv()))
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!((true, Some(Event::Start)), get_event("start\n")?);
        assert_eq!((true, Some(Event::Stop)), get_event("STOP")?);
        assert_eq!((true, Some(Event::Toggle)), get_event("toggle")?);
        assert_eq!((true, Some(Event::SetBpm(120))), get_event("bpm 120")?);
        assert_eq!((true, Some(Event::AdjustBpm(5))), get_event("+5")?);
        assert_eq!((true, Some(Event::AdjustBpm(-10))), get_event("-10")?);
        assert_eq!((true, Some(Event::ScaleBpm(2.0))), get_event("double")?);
        assert_eq!((true, Some(Event::ScaleBpm(0.5))), get_event("half")?);
        assert_eq!((true, Some(Event::SetMeter(4))), get_event("meter 4")?);
        assert_eq!(
            (true, Some(Event::SetAccents(Accents::from_str("1010").unwrap()))),
            get_event("accents 1010")?
        );
        assert_eq!((true, Some(Event::SetVolume(0.25))), get_event("volume 0.25")?);
        assert_eq!((true, Some(Event::Tap)), get_event("tap")?);
        assert_eq!(
            (true, Some(Event::Profile("waltz".to_string()))),
            get_event("profile waltz")?
        );
        assert_eq!((false, Some(Event::Quit)), get_event("quit")?);
        Ok(())
    }

    #[test]
    fn test_unrecognized_input() -> Result<(), io::Error> {
        for input in [
            "unrecognized",
            "bpm",
            "bpm fast",
            "meter -1",
            "accents 12",
            "accents",
            "volume loud",
            "profile",
            "start now",
            "+",
            "+five",
        ] {
            assert_eq!((true, None), get_event(input)?, "{}", input);
        }
        Ok(())
    }

    #[test]
    fn test_end_of_input() -> Result<(), io::Error> {
        assert_eq!((false, None), get_event("")?);
        Ok(())
    }
}
