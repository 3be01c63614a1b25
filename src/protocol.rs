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

//! Messages between the control surface and the audio thread.
//!
//! Two unbounded queues, one per direction. Neither side ever blocks on the
//! other: senders enqueue and return, receivers poll with `try_recv`.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::metronome::{meter::Accents, sound::SoundSpec};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("the other end of the control channel is gone")]
    Disconnected,
}

/// Queries sent from the control surface to the audio thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ends the audio thread loop.
    StopServer,
    /// Device to open on the next start.
    SetDevice(String),
    /// Sound to load on the next start.
    SetSound(SoundSpec),
    /// Output backend to use on the next start.
    SetSoundSystem(String),
    SetMeter(usize),
    SetAccents(Accents),
    /// Ticks per second.
    SetFrequency(f64),
    StartMetronome,
    StopMetronome,
    StartSync,
    StopSync,
    /// Volume in 0.0..=1.0. Rebuilds the tick buffers if running.
    SetVolume(f64),
    /// Answered with [`Response::Volume`].
    GetVolume,
}

/// Responses sent from the audio thread to the control surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Volume(f64),
    /// The beat that just started.
    Sync(usize),
    /// Starting the metronome failed; the engine stayed idle.
    StartError(String),
}

/// Creates a connected control handle and server endpoint.
pub fn channel() -> (ControlHandle, ServerEndpoint) {
    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let (response_tx, response_rx) = crossbeam_channel::unbounded();
    (
        ControlHandle {
            commands: CommandSender(command_tx),
            responses: response_rx,
        },
        ServerEndpoint {
            commands: command_rx,
            responses: response_tx,
        },
    )
}

/// A cloneable sender of commands.
#[derive(Debug, Clone)]
pub struct CommandSender(Sender<Command>);

impl CommandSender {
    pub fn send(&self, command: Command) -> Result<(), ProtocolError> {
        self.0.send(command).map_err(|_| ProtocolError::Disconnected)
    }
}

/// The control surface's end of the channel.
#[derive(Debug)]
pub struct ControlHandle {
    commands: CommandSender,
    responses: Receiver<Response>,
}

impl ControlHandle {
    /// Enqueues a command for the audio thread.
    pub fn send(&self, command: Command) -> Result<(), ProtocolError> {
        self.commands.send(command)
    }

    /// Another sender feeding the same audio thread.
    pub fn command_sender(&self) -> CommandSender {
        self.commands.clone()
    }

    /// Returns the next response if there is one.
    pub fn try_recv(&self) -> Result<Option<Response>, ProtocolError> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ProtocolError::Disconnected),
        }
    }

    /// Waits up to the given timeout for a response.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Response>, ProtocolError> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ProtocolError::Disconnected),
        }
    }
}

/// The audio thread's end of the channel.
#[derive(Debug)]
pub struct ServerEndpoint {
    commands: Receiver<Command>,
    responses: Sender<Response>,
}

impl ServerEndpoint {
    /// Returns the next command if there is one.
    pub fn try_recv(&self) -> Result<Option<Command>, ProtocolError> {
        match self.commands.try_recv() {
            Ok(command) => Ok(Some(command)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ProtocolError::Disconnected),
        }
    }

    /// Enqueues a response for the control surface.
    pub fn send(&self, response: Response) -> Result<(), ProtocolError> {
        self.responses
            .send(response)
            .map_err(|_| ProtocolError::Disconnected)
    }
}
