//! A low-level push-protocol client.
//!
//! This client is blocking and so is primarily used as a testing utility
//! rather than an actual game client.

use anyhow::{Error, bail};
use std::{
    io::{BufReader, Write},
    net::{SocketAddr, TcpStream},
    thread,
    time::Duration,
};

use super::{
    messages::{ClientHello, ServerMessage},
    utils,
};
use crate::game::entities::{Action, GameSnapshot, PlayerId};

/// Default timeout for reading from the server.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for writing to the server.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// A blocking TCP client speaking newline-delimited JSON.
pub struct Client {
    /// Identity assigned by the server in its welcome message.
    pub player_id: PlayerId,
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    /// Connect to a push server and complete the join handshake.
    ///
    /// The TCP connect is retried three times with decreasing timeouts
    /// (1s, 500ms, 100ms). A join refused by the server is returned as an
    /// error carrying the server's message.
    pub fn connect(username: &str, addr: &SocketAddr) -> Result<Self, Error> {
        let mut connect_timeouts = vec![
            Duration::from_secs(1),
            Duration::from_millis(500),
            Duration::from_millis(100),
        ];
        while let Some(connect_timeout) = connect_timeouts.pop() {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(stream) => return Self::handshake(stream, username),
                _ => thread::sleep(connect_timeout),
            }
        }
        bail!("couldn't connect to {addr} as {username}")
    }

    fn handshake(stream: TcpStream, username: &str) -> Result<Self, Error> {
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        let mut writer = stream.try_clone()?;
        let mut reader = BufReader::new(stream);

        utils::write_line(&mut writer, &ClientHello::new(username))?;
        match Self::read_message(&mut reader)? {
            ServerMessage::Welcome { player_id } => Ok(Self {
                player_id,
                reader,
                writer,
            }),
            ServerMessage::Error { message } => bail!(message),
            response => bail!("invalid server response: {response}"),
        }
    }

    fn read_message(reader: &mut BufReader<TcpStream>) -> Result<ServerMessage, Error> {
        match utils::read_line(reader)? {
            Some(line) => Ok(utils::decode_line(&line)?),
            None => bail!("server closed the connection"),
        }
    }

    /// Receive the next message of any kind.
    pub fn recv(&mut self) -> Result<ServerMessage, Error> {
        Self::read_message(&mut self.reader)
    }

    /// Receive the next message, which must be a game state.
    pub fn recv_state(&mut self) -> Result<GameSnapshot, Error> {
        match self.recv()? {
            ServerMessage::GameState { data } => Ok(data),
            ServerMessage::Error { message } => bail!(message),
            response => bail!("invalid server response: {response}"),
        }
    }

    /// Skip game states until one satisfies `predicate`.
    pub fn wait_for_state<F>(&mut self, mut predicate: F) -> Result<GameSnapshot, Error>
    where
        F: FnMut(&GameSnapshot) -> bool,
    {
        loop {
            let snapshot = self.recv_state()?;
            if predicate(&snapshot) {
                return Ok(snapshot);
            }
        }
    }

    pub fn take_action(&mut self, action: Action) -> Result<(), Error> {
        utils::write_line(&mut self.writer, &action)?;
        Ok(())
    }

    pub fn raise_number(&mut self, number: i64) -> Result<(), Error> {
        self.take_action(Action::RaiseNumber { number })
    }

    pub fn make_guess(&mut self, guess: i64) -> Result<(), Error> {
        self.take_action(Action::MakeGuess { guess })
    }

    pub fn start_new_round(&mut self) -> Result<(), Error> {
        self.take_action(Action::StartNewRound)
    }

    /// Send an arbitrary line, newline appended.
    pub fn send_raw(&mut self, line: &str) -> Result<(), Error> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
