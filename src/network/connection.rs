//! Connection Handler
//!
//! Handles individual client connections.
//!
//! ## State machine
//! ```text
//! AWAITING_REGISTRATION ──(any decoded command)──▶ ACTIVE
//!          │                                          │
//!          └────(bye / end of stream / I/O error)─────┴──▶ CLOSED
//! ```
//! Malformed lines are logged and skipped without changing state. Oversized
//! lines and a `register` that finds no free id end the connection.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{RegistryError, Result};
use crate::protocol::{read_command, write_response, Command, Response};
use crate::registry::{IdAllocator, Registry, SettlementRecord};

/// Lifecycle of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingRegistration,
    Active,
    Closed,
}

/// Releases a connection's id and records exactly once
///
/// Runs from `Connection::handle` on every exit path, and from `Drop`
/// if the handler unwinds.
struct Cleanup {
    registry: Arc<Registry>,
    ids: Arc<IdAllocator>,
    client_id: Option<u32>,
    done: bool,
}

impl Cleanup {
    fn run(&mut self, peer_addr: &str) {
        if self.done {
            return;
        }
        self.done = true;

        if let Some(id) = self.client_id {
            // Records go first so a recycled id never inherits them
            let removed = self.registry.remove_by_client(id);
            self.ids.release(id);
            tracing::debug!(
                "Released client {} ({}), removed {} record(s)",
                id,
                peer_addr,
                removed
            );
        }
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        self.run("unknown");
    }
}

/// Handles a single client connection
pub struct Connection {
    /// Guaranteed cleanup, runs before the socket closes
    cleanup: Cleanup,

    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Peer address for logging
    peer_addr: String,

    /// Name given in `register`
    username: Option<String>,

    state: ConnectionState,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O on the accepted socket
    pub fn new(stream: TcpStream, registry: Arc<Registry>, ids: Arc<IdAllocator>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Replies are tiny, don't let Nagle hold them back
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            cleanup: Cleanup {
                registry,
                ids,
                client_id: None,
                done: false,
            },
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            peer_addr,
            username: None,
            state: ConnectionState::AwaitingRegistration,
        })
    }

    /// Configure connection timeouts (`None` blocks indefinitely)
    pub fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(read)?;
        self.writer.get_ref().set_write_timeout(write)?;
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in order and answers them. Returns when the client
    /// says `bye`, disconnects, or an I/O error occurs; cleanup has run by
    /// the time this returns.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let outcome = self.serve();
        self.close();
        outcome
    }

    fn serve(&mut self) -> Result<()> {
        loop {
            let command = match read_command(&mut self.reader) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(RegistryError::Parse(e)) => {
                    tracing::warn!("Ignoring malformed line from {}: {}", self.peer_addr, e);
                    continue;
                }
                Err(e) if e.is_disconnect() => {
                    tracing::debug!("Connection to {} lost: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(RegistryError::Io(ref e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);

            let is_bye = matches!(command, Command::Bye { .. });

            let reply = match self.execute_command(command) {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!("Dropping connection from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            if let Some(response) = reply {
                if let Err(e) = self.send_response(&response) {
                    if e.is_disconnect() {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                    tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            }

            if is_bye {
                return Ok(());
            }
        }
    }

    /// Execute a command, returning the reply if the command has one
    ///
    /// An error ends the connection.
    fn execute_command(&mut self, command: Command) -> Result<Option<Response>> {
        self.state = ConnectionState::Active;

        let reply = match command {
            Command::Register { username } => Some(Response::NewId(self.register(username)?)),
            Command::New { record } => {
                self.publish(record);
                None
            }
            Command::Update { record } => {
                if self.owns(record.client_id, "update") {
                    let id = record.client_id;
                    if !self.cleanup.registry.update(record) {
                        tracing::debug!("Client {} updated an unknown settlement", id);
                    }
                }
                None
            }
            Command::Remove { client_id, name } => {
                if self.owns(client_id, "remove")
                    && !self.cleanup.registry.remove_named(client_id, &name)
                {
                    tracing::debug!("Client {} removed unknown settlement {:?}", client_id, name);
                }
                None
            }
            Command::Get => Some(Response::Records(self.cleanup.registry.snapshot())),
            Command::Count => Some(Response::Settlements(self.cleanup.registry.count())),
            Command::Bye { client_id } => {
                if self.cleanup.client_id != Some(client_id) {
                    tracing::warn!(
                        "Client {} said bye as {} but owns {:?}; releasing its own id only",
                        self.peer_addr,
                        client_id,
                        self.cleanup.client_id
                    );
                }
                None
            }
        };

        Ok(reply)
    }

    /// Assign a client id (a repeated register keeps the first id)
    ///
    /// Fails with `Capacity` when no id is free.
    fn register(&mut self, username: String) -> Result<u32> {
        if let Some(id) = self.cleanup.client_id {
            tracing::debug!("{} registered again, keeping client id {}", username, id);
            return Ok(id);
        }

        let id = self.cleanup.ids.allocate()?;
        tracing::info!("Registered {} from {} as client {}", username, self.peer_addr, id);
        self.cleanup.client_id = Some(id);
        self.username = Some(username);
        Ok(id)
    }

    /// Store the sender's settlement
    ///
    /// An unregistered connection adopts the record's id if nobody holds it.
    fn publish(&mut self, record: SettlementRecord) {
        if self.cleanup.client_id.is_none() {
            if !self.cleanup.ids.claim(record.client_id) {
                tracing::warn!(
                    "Client {} published for id {} held by another client; ignored",
                    self.peer_addr,
                    record.client_id
                );
                return;
            }
            tracing::debug!("Client {} adopted id {}", self.peer_addr, record.client_id);
            self.cleanup.client_id = Some(record.client_id);
        }

        if self.owns(record.client_id, "new") {
            tracing::debug!("Client {} published {}", record.client_id, record);
            self.cleanup.registry.add(record);
        }
    }

    /// Whether `client_id` belongs to this connection; logs a violation otherwise
    fn owns(&self, client_id: u32, verb: &str) -> bool {
        let owned = self.cleanup.client_id == Some(client_id);
        if !owned {
            tracing::warn!(
                "Client {} sent {} for id {} but owns {:?}; ignored",
                self.peer_addr,
                verb,
                client_id,
                self.cleanup.client_id
            );
        }
        owned
    }

    /// Run cleanup and shut the socket down
    fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;
        self.cleanup.run(&self.peer_addr);

        // Errors here only mean the peer is already gone
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
        tracing::debug!(
            "Connection from {} ({}) closed",
            self.peer_addr,
            self.username.as_deref().unwrap_or("anonymous")
        );
    }

    /// Send a response to the client
    fn send_response(&mut self, response: &Response) -> Result<()> {
        write_response(&mut self.writer, response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Id owned by this connection, if any
    pub fn client_id(&self) -> Option<u32> {
        self.cleanup.client_id
    }
}
