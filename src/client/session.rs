//! Client session
//!
//! One connection from a peer to the registry host.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use crate::config::ClientConfig;
use crate::error::{RegistryError, Result};
use crate::protocol::{read_response, write_command, Command, Response};
use crate::registry::SettlementRecord;

/// Blocking session with a registry host
///
/// Every call writes one command and, when the command has a reply,
/// waits for it up to `ClientConfig::response_timeout_ms`. Any failed
/// exchange closes the session; later calls return `ConnectionClosed`.
pub struct ClientSession {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    peer_addr: SocketAddr,
    username: Option<String>,
    client_id: Option<u32>,

    /// Records from the last `get_records`
    records: Vec<SettlementRecord>,

    closed: bool,
}

impl ClientSession {
    /// Connect to `host:port` with default timeouts
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with_config((host, port), ClientConfig::default())
    }

    /// Connect to any resolvable address
    pub fn connect_with_config(addr: impl ToSocketAddrs, config: ClientConfig) -> Result<Self> {
        let stream = open_stream(addr, &config)?;
        let peer_addr = stream.peer_addr()?;

        stream.set_nodelay(true)?;
        stream.set_read_timeout(config.response_timeout())?;
        stream.set_write_timeout(config.response_timeout())?;

        let read_stream = stream.try_clone()?;
        tracing::debug!("Connected to registry at {}", peer_addr);

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            peer_addr,
            username: None,
            client_id: None,
            records: Vec::new(),
            closed: false,
        })
    }

    /// Ask the host for a client id
    pub fn register(&mut self, username: &str) -> Result<u32> {
        let username = username.trim();
        if username.is_empty() {
            return Err(RegistryError::InvalidRecord("username is empty".to_string()));
        }

        self.send(&Command::Register {
            username: username.to_string(),
        })?;

        match self.receive()? {
            Response::NewId(id) => {
                tracing::info!("{} registered as client {}", username, id);
                self.client_id = Some(id);
                self.username = Some(username.to_string());
                Ok(id)
            }
            other => Err(self.abandon(unexpected("NEW_ID", &other))),
        }
    }

    /// Publish a settlement (no reply)
    pub fn send_new(&mut self, record: &SettlementRecord) -> Result<()> {
        record.validate()?;
        self.send(&Command::New {
            record: record.clone(),
        })
    }

    /// Refresh the stored settlement with the same name (no reply)
    pub fn send_update(&mut self, record: &SettlementRecord) -> Result<()> {
        record.validate()?;
        self.send(&Command::Update {
            record: record.clone(),
        })
    }

    /// Withdraw this client's settlement by name (no reply)
    pub fn send_remove(&mut self, name: &str) -> Result<()> {
        let client_id = self.client_id.ok_or(RegistryError::NotRegistered)?;
        self.send(&Command::Remove {
            client_id,
            name: name.trim().to_string(),
        })
    }

    /// Fetch every record held by the host
    pub fn get_records(&mut self) -> Result<Vec<SettlementRecord>> {
        self.send(&Command::Get)?;

        match self.receive()? {
            Response::Records(records) => {
                tracing::debug!("Received {} record(s)", records.len());
                self.records = records.clone();
                Ok(records)
            }
            other => Err(self.abandon(unexpected("RECORDS", &other))),
        }
    }

    /// Ask the host how many records it holds
    pub fn get_settlement_count(&mut self) -> Result<usize> {
        self.send(&Command::Count)?;

        match self.receive()? {
            Response::Settlements(count) => Ok(count),
            other => Err(self.abandon(unexpected("SETTLEMENTS", &other))),
        }
    }

    /// Say `bye` and close the socket
    ///
    /// The socket is closed even if `bye` cannot be sent; that failure is
    /// still reported.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let farewell = match self.client_id {
            Some(client_id) => write_command(&mut self.writer, &Command::Bye { client_id }),
            None => Ok(()),
        };

        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
        tracing::debug!("Closed session with {}", self.peer_addr);

        if let Err(ref e) = farewell {
            tracing::debug!("Could not say bye to {}: {}", self.peer_addr, e);
        }
        farewell
    }

    /// Id assigned by `register`
    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    /// Name given to `register`
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Records from the most recent `get_records`
    pub fn records(&self) -> &[SettlementRecord] {
        &self.records
    }

    /// Address of the host
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    fn send(&mut self, command: &Command) -> Result<()> {
        if self.closed {
            return Err(RegistryError::ConnectionClosed);
        }
        tracing::trace!("Sending {:?}", command);
        write_command(&mut self.writer, command).map_err(|e| self.abandon(timeout_aware(e)))
    }

    fn receive(&mut self) -> Result<Response> {
        read_response(&mut self.reader).map_err(|e| self.abandon(timeout_aware(e)))
    }

    /// Close the socket after a failed exchange
    ///
    /// A late or unexpected reply would otherwise be read as the answer to
    /// the next request.
    fn abandon(&mut self, error: RegistryError) -> RegistryError {
        if !self.closed {
            self.closed = true;
            let _ = self.writer.get_ref().shutdown(Shutdown::Both);
            tracing::debug!("Abandoned session with {}: {}", self.peer_addr, error);
        }
        error
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn open_stream(addr: impl ToSocketAddrs, config: &ClientConfig) -> Result<TcpStream> {
    let timeout = match config.connect_timeout() {
        Some(timeout) => timeout,
        None => return Ok(TcpStream::connect(addr)?),
    };

    let mut last_error = None;
    for candidate in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }

    Err(match last_error {
        Some(e) => timeout_aware(e.into()),
        None => RegistryError::Config("address resolved to nothing".to_string()),
    })
}

/// Map socket timeouts to `RegistryError::Timeout`
fn timeout_aware(error: RegistryError) -> RegistryError {
    match error {
        RegistryError::Io(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
            RegistryError::Timeout
        }
        other => other,
    }
}

fn unexpected(expected: &str, got: &Response) -> RegistryError {
    RegistryError::Protocol(format!(
        "expected {} reply, got {}",
        expected,
        got.keyword()
    ))
}
