//! TCP Server
//!
//! Accepts connections and dispatches them to the worker pool.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::{Connection, WorkerPool};
use crate::config::Config;
use crate::error::Result;
use crate::registry::{IdAllocator, Registry, SettlementRecord};
use crate::storage::{save_seed_file, SeedEntry};

/// How often the accept loop checks the shutdown flag
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Sockets of connections that have been accepted and not yet finished
///
/// Shutdown closes them so handlers blocked in `read` wake up.
#[derive(Default)]
struct ConnectionTable {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, TcpStream>>,
}

impl ConnectionTable {
    fn insert(&self, stream: TcpStream) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.lock().insert(id, stream);
        id
    }

    fn remove(&self, id: u64) {
        self.live.lock().remove(&id);
    }

    fn close_all(&self) -> usize {
        let live = self.live.lock();
        for stream in live.values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        live.len()
    }

    fn len(&self) -> usize {
        self.live.lock().len()
    }
}

/// Drops a connection's table entry when its handler finishes
struct Tracked {
    table: Arc<ConnectionTable>,
    id: u64,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.table.remove(self.id);
    }
}

/// Stops a running server from another thread
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    connections: Arc<ConnectionTable>,
}

impl ShutdownHandle {
    /// Ask the server to stop
    ///
    /// The accept loop notices within one poll interval, closes every live
    /// connection so blocked handlers observe end of stream, then drains
    /// the pool.
    pub fn shutdown(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            tracing::info!("Shutdown requested");
        }
    }

    /// Whether shutdown has been requested
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Number of connections currently accepted and not finished
    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }
}

/// TCP server for the settlement registry
pub struct Server {
    config: Config,
    registry: Arc<Registry>,
    ids: Arc<IdAllocator>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listen address with the given shared state
    ///
    /// `std` listeners set `SO_REUSEADDR` on Unix, so a restarted host can
    /// rebind while old sockets linger in `TIME_WAIT`.
    pub fn bind(config: Config, registry: Arc<Registry>, ids: Arc<IdAllocator>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        // Non-blocking so the loop can notice shutdown
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            registry,
            ids,
            listener,
            local_addr,
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
                connections: Arc::new(ConnectionTable::default()),
            },
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Shared registry served by this host
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Start the server (blocking until shutdown)
    pub fn run(self) -> Result<()> {
        let mut pool = WorkerPool::new(self.config.worker_threads, self.config.queue_capacity)?;

        tracing::info!(
            "Registry listening on {} ({} workers, queue {})",
            self.local_addr,
            pool.size(),
            self.config
                .queue_capacity
                .map_or("unbounded".to_string(), |c| c.to_string())
        );

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => self.dispatch(&pool, stream, addr),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    // e.g. out of file descriptors; keep serving existing peers
                    tracing::warn!("Accept error: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        // Taken before handlers clean up their records
        let seed = self.config.seed_file.as_ref().map(|_| self.registry.snapshot());

        let closed = self.shutdown.connections.close_all();
        tracing::info!("Closing {} live connection(s)", closed);
        pool.shutdown();
        tracing::info!("Listener on {} stopped", self.local_addr);

        if let Some(records) = seed {
            self.save_seed(&records);
        }
        Ok(())
    }

    /// Hand an accepted socket to the pool
    fn dispatch(&self, pool: &WorkerPool, stream: TcpStream, addr: SocketAddr) {
        tracing::debug!("Accepted connection from {}", addr);

        // Accepted sockets inherit non-blocking mode from the listener
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping connection from {}: {}", addr, e);
            return;
        }

        let tracked_stream = match stream.try_clone() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Dropping connection from {}: {}", addr, e);
                return;
            }
        };
        let tracked = Tracked {
            table: Arc::clone(&self.shutdown.connections),
            id: self.shutdown.connections.insert(tracked_stream),
        };

        let registry = Arc::clone(&self.registry);
        let ids = Arc::clone(&self.ids);
        let read_timeout = self.config.read_timeout();
        let write_timeout = self.config.write_timeout();

        let job = move || {
            let _tracked = tracked;
            let mut connection = match Connection::new(stream, registry, ids) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("Failed to set up connection from {}: {}", addr, e);
                    return;
                }
            };
            if let Err(e) = connection
                .set_timeouts(read_timeout, write_timeout)
                .and_then(|_| connection.handle())
            {
                tracing::warn!("Connection error from {}: {}", addr, e);
            }
        };

        // A rejected job is dropped here, closing its socket
        if let Err(e) = pool.execute(job) {
            tracing::warn!("Refusing connection from {}: {}", addr, e);
        }
    }

    /// Best-effort export of the registry to the seed file
    fn save_seed(&self, records: &[SettlementRecord]) {
        let Some(path) = &self.config.seed_file else {
            return;
        };

        let entries: Vec<SeedEntry> = records.iter().map(SeedEntry::from).collect();

        match save_seed_file(path, &entries) {
            Ok(()) => tracing::info!("Saved {} settlement(s) to {}", entries.len(), path.display()),
            Err(e) => tracing::warn!("Could not save seed file {}: {}", path.display(), e),
        }
    }
}
