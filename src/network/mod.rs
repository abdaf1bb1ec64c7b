//! Network Module
//!
//! TCP server and connection handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Fixed worker pool, one connection per worker at a time
//! - Commands routed to the shared `Registry` / `IdAllocator`

mod server;
mod connection;
mod pool;

pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, ConnectionState};
pub use pool::WorkerPool;
