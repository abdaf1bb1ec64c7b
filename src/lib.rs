//! # Settlement Registry
//!
//! A small peer-registration service:
//! - Dynamic client-id assignment (smallest free id first)
//! - Thread-safe directory of settlement records shared by all peers
//! - Line-based TCP protocol (`register`, `new`, `get`, `s`, `bye`)
//! - Bounded worker pool with guaranteed per-connection cleanup
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   ClientSession (peers)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  register / new / get / s / bye
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │             Listener (accept loop, one thread)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  accepted sockets
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │        Worker Pool  →  Connection (one per socket)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ IdAllocator │          │  Registry   │
//!   │   (Mutex)   │          │  (RwLock)   │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod registry;
pub mod protocol;
pub mod network;
pub mod client;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RegistryError, Result};
pub use config::{ClientConfig, Config};
pub use registry::{IdAllocator, Registry, SettlementRecord};
pub use client::ClientSession;
pub use network::{Server, ShutdownHandle};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the settlement registry
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default TCP port of the registry host
pub const DEFAULT_PORT: u16 = 9090;
