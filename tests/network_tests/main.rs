//! Network tests
//!
//! Listener, connection handler and client session over loopback sockets.

#[path = "../common/mod.rs"]
mod common;
