//! Client Module
//!
//! Blocking client-side counterpart of the registry host.

mod session;

pub use session::ClientSession;
