//! Registry Module
//!
//! Shared state of a registry host.
//!
//! ## Responsibilities
//! - Hand out small positive client ids, smallest free id first
//! - Store one settlement record per connected client
//! - Provide consistent point-in-time snapshots for `get`
//! - Drop a client's records when its connection ends
//!
//! ## Concurrency
//! Both types are internally synchronized and shared behind `Arc`.
//! Handlers never reach the underlying containers directly.

mod record;
mod id_allocator;
mod store;

pub use record::SettlementRecord;
pub use id_allocator::IdAllocator;
pub use store::Registry;
