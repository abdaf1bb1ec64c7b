//! Storage Module
//!
//! Best-effort flat-file persistence of a static settlement list.
//!
//! ## File Format (legacy seed list)
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ name & latitude & longitude &            │
//! │ name & latitude & longitude &            │
//! │ ...                                      │
//! └──────────────────────────────────────────┘
//! ```
//! Client ids, templates and head counts are not stored; the live
//! protocol remains the source of truth.

mod seed;

pub use seed::{load_seed_file, save_seed_file, SeedEntry};
