//! Storage tests
//!
//! Seed file reading and writing.
