//! Response definitions
//!
//! Represents replies to clients.

use crate::registry::SettlementRecord;

/// A reply line sent to a client
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// `NEW_ID <id>`
    NewId(u32),

    /// `RECORDS ...`
    Records(Vec<SettlementRecord>),

    /// `SETTLEMENTS <count>`
    Settlements(usize),
}

impl Response {
    /// Reply keyword as written on the wire
    pub fn keyword(&self) -> &'static str {
        match self {
            Response::NewId(_) => "NEW_ID",
            Response::Records(_) => "RECORDS",
            Response::Settlements(_) => "SETTLEMENTS",
        }
    }
}
