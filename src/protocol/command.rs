//! Command definitions
//!
//! Represents commands from clients.

use crate::registry::SettlementRecord;

/// Command verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Register,
    New,
    Update,
    Remove,
    Get,
    Count,
    Bye,
}

impl CommandType {
    /// The verb as written on the wire
    pub fn verb(self) -> &'static str {
        match self {
            CommandType::Register => "register",
            CommandType::New => "new",
            CommandType::Update => "update",
            CommandType::Remove => "remove",
            CommandType::Get => "get",
            CommandType::Count => "s",
            CommandType::Bye => "bye",
        }
    }

    /// Look up a wire verb
    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb {
            "register" => Some(CommandType::Register),
            "new" => Some(CommandType::New),
            "update" => Some(CommandType::Update),
            "remove" => Some(CommandType::Remove),
            "get" => Some(CommandType::Get),
            "s" => Some(CommandType::Count),
            "bye" => Some(CommandType::Bye),
            _ => None,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask for a client id
    Register { username: String },

    /// Publish (or replace) the sender's settlement
    New { record: SettlementRecord },

    /// Refresh the sender's settlement if the name matches
    Update { record: SettlementRecord },

    /// Withdraw the sender's settlement if the name matches
    Remove { client_id: u32, name: String },

    /// List all records
    Get,

    /// Count all records
    Count,

    /// Disconnect and release the id
    Bye { client_id: u32 },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Register { .. } => CommandType::Register,
            Command::New { .. } => CommandType::New,
            Command::Update { .. } => CommandType::Update,
            Command::Remove { .. } => CommandType::Remove,
            Command::Get => CommandType::Get,
            Command::Count => CommandType::Count,
            Command::Bye { .. } => CommandType::Bye,
        }
    }

    /// Whether the host answers this command with a reply line
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            Command::Register { .. } | Command::Get | Command::Count
        )
    }
}
