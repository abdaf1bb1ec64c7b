//! Protocol Module
//!
//! Defines the line-based wire protocol between peers and the registry host.
//!
//! ## Framing
//! One command or reply per line, terminated by `\n`. Argument lists are
//! split on the literal `&` and every field is trimmed.
//!
//! ### Commands (client → host)
//! - `register <username>`                                  → `NEW_ID <id>`
//! - `new <id> & <name> & <template> & <pop> & <bots> & <lat> & <lon> &` (no reply)
//! - `update <id> & <name> & <template> & <pop> & <bots> & <lat> & <lon> &` (no reply)
//! - `remove <id> & <name> &`                               (no reply)
//! - `get`                                                  → `RECORDS ...`
//! - `s`                                                    → `SETTLEMENTS <count>`
//! - `bye <id>`                                             (connection closes)
//!
//! ### Replies (host → client)
//! - `NEW_ID <id>`
//! - `RECORDS 0` when empty, else `RECORDS <id> & <name> & ... & <lon> & ...`
//! - `SETTLEMENTS <count>`

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::Response;
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command, read_line,
    read_response, write_command, write_response, ParseError, FIELD_SEPARATOR, MAX_LINE_LEN,
};
