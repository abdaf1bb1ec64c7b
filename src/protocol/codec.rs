//! Protocol codec
//!
//! Encoding and decoding functions for the line protocol.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────┬───┬──────────────────────────────────────────┬────┐
//! │   verb   │ ␠ │  field & field & ... & field &            │ \n │
//! └──────────┴───┴──────────────────────────────────────────┴────┘
//! ```
//!
//! Fields are trimmed; a trailing separator is tolerated on input and
//! emitted on output (`new`, `remove`, `RECORDS`).

use std::io::{BufRead, Read, Write};

use thiserror::Error;

use super::{Command, CommandType, Response};
use crate::error::{RegistryError, Result};
use crate::registry::SettlementRecord;

/// Field separator inside argument lists
pub const FIELD_SEPARATOR: char = '&';

/// Longest accepted line, excluding the terminator (64 KB)
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Number of fields in one settlement record
const RECORD_FIELDS: usize = 7;

/// A line that does not follow the grammar
///
/// Always recoverable: the offending line is consumed and the stream
/// stays in sync.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty line")]
    EmptyLine,

    #[error("unknown command verb {0:?}")]
    UnknownVerb(String),

    #[error("unrecognized reply {0:?}")]
    UnknownReply(String),

    #[error("{verb}: missing {what}")]
    MissingArgument {
        verb: &'static str,
        what: &'static str,
    },

    #[error("{verb}: unexpected arguments {args:?}")]
    UnexpectedArguments { verb: &'static str, args: String },

    #[error("{verb}: expected {expected} fields, found {found}")]
    FieldCount {
        verb: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} is empty")]
    EmptyField { field: &'static str },
}

type ParseResult<T> = std::result::Result<T, ParseError>;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command as one line (without the terminator)
pub fn encode_command(command: &Command) -> String {
    let verb = command.command_type().verb();
    match command {
        Command::Register { username } => format!("{} {}", verb, username),
        Command::New { record } | Command::Update { record } => {
            let mut line = format!("{} ", verb);
            push_record(&mut line, record);
            line.truncate(line.trim_end().len());
            line
        }
        Command::Remove { client_id, name } => {
            format!("{} {} & {} &", verb, client_id, name)
        }
        Command::Get | Command::Count => verb.to_string(),
        Command::Bye { client_id } => format!("{} {}", verb, client_id),
    }
}

/// Decode one line into a command
pub fn decode_command(line: &str) -> ParseResult<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::EmptyLine);
    }

    let (verb, rest) = split_verb(line);
    let command_type =
        CommandType::from_verb(verb).ok_or_else(|| ParseError::UnknownVerb(verb.to_string()))?;
    let verb = command_type.verb();

    match command_type {
        CommandType::Register => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument {
                    verb,
                    what: "username",
                });
            }
            Ok(Command::Register {
                username: rest.to_string(),
            })
        }
        CommandType::New => Ok(Command::New {
            record: decode_single_record(verb, rest)?,
        }),
        CommandType::Update => Ok(Command::Update {
            record: decode_single_record(verb, rest)?,
        }),
        CommandType::Remove => {
            let fields = split_fields(rest);
            if fields.len() != 2 {
                return Err(ParseError::FieldCount {
                    verb,
                    expected: 2,
                    found: fields.len(),
                });
            }
            Ok(Command::Remove {
                client_id: parse_client_id(fields[0])?,
                name: non_empty("name", fields[1])?.to_string(),
            })
        }
        CommandType::Get | CommandType::Count => {
            if !rest.is_empty() {
                return Err(ParseError::UnexpectedArguments {
                    verb,
                    args: rest.to_string(),
                });
            }
            Ok(if command_type == CommandType::Get {
                Command::Get
            } else {
                Command::Count
            })
        }
        CommandType::Bye => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument {
                    verb,
                    what: "client id",
                });
            }
            Ok(Command::Bye {
                client_id: parse_client_id(rest)?,
            })
        }
    }
}

/// Decode the argument list of `new` / `update`
fn decode_single_record(verb: &'static str, rest: &str) -> ParseResult<SettlementRecord> {
    let fields = split_fields(rest);
    if fields.len() != RECORD_FIELDS {
        return Err(ParseError::FieldCount {
            verb,
            expected: RECORD_FIELDS,
            found: fields.len(),
        });
    }
    decode_record(&fields)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a reply as one line (without the terminator)
pub fn encode_response(response: &Response) -> String {
    let keyword = response.keyword();
    match response {
        Response::NewId(id) => format!("{} {}", keyword, id),
        Response::Records(records) if records.is_empty() => format!("{} 0", keyword),
        Response::Records(records) => {
            let mut line = format!("{} ", keyword);
            for record in records {
                push_record(&mut line, record);
            }
            line
        }
        Response::Settlements(count) => format!("{} {}", keyword, count),
    }
}

/// Decode one reply line
pub fn decode_response(line: &str) -> ParseResult<Response> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::EmptyLine);
    }

    let (keyword, rest) = split_verb(line);
    match keyword {
        "NEW_ID" => Ok(Response::NewId(parse_client_id(rest)?)),
        "SETTLEMENTS" => Ok(Response::Settlements(parse_number("settlement count", rest)?)),
        "RECORDS" => {
            if rest == "0" {
                return Ok(Response::Records(Vec::new()));
            }
            let fields = split_fields(rest);
            if fields.is_empty() || fields.len() % RECORD_FIELDS != 0 {
                return Err(ParseError::FieldCount {
                    verb: "RECORDS",
                    expected: (fields.len() / RECORD_FIELDS + 1) * RECORD_FIELDS,
                    found: fields.len(),
                });
            }
            let records = fields
                .chunks(RECORD_FIELDS)
                .map(decode_record)
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Response::Records(records))
        }
        _ => Err(ParseError::UnknownReply(line.to_string())),
    }
}

// =============================================================================
// Field helpers
// =============================================================================

/// Split `verb rest...` at the first whitespace
fn split_verb(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    }
}

/// Split an argument list on `&`, trim each field, drop trailing empties
fn split_fields(rest: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = rest.split(FIELD_SEPARATOR).map(str::trim).collect();
    while fields.last() == Some(&"") {
        fields.pop();
    }
    fields
}

fn decode_record(fields: &[&str]) -> ParseResult<SettlementRecord> {
    Ok(SettlementRecord {
        client_id: parse_client_id(fields[0])?,
        name: non_empty("name", fields[1])?.to_string(),
        template: non_empty("template", fields[2])?.to_string(),
        population: parse_number("population", fields[3])?,
        num_robots: parse_number("robot count", fields[4])?,
        latitude: parse_coordinate("latitude", fields[5])?,
        longitude: parse_coordinate("longitude", fields[6])?,
    })
}

/// Append `id & name & template & pop & bots & lat & lon & `
fn push_record(line: &mut String, record: &SettlementRecord) {
    use std::fmt::Write as _;
    // Writing into a String cannot fail
    let _ = write!(
        line,
        "{id} & {name} & {template} & {pop} & {bots} & {lat} & {lon} & ",
        id = record.client_id,
        name = record.name,
        template = record.template,
        pop = record.population,
        bots = record.num_robots,
        lat = record.latitude,
        lon = record.longitude,
    );
}

fn non_empty<'a>(field: &'static str, value: &'a str) -> ParseResult<&'a str> {
    if value.is_empty() {
        Err(ParseError::EmptyField { field })
    } else {
        Ok(value)
    }
}

fn parse_client_id(value: &str) -> ParseResult<u32> {
    match value.trim().parse::<u32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ParseError::InvalidNumber {
            field: "client id",
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> ParseResult<T> {
    value.trim().parse::<T>().map_err(|_| ParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_coordinate(field: &'static str, value: &str) -> ParseResult<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one line from a stream
///
/// Returns `Ok(None)` at end of stream. The terminator (`\n` or `\r\n`)
/// is stripped and does not count towards `MAX_LINE_LEN`; invalid UTF-8 is
/// replaced rather than rejected.
pub fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let limit = MAX_LINE_LEN as u64 + 2;
    let mut buf = Vec::new();
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;

    if read == 0 {
        return Ok(None);
    }

    let terminated = buf.last() == Some(&b'\n');
    if terminated {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    // Cut off by the limit before any terminator showed up
    if buf.len() > MAX_LINE_LEN || (!terminated && read as u64 == limit) {
        return Err(RegistryError::Protocol(format!(
            "line exceeds {} bytes",
            MAX_LINE_LEN
        )));
    }

    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Read and decode the next command
///
/// - `Ok(None)`: end of stream
/// - `Err(RegistryError::Parse(_))`: the line was consumed but is malformed
pub fn read_command<R: BufRead>(reader: &mut R) -> Result<Option<Command>> {
    match read_line(reader)? {
        Some(line) => Ok(Some(decode_command(&line)?)),
        None => Ok(None),
    }
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    write_line(writer, &encode_command(command))
}

/// Read and decode the next reply
///
/// End of stream is reported as `RegistryError::ConnectionClosed`.
pub fn read_response<R: BufRead>(reader: &mut R) -> Result<Response> {
    match read_line(reader)? {
        Some(line) => Ok(decode_response(&line)?),
        None => Err(RegistryError::ConnectionClosed),
    }
}

/// Write a reply to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    write_line(writer, &encode_response(response))
}

fn write_line<W: Write>(writer: &mut W, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
