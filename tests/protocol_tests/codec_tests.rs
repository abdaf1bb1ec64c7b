//! Codec Tests
//!
//! Tests for command and reply encoding/decoding.

use std::io::Cursor;

use settlement_registry::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command, read_line,
    read_response, write_command, write_response, Command, ParseError, Response, MAX_LINE_LEN,
};
use settlement_registry::{RegistryError, SettlementRecord};

// =============================================================================
// Helper Functions
// =============================================================================

fn alpha() -> SettlementRecord {
    SettlementRecord::new(1, "Alpha", "Mars Direct Base (phase 1)", 6, 4, 12.5, -23.1).unwrap()
}

// =============================================================================
// Command Decoding Tests
// =============================================================================

#[test]
fn test_decode_register() {
    let cmd = decode_command("register Ada Lovelace").unwrap();
    assert_eq!(
        cmd,
        Command::Register {
            username: "Ada Lovelace".to_string()
        }
    );
}

#[test]
fn test_decode_register_without_name() {
    let err = decode_command("register").unwrap_err();
    assert!(matches!(err, ParseError::MissingArgument { .. }));
}

#[test]
fn test_decode_new_legacy_line() {
    let cmd =
        decode_command("new 1 & Alpha & Mars Direct Base (phase 1) & 6 & 4 & 12.5 & -23.1 &")
            .unwrap();
    assert_eq!(cmd, Command::New { record: alpha() });
}

#[test]
fn test_decode_new_without_trailing_separator() {
    let cmd = decode_command("new 1&Alpha&Mars Direct Base (phase 1)&6&4&12.5&-23.1").unwrap();
    assert_eq!(cmd, Command::New { record: alpha() });
}

#[test]
fn test_decode_new_trims_fields() {
    let cmd = decode_command(
        "  new   1 &   Alpha   & Mars Direct Base (phase 1)  &6&  4 & 12.5 &  -23.1  &  ",
    )
    .unwrap();
    assert_eq!(cmd, Command::New { record: alpha() });
}

#[test]
fn test_decode_new_wrong_field_count() {
    let err = decode_command("new 1 & Alpha & 12.5 & -23.1 &").unwrap_err();
    assert_eq!(
        err,
        ParseError::FieldCount {
            verb: "new",
            expected: 7,
            found: 4
        }
    );
}

#[test]
fn test_decode_new_non_numeric_population() {
    let err = decode_command("new 1 & Alpha & Base & many & 4 & 12.5 & -23.1 &").unwrap_err();
    assert!(matches!(
        err,
        ParseError::InvalidNumber {
            field: "population",
            ..
        }
    ));
}

#[test]
fn test_decode_new_rejects_zero_id_and_nan() {
    assert!(decode_command("new 0 & Alpha & Base & 6 & 4 & 12.5 & -23.1 &").is_err());
    assert!(decode_command("new 1 & Alpha & Base & 6 & 4 & NaN & -23.1 &").is_err());
}

#[test]
fn test_decode_new_empty_name() {
    let err = decode_command("new 1 &  & Base & 6 & 4 & 12.5 & -23.1 &").unwrap_err();
    assert_eq!(err, ParseError::EmptyField { field: "name" });
}

#[test]
fn test_decode_update_and_remove() {
    let cmd =
        decode_command("update 1 & Alpha & Mars Direct Base (phase 1) & 6 & 4 & 12.5 & -23.1 &")
            .unwrap();
    assert_eq!(cmd, Command::Update { record: alpha() });

    let cmd = decode_command("remove 1 & Alpha &").unwrap();
    assert_eq!(
        cmd,
        Command::Remove {
            client_id: 1,
            name: "Alpha".to_string()
        }
    );
}

#[test]
fn test_decode_get_count_bye() {
    assert_eq!(decode_command("get").unwrap(), Command::Get);
    assert_eq!(decode_command("s").unwrap(), Command::Count);
    assert_eq!(decode_command("bye 3").unwrap(), Command::Bye { client_id: 3 });
}

#[test]
fn test_decode_get_with_arguments() {
    assert!(matches!(
        decode_command("get all").unwrap_err(),
        ParseError::UnexpectedArguments { .. }
    ));
}

#[test]
fn test_decode_bye_with_name_is_rejected() {
    let err = decode_command("bye Ada").unwrap_err();
    assert!(matches!(err, ParseError::InvalidNumber { field: "client id", .. }));
}

#[test]
fn test_decode_unknown_verb() {
    assert_eq!(
        decode_command("launch 1").unwrap_err(),
        ParseError::UnknownVerb("launch".to_string())
    );
    // Verbs are case-sensitive
    assert!(decode_command("GET").is_err());
}

#[test]
fn test_decode_empty_line() {
    assert_eq!(decode_command("   ").unwrap_err(), ParseError::EmptyLine);
}

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_encode_commands() {
    assert_eq!(
        encode_command(&Command::Register {
            username: "Ada".to_string()
        }),
        "register Ada"
    );
    assert_eq!(
        encode_command(&Command::New { record: alpha() }),
        "new 1 & Alpha & Mars Direct Base (phase 1) & 6 & 4 & 12.5 & -23.1 &"
    );
    assert_eq!(
        encode_command(&Command::Remove {
            client_id: 2,
            name: "Beta".to_string()
        }),
        "remove 2 & Beta &"
    );
    assert_eq!(encode_command(&Command::Get), "get");
    assert_eq!(encode_command(&Command::Count), "s");
    assert_eq!(encode_command(&Command::Bye { client_id: 4 }), "bye 4");
}

// =============================================================================
// Reply Tests
// =============================================================================

#[test]
fn test_encode_replies() {
    assert_eq!(encode_response(&Response::NewId(7)), "NEW_ID 7");
    assert_eq!(encode_response(&Response::Records(vec![])), "RECORDS 0");
    assert_eq!(encode_response(&Response::Settlements(3)), "SETTLEMENTS 3");
}

#[test]
fn test_encode_records_keeps_trailing_separator() {
    let line = encode_response(&Response::Records(vec![alpha()]));
    assert_eq!(
        line,
        "RECORDS 1 & Alpha & Mars Direct Base (phase 1) & 6 & 4 & 12.5 & -23.1 & "
    );
}

#[test]
fn test_decode_records_multiple() {
    let beta = SettlementRecord::new(2, "Beta", "Trading Outpost", 10, 0, -4.0, 100.25).unwrap();
    let line = encode_response(&Response::Records(vec![alpha(), beta.clone()]));

    match decode_response(&line).unwrap() {
        Response::Records(records) => assert_eq!(records, vec![alpha(), beta]),
        other => panic!("Expected RECORDS, got {:?}", other),
    }
}

#[test]
fn test_decode_records_empty() {
    assert_eq!(
        decode_response("RECORDS 0").unwrap(),
        Response::Records(Vec::new())
    );
}

#[test]
fn test_decode_records_truncated() {
    let err = decode_response("RECORDS 1 & Alpha & Base & 6 &").unwrap_err();
    assert!(matches!(err, ParseError::FieldCount { verb: "RECORDS", .. }));
}

#[test]
fn test_decode_unknown_reply() {
    assert!(matches!(
        decode_response("HELLO there").unwrap_err(),
        ParseError::UnknownReply(_)
    ));
}

#[test]
fn test_decode_new_id_and_settlements() {
    assert_eq!(decode_response("NEW_ID 12").unwrap(), Response::NewId(12));
    assert_eq!(
        decode_response("SETTLEMENTS 0").unwrap(),
        Response::Settlements(0)
    );
    assert!(decode_response("NEW_ID x").is_err());
}

// =============================================================================
// Stream Tests
// =============================================================================

#[test]
fn test_write_then_read_command_stream() {
    let mut buf = Vec::new();
    write_command(&mut buf, &Command::Register { username: "Ada".to_string() }).unwrap();
    write_command(&mut buf, &Command::Get).unwrap();
    assert_eq!(buf, b"register Ada\nget\n");

    let mut reader = Cursor::new(buf);
    assert!(matches!(
        read_command(&mut reader).unwrap(),
        Some(Command::Register { .. })
    ));
    assert_eq!(read_command(&mut reader).unwrap(), Some(Command::Get));
    assert_eq!(read_command(&mut reader).unwrap(), None);
}

#[test]
fn test_read_command_malformed_line_keeps_stream_in_sync() {
    let mut reader = Cursor::new(b"bogus line\ns\n".to_vec());

    assert!(matches!(
        read_command(&mut reader),
        Err(RegistryError::Parse(ParseError::UnknownVerb(_)))
    ));
    assert_eq!(read_command(&mut reader).unwrap(), Some(Command::Count));
}

#[test]
fn test_read_line_strips_crlf() {
    let mut reader = Cursor::new(b"get\r\n".to_vec());
    assert_eq!(read_line(&mut reader).unwrap(), Some("get".to_string()));
    assert_eq!(read_line(&mut reader).unwrap(), None);
}

#[test]
fn test_read_line_rejects_oversized_line() {
    let mut data = vec![b'a'; MAX_LINE_LEN + 10];
    data.push(b'\n');
    let mut reader = Cursor::new(data);

    assert!(matches!(
        read_line(&mut reader),
        Err(RegistryError::Protocol(_))
    ));
}

#[test]
fn test_read_line_accepts_longest_line_with_either_terminator() {
    for terminator in [&b"\n"[..], &b"\r\n"[..]] {
        let mut data = vec![b'a'; MAX_LINE_LEN];
        data.extend_from_slice(terminator);
        data.extend_from_slice(b"s\n");
        let mut reader = Cursor::new(data);

        let line = read_line(&mut reader).unwrap().unwrap();
        assert_eq!(line.len(), MAX_LINE_LEN);
        assert_eq!(read_line(&mut reader).unwrap(), Some("s".to_string()));
    }
}

#[test]
fn test_read_line_rejects_one_byte_over() {
    for terminator in [&b"\n"[..], &b"\r\n"[..]] {
        let mut data = vec![b'a'; MAX_LINE_LEN + 1];
        data.extend_from_slice(terminator);
        let mut reader = Cursor::new(data);

        assert!(matches!(
            read_line(&mut reader),
            Err(RegistryError::Protocol(_))
        ));
    }
}

#[test]
fn test_write_then_read_response_stream() {
    let mut buf = Vec::new();
    write_response(&mut buf, &Response::Settlements(2)).unwrap();

    let mut reader = Cursor::new(buf);
    assert_eq!(read_response(&mut reader).unwrap(), Response::Settlements(2));
    assert!(matches!(
        read_response(&mut reader),
        Err(RegistryError::ConnectionClosed)
    ));
}
