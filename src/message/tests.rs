use crate::error::ErrorKind;
use crate::protocol::{Endianness, Flags, HeaderField, MessageType};
use crate::value::Value;
use crate::Result;

use super::{calc_message_size, Header, Message, MethodCall};

#[rustfmt::skip]
const LE_BLOB: [u8; 36] = [
    // byte 0
    // yyyyuu fixed headers
    b'l',
    // reply (which is the simplest message)
    b'\x02',
    // no auto-starting
    b'\x02',
    // D-Bus version = 1
    b'\x01',
    // byte 4
    // bytes in body = 4
    b'\x04', b'\x00', b'\x00', b'\x00',
    // byte 8
    // serial number = 0x12345678
    b'\x78', b'\x56', b'\x34', b'\x12',
    // byte 12
    // a(yv) variable headers start here
    // bytes in array of variable headers = 15
    // pad to 8-byte boundary = nothing
    b'\x0f', b'\0', b'\0', b'\0',
    // byte 16
    // in reply to:
    b'\x05',
    // variant signature = u
    // pad to 4-byte boundary = nothing
    b'\x01', b'u', b'\0',
    // 0xabcdef12
    // pad to 8-byte boundary = nothing
    b'\x12', b'\xef', b'\xcd', b'\xab',
    // byte 24
    // signature:
    b'\x08',
    // variant signature = g
    b'\x01', b'g', b'\0',
    // 1 byte, u, NUL (no alignment needed)
    b'\x01', b'u', b'\0',
    // pad to 8-byte boundary for body
    b'\0',
    // body; byte 32
    // 0xdeadbeef
    b'\xef', b'\xbe', b'\xad', b'\xde'
];

#[rustfmt::skip]
const BE_BLOB: [u8; 36] = [
    b'B', b'\x02', b'\x02', b'\x01',
    b'\x00', b'\x00', b'\x00', b'\x04',
    b'\x12', b'\x34', b'\x56', b'\x78',
    b'\0', b'\0', b'\0', b'\x0f',
    b'\x05', b'\x01', b'u', b'\0',
    b'\xab', b'\xcd', b'\xef', b'\x12',
    b'\x08', b'\x01', b'g', b'\0',
    b'\x01', b'u', b'\0', b'\0',
    b'\xde', b'\xad', b'\xbe', b'\xef',
];

fn blob_message(endianness: Endianness) -> Message {
    let mut header = Header::new(MessageType::METHOD_RETURN);
    header.endianness = endianness;
    header.flags = Flags::EMPTY | Flags::NO_AUTO_START;
    header.serial = 0x12345678;
    header.body_length = 4;
    header
        .fields
        .insert(HeaderField::REPLY_SERIAL, Value::UInt32(0xabcdef12));
    header
        .fields
        .insert(HeaderField::SIGNATURE, Value::signature("u"));
    Message::new(header, vec![Value::UInt32(0xdeadbeef)])
}

#[test]
fn write_blobs() -> Result<()> {
    assert_eq!(blob_message(Endianness::LITTLE).serialize()?, LE_BLOB);
    assert_eq!(blob_message(Endianness::BIG).serialize()?, BE_BLOB);
    Ok(())
}

#[test]
fn read_blobs() -> Result<()> {
    assert_eq!(Message::from_buffer(&LE_BLOB)?, blob_message(Endianness::LITTLE));
    assert_eq!(Message::from_buffer(&BE_BLOB)?, blob_message(Endianness::BIG));
    Ok(())
}

#[test]
fn message_size() -> Result<()> {
    assert_eq!(calc_message_size(&LE_BLOB)?, LE_BLOB.len());
    assert_eq!(calc_message_size(&BE_BLOB[..16])?, BE_BLOB.len());

    let error = calc_message_size(&LE_BLOB[..15]).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::BufferUnderflow));

    let mut header = LE_BLOB;
    header[4..8].copy_from_slice(&0x0800_0001u32.to_le_bytes());
    let error = calc_message_size(&header).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::BodyTooLong(..)));

    let mut header = LE_BLOB;
    header[12..16].copy_from_slice(&0x0400_0001u32.to_le_bytes());
    let error = calc_message_size(&header).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::HeaderFieldsTooLong(..)));

    let mut header = LE_BLOB;
    header[0] = b'X';
    let error = calc_message_size(&header).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidEndianness(b'X')));
    Ok(())
}

#[test]
fn body_length_is_recomputed() -> Result<()> {
    let mut m = blob_message(Endianness::LITTLE);
    m.header.body_length = 1000;
    assert_eq!(m.serialize()?, LE_BLOB);
    Ok(())
}

#[test]
fn round_trip_method_call() -> Result<()> {
    for endianness in [Endianness::LITTLE, Endianness::BIG] {
        let m = Message::method_call("/org/freedesktop/secrets", "SearchItems")
            .with_interface("org.freedesktop.Secret.Service")
            .with_destination("org.freedesktop.secrets")
            .with_flags(Flags::ALLOW_INTERACTIVE_AUTHORIZATION)
            .with_endianness(endianness)
            .with_body(
                "a{ss}ii",
                vec![
                    Value::Dict(vec![(Value::from("service"), Value::from("mail"))]),
                    Value::Int32(1),
                    Value::Int32(-2),
                ],
            )
            .with_serial(7);

        let bytes = m.serialize()?;
        assert_eq!(calc_message_size(&bytes)?, bytes.len());

        let m2 = Message::from_buffer(&bytes)?;
        assert_eq!(m2.message_type(), MessageType::METHOD_CALL);
        assert_eq!(m2.serial(), 7);
        assert_eq!(m2.path(), Some("/org/freedesktop/secrets"));
        assert_eq!(m2.interface(), Some("org.freedesktop.Secret.Service"));
        assert_eq!(m2.member(), Some("SearchItems"));
        assert_eq!(m2.destination(), Some("org.freedesktop.secrets"));
        assert_eq!(m2.signature(), "a{ss}ii");
        assert!(m2.flags() & Flags::ALLOW_INTERACTIVE_AUTHORIZATION);
        assert_eq!(
            m2.body(),
            [
                Value::Array(vec![Value::Struct(vec![
                    Value::from("service"),
                    Value::from("mail")
                ])]),
                Value::Int32(1),
                Value::Int32(-2),
            ]
        );
    }

    Ok(())
}

#[test]
fn replies() -> Result<()> {
    let call = Message::method_call("/", "Ping")
        .with_sender(":1.7")
        .with_serial(42);

    let reply = call.method_return().with_serial(1);
    assert_eq!(reply.message_type(), MessageType::METHOD_RETURN);
    assert_eq!(reply.reply_serial(), Some(42));
    assert_eq!(reply.destination(), Some(":1.7"));
    Message::from_buffer(&reply.serialize()?)?;

    let error = call
        .error("org.freedesktop.DBus.Error.Failed")
        .with_body("s", vec![Value::from("boom")])
        .with_serial(2);
    assert_eq!(error.message_type(), MessageType::ERROR);
    assert_eq!(error.error_name(), Some("org.freedesktop.DBus.Error.Failed"));

    let parsed = Message::from_buffer(&error.serialize()?)?;
    assert_eq!(parsed.reply_serial(), Some(42));
    assert_eq!(parsed.body(), [Value::from("boom")]);
    Ok(())
}

#[test]
fn signal() -> Result<()> {
    let m = Message::signal("/org/freedesktop/DBus", "org.freedesktop.DBus", "NameAcquired")
        .with_body("s", vec![Value::from(":1.7")])
        .with_serial(3);

    let parsed = Message::from_buffer(&m.serialize()?)?;
    assert_eq!(parsed.message_type(), MessageType::SIGNAL);
    assert_eq!(parsed.interface(), Some("org.freedesktop.DBus"));
    assert_eq!(parsed.body(), [Value::from(":1.7")]);
    Ok(())
}

#[test]
fn validation() {
    let error = Message::method_call("/", "Ping").serialize().unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::ZeroSerial));

    let mut header = Header::new(MessageType::METHOD_CALL);
    header.serial = 1;
    header.fields.insert(HeaderField::PATH, Value::object_path("/"));
    let error = Message::new(header, vec![]).serialize().unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::MissingMember));

    let mut header = Header::new(MessageType::SIGNAL);
    header.serial = 1;
    header.fields.insert(HeaderField::PATH, Value::object_path("/"));
    header.fields.insert(HeaderField::MEMBER, Value::from("Changed"));
    let error = Message::new(header, vec![]).serialize().unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::MissingInterface));

    let mut header = Header::new(MessageType::ERROR);
    header.serial = 1;
    header.fields.insert(HeaderField::REPLY_SERIAL, Value::UInt32(1));
    let error = Message::new(header, vec![]).serialize().unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::MissingErrorName));

    let mut header = Header::new(MessageType::METHOD_RETURN);
    header.serial = 1;
    header.fields.insert(HeaderField::REPLY_SERIAL, Value::UInt32(0));
    let error = Message::new(header, vec![]).serialize().unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::ZeroReplySerial));

    let error = Message::method_call("not a path", "Ping")
        .with_serial(1)
        .serialize()
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidObjectPath(..)));

    let error = Message::method_call("/", "Ping")
        .with_body("u", vec![Value::from("x")])
        .with_serial(1)
        .serialize()
        .unwrap_err();
    assert!(error.is_marshal());

    let error = Message::method_call("/", "Ping")
        .with_body("uu", vec![Value::UInt32(1)])
        .with_serial(1)
        .serialize()
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::ArityMismatch { expected: 2, actual: 1 }));
}

#[test]
fn trailing_bytes_are_ignored() -> Result<()> {
    let mut bytes = LE_BLOB.to_vec();
    bytes.extend_from_slice(&[1, 2, 3]);
    assert_eq!(Message::from_buffer(&bytes)?, blob_message(Endianness::LITTLE));
    Ok(())
}

#[test]
fn truncated() {
    for n in 0..LE_BLOB.len() {
        let error = Message::from_buffer(&LE_BLOB[..n]).unwrap_err();
        assert!(error.is_framing(), "{n}: {error}");
    }
}

#[test]
fn corrupt_path_is_framing_error() -> Result<()> {
    let mut bytes = Message::method_call("/a/b", "Ping").with_serial(1).serialize()?;

    let at = bytes
        .windows(5)
        .position(|w| w == b"/a/b\0")
        .expect("path is encoded");
    bytes[at..at + 4].copy_from_slice(b"//ab");

    let error = Message::from_buffer(&bytes).unwrap_err();
    assert!(error.is_framing(), "{error}");
    assert!(!error.is_marshal());
    Ok(())
}

#[test]
fn body_length_mismatch() {
    let mut bytes = LE_BLOB.to_vec();
    bytes[4] = 8;
    bytes.extend_from_slice(&[0, 0, 0, 0]);

    let error = Message::from_buffer(&bytes).unwrap_err();
    assert!(matches!(
        error.kind(),
        ErrorKind::BodyLengthMismatch {
            declared: 8,
            actual: 4
        }
    ));
}

#[test]
fn unknown_header_fields_are_skipped() -> Result<()> {
    #[rustfmt::skip]
    let bytes = [
        b'l', 2, 0, 1,
        0, 0, 0, 0,
        1, 0, 0, 0,
        13, 0, 0, 0,
        // REPLY_SERIAL = 1
        5, 1, b'u', 0, 1, 0, 0, 0,
        // unknown field 200 = byte 7, then padding
        200, 1, b'y', 0, 7, 0, 0, 0,
    ];

    assert_eq!(calc_message_size(&bytes)?, bytes.len());

    let m = Message::from_buffer(&bytes)?;
    assert_eq!(m.message_type(), MessageType::METHOD_RETURN);
    assert_eq!(m.reply_serial(), Some(1));
    assert_eq!(m.header.fields.len(), 1);
    assert!(m.body().is_empty());
    Ok(())
}

#[test]
fn header_field_of_wrong_type() {
    #[rustfmt::skip]
    let bytes = [
        b'l', 2, 0, 1,
        0, 0, 0, 0,
        1, 0, 0, 0,
        5, 0, 0, 0,
        // REPLY_SERIAL as a byte
        5, 1, b'y', 0, 7, 0, 0, 0,
    ];

    let error = Message::from_buffer(&bytes).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidHeaderField(5)));
}

#[test]
fn method_call_builder() -> Result<()> {
    let call = MethodCall::new(
        "org.freedesktop.DBus",
        "/org/freedesktop/DBus",
        "org.freedesktop.DBus",
        "GetId",
    )
    .with_reply_signature("s");

    let m = Message::from(call.clone()).with_serial(9);
    let parsed = Message::from_buffer(&m.serialize()?)?;
    assert_eq!(parsed.destination(), Some("org.freedesktop.DBus"));
    assert_eq!(parsed.member(), Some("GetId"));
    assert_eq!(parsed.signature(), "");
    assert_eq!(call.reply_signature(), Some("s"));
    Ok(())
}
