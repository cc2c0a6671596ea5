//! A minimal bus which answers a fixed set of method calls over one end of a
//! socket pair.
//!
//! * `Hello` replies with [`UNIQUE_NAME`].
//! * `Echo` replies with the body of the call.
//! * `Fail` replies with the error [`FAILED`].
//! * `Emit` sends the signal `Emitted` and then replies.
//! * `Later` is only replied to once `Now` has been replied to.
//! * `Never` is never replied to.
//! * `Close` closes the socket.
//! * `Corrupt` replies, then writes garbage in the same write and closes the
//!   socket.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::thread::{self, JoinHandle};

use anyhow::{bail, ensure, Result};
use bstr::BStr;
use dbus_wire::{Message, MethodCall, Parser, Value};

pub const GUID: &str = "0123456789abcdef0123456789abcdef";
pub const UNIQUE_NAME: &str = ":1.7";
pub const FAILED: &str = "org.example.Error.Failed";

/// Construct a call to `member` on the test interface.
pub fn call(member: &str) -> MethodCall {
    MethodCall::new("org.example.Test", "/org/example", "org.example.Test", member)
}

/// Spawn a bus accepting any authentication. Returns the client end of the
/// socket and a handle resolving to every message the bus received.
pub fn spawn() -> Result<(UnixStream, JoinHandle<Result<Vec<Message>>>)> {
    let (client, server) = UnixStream::pair()?;
    let handle = thread::spawn(move || serve(server));
    Ok((client, handle))
}

/// Spawn a bus which rejects authentication.
pub fn spawn_rejecting() -> Result<(UnixStream, JoinHandle<Result<()>>)> {
    let (client, mut server) = UnixStream::pair()?;

    let handle = thread::spawn(move || {
        read_line(&mut server)?;
        server.write_all(b"REJECTED EXTERNAL\r\n")?;
        Ok(())
    });

    Ok((client, handle))
}

fn read_line(stream: &mut UnixStream) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0];

    while !line.ends_with(b"\r\n") {
        if stream.read(&mut byte)? == 0 {
            bail!("closed during authentication: {:?}", BStr::new(&line));
        }

        line.push(byte[0]);
    }

    Ok(line)
}

fn serve(mut stream: UnixStream) -> Result<Vec<Message>> {
    let line = read_line(&mut stream)?;
    ensure!(line.starts_with(b"\0AUTH "), "bad auth line {:?}", BStr::new(&line));

    let mut serial = 0;

    let mut next_serial = || {
        serial += 1;
        serial
    };

    // The first message shares a write with the OK line.
    let acquired = Message::signal("/org/freedesktop/DBus", "org.freedesktop.DBus", "NameAcquired")
        .with_sender("org.freedesktop.DBus")
        .with_body("s", vec![Value::from(UNIQUE_NAME)])
        .with_serial(next_serial());

    let mut out = format!("OK {GUID}\r\n").into_bytes();
    out.extend(acquired.serialize()?);
    stream.write_all(&out)?;

    let begin = read_line(&mut stream)?;
    ensure!(begin == b"BEGIN\r\n", "expected BEGIN, got {:?}", BStr::new(&begin));

    let mut parser = Parser::new();
    let mut buf = [0; 4096];
    let mut held = Vec::new();
    let mut seen = Vec::new();

    loop {
        let n = stream.read(&mut buf)?;

        if n == 0 {
            return Ok(seen);
        }

        for message in parser.feed(&buf[..n])? {
            let mut replies = Vec::new();

            match message.member() {
                Some("Hello") => {
                    replies.push(
                        message
                            .method_return()
                            .with_body("s", vec![Value::from(UNIQUE_NAME)]),
                    );
                }
                Some("Echo") => {
                    let signature = message.signature().to_owned();
                    let body = message.body().to_vec();
                    replies.push(message.method_return().with_body(&signature, body));
                }
                Some("Fail") => {
                    replies.push(
                        message
                            .error(FAILED)
                            .with_body("s", vec![Value::from("it failed")]),
                    );
                }
                Some("Emit") => {
                    replies.push(Message::signal("/org/example", "org.example.Test", "Emitted"));
                    replies.push(message.method_return());
                }
                Some("Later") => {
                    held.push(message.method_return());
                }
                Some("Now") => {
                    replies.push(message.method_return());
                    replies.append(&mut held);
                }
                Some("Close") => {
                    seen.push(message);
                    return Ok(seen);
                }
                Some("Corrupt") => {
                    let mut out = message.method_return().with_serial(next_serial()).serialize()?;
                    out.extend_from_slice(&[b'X'; 16]);
                    stream.write_all(&out)?;
                    seen.push(message);
                    return Ok(seen);
                }
                _ => {}
            }

            for reply in replies {
                stream.write_all(&reply.with_serial(next_serial()).serialize()?)?;
            }

            seen.push(message);
        }
    }
}
