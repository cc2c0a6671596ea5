mod fake_bus;

use std::time::Duration;

use anyhow::{Context, Result};
use dbus_wire::sasl::Auth;
use dbus_wire::{BlockingConnection, Message, Value};

#[test]
fn calls_and_signals() -> Result<()> {
    let (client, server) = fake_bus::spawn()?;

    let mut c = BlockingConnection::new(client);
    let guid = c.authenticate(&Auth::external_from_u32(1000))?;
    assert_eq!(guid.as_str(), fake_bus::GUID);
    assert_eq!(c.hello()?, fake_bus::UNIQUE_NAME);
    assert_eq!(c.unique_name(), Some(fake_bus::UNIQUE_NAME));

    let reply = c.send_and_wait(
        fake_bus::call("Echo")
            .with_args("sv", vec![Value::from("x"), Value::variant("u", Value::UInt32(7))])
            .with_reply_signature("sv"),
    )?;

    assert_eq!(
        reply.body(),
        [Value::from("x"), Value::variant("u", Value::UInt32(7))]
    );

    let error = c.send_and_wait(fake_bus::call("Fail")).unwrap_err();
    let (name, body) = error.response_error().context("expected error reply")?;
    assert_eq!(name, fake_bus::FAILED);
    assert_eq!(body, [Value::from("it failed")]);

    c.send_and_wait(fake_bus::call("Emit"))?;

    // Sent in the same write as the end of authentication.
    let acquired = c.recv_message()?;
    assert_eq!(acquired.member(), Some("NameAcquired"));
    assert_eq!(acquired.body(), [Value::from(fake_bus::UNIQUE_NAME)]);

    let emitted = c.recv_message()?;
    assert_eq!(emitted.member(), Some("Emitted"));

    let mut signal = Message::signal("/org/example", "org.example.Test", "Hi");
    let serial = c.send_message(&mut signal)?;
    assert_ne!(serial, 0);
    assert_eq!(signal.serial(), serial);

    drop(c);

    let seen = server.join().map_err(|_| anyhow::anyhow!("bus panicked"))??;
    let members = seen.iter().filter_map(|m| m.member()).collect::<Vec<_>>();
    assert_eq!(members, ["Hello", "Echo", "Fail", "Emit", "Hi"]);
    Ok(())
}

#[test]
fn unexpected_reply_signature() -> Result<()> {
    let (client, _server) = fake_bus::spawn()?;

    let mut c = BlockingConnection::new(client);
    c.authenticate(&Auth::external_from_u32(0))?;

    let error = c
        .send_and_wait(
            fake_bus::call("Echo")
                .with_args("u", vec![Value::UInt32(5)])
                .with_reply_signature("s"),
        )
        .unwrap_err();

    assert!(error.is_marshal());
    Ok(())
}

#[test]
fn timeout_and_close() -> Result<()> {
    let (client, _server) = fake_bus::spawn()?;

    let mut c = BlockingConnection::new(client);
    c.authenticate(&Auth::external_from_u32(0))?;

    c.set_timeout(Some(Duration::from_millis(50)))?;
    let error = c.send_and_wait(fake_bus::call("Never")).unwrap_err();
    assert!(error.is_timeout());
    c.set_timeout(None)?;

    // The connection is still usable after a timeout.
    c.send_and_wait(fake_bus::call("Echo"))?;

    let error = c.send_and_wait(fake_bus::call("Close")).unwrap_err();
    assert!(error.is_connection_reset());

    let error = c.send_and_wait(fake_bus::call("Echo")).unwrap_err();
    assert!(error.is_closed());
    Ok(())
}

#[test]
fn reply_before_corruption() -> Result<()> {
    let (client, _server) = fake_bus::spawn()?;

    let mut c = BlockingConnection::new(client);
    c.authenticate(&Auth::external_from_u32(0))?;

    let reply = c.send_and_wait(fake_bus::call("Corrupt"))?;
    assert_eq!(reply.member(), None);

    let acquired = c.recv_message()?;
    assert_eq!(acquired.member(), Some("NameAcquired"));

    let error = c.recv_message().unwrap_err();
    assert!(error.is_framing(), "{error}");

    let error = c.send_and_wait(fake_bus::call("Echo")).unwrap_err();
    assert!(error.is_closed());
    Ok(())
}

#[test]
fn authentication_timeout() -> Result<()> {
    let (client, _server) = std::os::unix::net::UnixStream::pair()?;

    let mut c = BlockingConnection::new(client);
    c.set_timeout(Some(Duration::from_millis(50)))?;

    let error = c.authenticate(&Auth::external_from_u32(0)).unwrap_err();
    assert!(error.is_timeout(), "{error}");
    Ok(())
}

#[test]
fn rejected() -> Result<()> {
    let (client, _server) = fake_bus::spawn_rejecting()?;

    let mut c = BlockingConnection::new(client);
    let error = c.authenticate(&Auth::external_from_u32(0)).unwrap_err();
    assert!(error.is_authentication());
    assert_eq!(error.auth_line(), Some(&b"REJECTED EXTERNAL"[..]));
    Ok(())
}
