use std::time::Duration;

use crate::address::BusAddress;
use crate::blocking::BlockingConnection;
use crate::error::Result;
use crate::sasl::Auth;

#[cfg(feature = "tokio")]
use crate::{Connection, LocalConnection};

#[derive(Debug, Clone)]
enum BusKind {
    Session,
    System,
    Address(BusAddress),
}

/// Builder of a connection.
///
/// The same configuration can build any of the three drivers:
/// [`BlockingConnection`], [`LocalConnection`] and [`Connection`].
///
/// [`LocalConnection`]: crate::LocalConnection
/// [`Connection`]: crate::Connection
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    bus: BusKind,
    auth: Auth,
    hello: bool,
    timeout: Option<Duration>,
}

impl ConnectionBuilder {
    /// Construct a new connection builder.
    ///
    /// By default it connects to the session bus, authenticates as the
    /// current user and sends `Hello`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_wire::ConnectionBuilder;
    ///
    /// let c = ConnectionBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            bus: BusKind::Session,
            auth: Auth::default(),
            hello: true,
            timeout: None,
        }
    }

    /// Connect to the session bus (default).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dbus_wire::ConnectionBuilder;
    ///
    /// let c = ConnectionBuilder::new().session_bus().connect_blocking()?;
    /// # Ok::<_, dbus_wire::Error>(())
    /// ```
    pub fn session_bus(&mut self) -> &mut Self {
        self.bus = BusKind::Session;
        self
    }

    /// Connect to the system bus.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dbus_wire::ConnectionBuilder;
    ///
    /// # #[tokio::main] async fn main() -> dbus_wire::Result<()> {
    /// let c = ConnectionBuilder::new().system_bus().connect().await?;
    /// # Ok(()) }
    /// ```
    pub fn system_bus(&mut self) -> &mut Self {
        self.bus = BusKind::System;
        self
    }

    /// Connect to an explicit address.
    pub fn address(&mut self, address: BusAddress) -> &mut Self {
        self.bus = BusKind::Address(address);
        self
    }

    /// Set the authentication to perform.
    pub fn auth(&mut self, auth: Auth) -> &mut Self {
        self.auth = auth;
        self
    }

    /// Set whether `Hello` is sent after authenticating (default `true`).
    ///
    /// A bus daemon requires it before anything else, but a peer-to-peer
    /// connection does not accept it.
    pub fn hello(&mut self, hello: bool) -> &mut Self {
        self.hello = hello;
        self
    }

    /// Set how long calls wait for their reply.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Construct and connect a [`BlockingConnection`] with the current
    /// configuration.
    pub fn connect_blocking(&self) -> Result<BlockingConnection> {
        let address = self.resolve()?;
        let mut c = BlockingConnection::connect(&address)?;
        c.set_timeout(self.timeout)?;
        c.authenticate(&self.auth)?;

        if self.hello {
            c.hello()?;
        }

        Ok(c)
    }

    /// Construct and connect a [`LocalConnection`] with the current
    /// configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a [`tokio::task::LocalSet`].
    #[cfg(feature = "tokio")]
    pub async fn connect_local(&self) -> Result<LocalConnection> {
        let address = self.resolve()?;
        let mut c = LocalConnection::connect(&address, &self.auth).await?;
        c.set_timeout(self.timeout);

        if self.hello {
            c.hello().await?;
        }

        Ok(c)
    }

    /// Construct and connect a [`Connection`] with the current
    /// configuration.
    #[cfg(feature = "tokio")]
    pub async fn connect(&self) -> Result<Connection> {
        let address = self.resolve()?;
        let mut c = Connection::connect(&address, &self.auth).await?;
        c.set_timeout(self.timeout);

        if self.hello {
            c.hello().await?;
        }

        Ok(c)
    }

    fn resolve(&self) -> Result<BusAddress> {
        match &self.bus {
            BusKind::Session => BusAddress::session(),
            BusKind::System => BusAddress::system(),
            BusKind::Address(address) => Ok(address.clone()),
        }
    }
}

impl Default for ConnectionBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
