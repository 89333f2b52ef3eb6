//! Window server connection identity and acquisition.

use std::fmt::{Display, Formatter, Result as FmtResult};

#[cfg(target_os = "macos")]
use std::ffi::c_int;

#[cfg(target_os = "macos")]
use once_cell::sync::OnceCell;

#[cfg(target_os = "macos")]
use crate::error::{Error, Result};

#[cfg(target_os = "macos")]
#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGSMainConnectionID() -> c_int;
}

/// Process default connection, resolved at most once. The id is stable for
/// the lifetime of the process; a failed resolution is not cached.
#[cfg(target_os = "macos")]
static MAIN_CONNECTION: OnceCell<ConnectionId> = OnceCell::new();

/// Identifier of a window server connection.
///
/// The raw value is an `int` on the wire. Zero is reserved: as a target it
/// means "all connections", and the server returns it as the main connection
/// when no session exists, so a zero id never escapes `Connection::acquire`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(i32);

impl ConnectionId {
    /// Wrap a raw connection id.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw id as passed over the wire.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "cid:{}", self.0)
    }
}

/// Handle to the process's own window server connection.
///
/// Holding one proves a session existed at acquisition time. All queries take
/// the [`ConnectionId`] it carries; none of them fall back to a hidden
/// global.
#[derive(Clone, Copy, Debug)]
pub struct Connection {
    id: ConnectionId,
}

impl Connection {
    /// Resolve the default connection for this process.
    ///
    /// The first successful call caches the id for the process lifetime;
    /// later calls are free. Returns [`Error::NoSession`] when the server
    /// reports no session (the raw call yields 0).
    #[cfg(target_os = "macos")]
    pub fn acquire() -> Result<Self> {
        let id = MAIN_CONNECTION.get_or_try_init(|| {
            // SAFETY: no arguments; the call only reads server state.
            let raw = unsafe { CGSMainConnectionID() };
            if raw == 0 {
                Err(Error::NoSession)
            } else {
                Ok(ConnectionId::from_raw(raw))
            }
        })?;
        Ok(Self { id: *id })
    }

    /// The connection id this handle carries.
    #[must_use]
    pub const fn id(self) -> ConnectionId {
        self.id
    }
}

/// Encode an optional target connection for the wire, where 0 selects all
/// connections.
pub(crate) fn raw_target(target: Option<ConnectionId>) -> i32 {
    target.map_or(0, ConnectionId::raw)
}
