//! winview: point-in-time window and space snapshots.
//!
//! A [`Viewer`] composes the per-call queries of `mac-cgs` into one
//! consistent-enough picture: which windows exist (in z-order), which
//! spaces each belongs to, where each sits on screen, and whether it is on
//! the active space. The window server offers no transactional read, so a
//! snapshot is assembled from racing calls and the facade absorbs the
//! races: windows that vanish mid-snapshot are dropped, populations that
//! outgrow the fetch buffer trigger a bounded regrow, and transient server
//! failures are retried with backoff before anything is reported upward.
//!
//! Snapshots are plain data. There is no cache, no diffing, and no
//! background polling; callers that want freshness call again.
//!
//! ```
//! use std::sync::Arc;
//!
//! use mac_cgs::{Rect, ops::MockWindowServer};
//! use winview::Viewer;
//!
//! let server = MockWindowServer::new();
//! server.set_windows(vec![42]);
//! server.set_spaces(42, vec![1]);
//! server.set_rect(42, Rect::new(0.0, 0.0, 640.0, 480.0));
//!
//! let viewer = Viewer::connect(Arc::new(server))?;
//! let snap = viewer.all_windows()?;
//! assert_eq!(snap.windows.len(), 1);
//! assert!(snap.windows[0].on_active_space);
//! # Ok::<(), winview::Error>(())
//! ```
//!
//! On macOS the server argument is `Arc::new(RealWindowServer)`; tests and
//! other platforms script a [`MockWindowServer`](mac_cgs::ops::MockWindowServer).

use std::{fmt, sync::Arc, time::Duration};

use mac_cgs::Error as CgsError;
use thiserror::Error;
use tracing::debug;

mod snapshot;

pub use mac_cgs::ops::WindowServer;
#[cfg(target_os = "macos")]
pub use mac_cgs::ops::RealWindowServer;
pub use mac_cgs::{ConnectionId, Rect, SpaceId, SpaceMask, WindowId};
pub use snapshot::{Filter, Scope, Snapshot, WindowRecord};

/// Failures surfaced by the facade.
///
/// Everything recoverable is absorbed during assembly; what remains is
/// either the absence of a window server session or a server that kept
/// failing after bounded retries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// No window server session is reachable from this process.
    #[error("no window server session")]
    NoSession,

    /// The server kept failing after bounded retries.
    #[error("window server unavailable after {attempts} attempts (CGError {code})")]
    Unavailable {
        /// Raw `CGError` from the last failing call.
        code: i32,
        /// Calls made before giving up.
        attempts: u32,
        /// Records assembled before the failing step, when any exist.
        /// Space membership in partial records is empty.
        partial: Option<Box<Snapshot>>,
    },
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn fail(err: CgsError, attempts: u32, partial: Option<Box<Snapshot>>) -> Error {
    match err {
        CgsError::NoSession => Error::NoSession,
        other => Error::Unavailable {
            code: other.cg_code(),
            attempts,
            partial,
        },
    }
}

/// Tuning knobs for snapshot assembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewerCfg {
    /// Headroom added on top of the reported count when sizing list
    /// buffers, and the initial capacity for scopes with no count call.
    pub slack: usize,
    /// How many times a truncated list is refetched with a larger buffer.
    pub grow_retries: u32,
    /// Attempts per server call before a transient failure becomes hard.
    pub call_attempts: u32,
    /// Backoff before the first retry; doubles per subsequent retry.
    pub retry_delay: Duration,
}

impl Default for ViewerCfg {
    fn default() -> Self {
        Self {
            slack: 16,
            grow_retries: 3,
            call_attempts: 3,
            retry_delay: Duration::from_millis(10),
        }
    }
}

/// Handle over one window server connection, ready to take snapshots.
#[derive(Clone)]
pub struct Viewer {
    server: Arc<dyn WindowServer>,
    conn: ConnectionId,
    cfg: ViewerCfg,
}

impl fmt::Debug for Viewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewer")
            .field("conn", &self.conn)
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

impl Viewer {
    /// Connect with default tuning.
    pub fn connect(server: Arc<dyn WindowServer>) -> Result<Self> {
        Self::with_cfg(server, ViewerCfg::default())
    }

    /// Connect with explicit tuning.
    ///
    /// Resolves the caller's connection through the seam; a dead session
    /// maps to [`Error::NoSession`].
    pub fn with_cfg(server: Arc<dyn WindowServer>, cfg: ViewerCfg) -> Result<Self> {
        let conn = server.main_connection().map_err(|err| fail(err, 1, None))?;
        debug!("viewer connected as {conn}");
        Ok(Self { server, conn, cfg })
    }

    /// The connection snapshots are taken over.
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.conn
    }

    /// The space currently visible to the user.
    #[must_use]
    pub fn active_space(&self) -> SpaceId {
        self.server.active_space(self.conn)
    }

    /// Assemble a snapshot for `filter`.
    pub fn snapshot(&self, filter: &Filter) -> Result<Snapshot> {
        snapshot::build(self.server.as_ref(), self.conn, &self.cfg, filter)
    }

    /// Snapshot of on-screen windows, every space, no owner filter.
    pub fn on_screen(&self) -> Result<Snapshot> {
        self.snapshot(&Filter::on_screen())
    }

    /// Snapshot of every window the server knows.
    pub fn all_windows(&self) -> Result<Snapshot> {
        self.snapshot(&Filter::default())
    }
}
