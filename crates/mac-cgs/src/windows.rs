//! Window enumeration, counts, and screen rectangles.
//!
//! The list calls share one shape: the caller supplies a buffer and its
//! capacity, the server fills at most that many ids and reports the full
//! population it saw. The two numbers diverge whenever the buffer was too
//! small, which [`WindowList::truncated`] exposes; a truncated list is a
//! usable partial answer, not a failure. Counts taken up front are only
//! sizing hints; windows appear and vanish between any two calls.

#[cfg(target_os = "macos")]
use std::ffi::c_int;

#[cfg(target_os = "macos")]
use core_graphics::{
    base::CGError,
    geometry::{CGPoint, CGRect, CGSize},
};
#[cfg(target_os = "macos")]
use tracing::{debug, trace};

use crate::WindowId;
#[cfg(target_os = "macos")]
use crate::{
    connection::{ConnectionId, raw_target},
    error::{Error, Result},
    geom::Rect,
};

#[cfg(target_os = "macos")]
#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGSGetWindowList(
        cid: c_int,
        target_cid: c_int,
        count: c_int,
        list: *mut WindowId,
        out_count: *mut c_int,
    ) -> CGError;
    fn CGSGetOnScreenWindowList(
        cid: c_int,
        target_cid: c_int,
        count: c_int,
        list: *mut WindowId,
        out_count: *mut c_int,
    ) -> CGError;
    fn CGSGetProcessMenuBarWindowList(
        cid: c_int,
        target_cid: c_int,
        count: c_int,
        list: *mut WindowId,
        out_count: *mut c_int,
    ) -> CGError;
    fn CGSGetWindowCount(cid: c_int, target_cid: c_int, out_count: *mut c_int) -> CGError;
    fn CGSGetOnScreenWindowCount(cid: c_int, target_cid: c_int, out_count: *mut c_int) -> CGError;
    fn CGSGetScreenRectForWindow(cid: c_int, wid: WindowId, out_rect: *mut CGRect) -> CGError;
}

/// Result of one list call: the ids that fit the caller's buffer plus the
/// population the server reported at call time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowList {
    /// Ids in server z-order, at most the requested capacity of them.
    pub ids: Vec<WindowId>,
    /// Windows the server knew when it answered; may exceed `ids.len()`.
    pub total: usize,
}

impl WindowList {
    /// True when the server saw more windows than the buffer could hold.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.total > self.ids.len()
    }
}

/// Signature shared by the three raw list calls.
#[cfg(target_os = "macos")]
type RawListFn =
    unsafe extern "C" fn(c_int, c_int, c_int, *mut WindowId, *mut c_int) -> CGError;

#[cfg(target_os = "macos")]
fn fetch_list(
    list_fn: RawListFn,
    what: &str,
    conn: ConnectionId,
    target: Option<ConnectionId>,
    capacity: usize,
) -> Result<WindowList> {
    let cap = capacity.min(c_int::MAX as usize);
    let mut ids: Vec<WindowId> = Vec::with_capacity(cap);
    let mut out_count: c_int = 0;
    // SAFETY: the buffer holds `cap` ids and the server writes at most that
    // many; out_count is valid for a single write.
    let err = unsafe {
        list_fn(
            conn.raw(),
            raw_target(target),
            cap as c_int,
            ids.as_mut_ptr(),
            &mut out_count,
        )
    };
    if err != 0 {
        debug!("{what} failed: CGError {err}");
        return Err(Error::from_cg(err));
    }
    let total = out_count.max(0) as usize;
    // SAFETY: the server filled min(cap, total) entries.
    unsafe { ids.set_len(total.min(cap)) };
    trace!("{what} cap={cap} total={total}");
    Ok(WindowList { ids, total })
}

#[cfg(target_os = "macos")]
fn fetch_count(
    count_fn: unsafe extern "C" fn(c_int, c_int, *mut c_int) -> CGError,
    what: &str,
    conn: ConnectionId,
    target: Option<ConnectionId>,
) -> Result<usize> {
    let mut out_count: c_int = 0;
    // SAFETY: out_count is valid for a single write.
    let err = unsafe { count_fn(conn.raw(), raw_target(target), &mut out_count) };
    if err != 0 {
        debug!("{what} failed: CGError {err}");
        return Err(Error::from_cg(err));
    }
    Ok(out_count.max(0) as usize)
}

/// Every window the server knows, optionally restricted to one owning
/// connection.
#[cfg(target_os = "macos")]
pub fn window_list(
    conn: ConnectionId,
    target: Option<ConnectionId>,
    capacity: usize,
) -> Result<WindowList> {
    fetch_list(CGSGetWindowList, "window_list", conn, target, capacity)
}

/// On-screen windows in z-order, optionally restricted to one owning
/// connection.
#[cfg(target_os = "macos")]
pub fn on_screen_window_list(
    conn: ConnectionId,
    target: Option<ConnectionId>,
    capacity: usize,
) -> Result<WindowList> {
    fetch_list(
        CGSGetOnScreenWindowList,
        "on_screen_window_list",
        conn,
        target,
        capacity,
    )
}

/// Menu bar windows for the target connection's process.
#[cfg(target_os = "macos")]
pub fn menu_bar_window_list(
    conn: ConnectionId,
    target: Option<ConnectionId>,
    capacity: usize,
) -> Result<WindowList> {
    fetch_list(
        CGSGetProcessMenuBarWindowList,
        "menu_bar_window_list",
        conn,
        target,
        capacity,
    )
}

/// Number of windows the server knows for the scope of [`window_list`].
#[cfg(target_os = "macos")]
pub fn window_count(conn: ConnectionId, target: Option<ConnectionId>) -> Result<usize> {
    fetch_count(CGSGetWindowCount, "window_count", conn, target)
}

/// Number of on-screen windows for the scope of [`on_screen_window_list`].
#[cfg(target_os = "macos")]
pub fn on_screen_window_count(conn: ConnectionId, target: Option<ConnectionId>) -> Result<usize> {
    fetch_count(
        CGSGetOnScreenWindowCount,
        "on_screen_window_count",
        conn,
        target,
    )
}

/// Global screen rectangle of a window.
///
/// Any server-side failure collapses to [`crate::Error::NotFound`]: by far
/// the common cause is a window that vanished between enumeration and this
/// call, and callers treat every per-window failure the same way.
#[cfg(target_os = "macos")]
pub fn screen_rect(conn: ConnectionId, id: WindowId) -> Result<Rect> {
    let mut rect = CGRect::new(&CGPoint::new(0.0, 0.0), &CGSize::new(0.0, 0.0));
    // SAFETY: out_rect is valid for a single write.
    let err = unsafe { CGSGetScreenRectForWindow(conn.raw(), id, &mut rect) };
    if err != 0 {
        debug!("screen_rect {id}: CGError {err}");
        return Err(Error::NotFound);
    }
    Ok(Rect::from(rect))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_derived_from_totals() {
        let full = WindowList {
            ids: vec![1, 2, 3],
            total: 3,
        };
        assert!(!full.truncated());

        let clipped = WindowList {
            ids: vec![1, 2, 3],
            total: 9,
        };
        assert!(clipped.truncated());

        let empty = WindowList::default();
        assert!(!empty.truncated());
    }
}
