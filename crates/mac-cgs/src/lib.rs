//! mac-cgs: typed access to the private CoreGraphics window server (CGS) API.
//!
//! The window server hands every process a connection; all queries here take
//! that connection explicitly. `Connection::acquire` resolves the process
//! default once and yields a [`ConnectionId`] that the per-call wrappers
//! take by value; there is no hidden global and no implicit acquisition.
//!
//! The raw symbols are undocumented and ship with no headers; their
//! declarations stay private to the module that wraps them, and every wrapper
//! returns owned, typed values with CoreFoundation references released. List
//! calls report the server-side population alongside the filled buffer so
//! callers can detect truncation (see [`WindowList`]).
//!
//! The [`ops`] module exposes the same surface behind the
//! [`ops::WindowServer`] trait with a scriptable [`ops::MockWindowServer`],
//! which is also why everything except the live wrappers compiles on
//! non-macOS targets: downstream crates test against the mock anywhere.

mod connection;
mod error;
mod geom;
pub mod ops;
mod properties;
mod spaces;
mod windows;

#[cfg(target_os = "macos")]
mod cfutil;

pub use connection::{Connection, ConnectionId};
pub use error::{Error, Result};
pub use geom::Rect;
pub use properties::PropertyValue;
pub use spaces::{SpaceMask, WindowSpaces};
pub use windows::WindowList;

#[cfg(target_os = "macos")]
pub use properties::{connection_property, set_connection_property};
#[cfg(target_os = "macos")]
pub use spaces::{active_space, spaces_for_windows};
#[cfg(target_os = "macos")]
pub use windows::{
    menu_bar_window_list, on_screen_window_count, on_screen_window_list, screen_rect,
    window_count, window_list,
};

/// Alias for CoreGraphics `CGWindowID` (kCGWindowNumber).
pub type WindowId = u32;

/// Alias for the window server's 64-bit space identifier (`CGSSpaceID`).
pub type SpaceId = u64;
