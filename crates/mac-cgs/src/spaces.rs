//! Space (virtual desktop) queries.

#[cfg(target_os = "macos")]
use std::ffi::c_int;

use bitflags::bitflags;
#[cfg(target_os = "macos")]
use core_foundation::{
    array::{CFArray, CFArrayRef},
    base::TCFType,
    number::CFNumber,
};
#[cfg(target_os = "macos")]
use tracing::trace;

use crate::{SpaceId, WindowId};
#[cfg(target_os = "macos")]
use crate::{cfutil, connection::ConnectionId, error::Result};

#[cfg(target_os = "macos")]
#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGSGetActiveSpace(cid: c_int) -> SpaceId;
    fn CGSCopySpacesForWindows(cid: c_int, mask: SpaceMask, window_ids: CFArrayRef) -> CFArrayRef;
}

bitflags! {
    /// Selector for which spaces a space query should consider.
    ///
    /// Passed through to the server unchanged; the numeric values are part
    /// of the wire contract.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct SpaceMask: u32 {
        /// Consider the currently active space.
        const INCLUDES_CURRENT = 1 << 0;
        /// Consider spaces other than the active one.
        const INCLUDES_OTHERS = 1 << 1;
        /// Consider user-addressable spaces.
        const INCLUDES_USER = 1 << 2;
        /// Restrict to spaces presently visible on some display.
        const VISIBLE = 1 << 16;

        /// The user's current space.
        const CURRENT = Self::INCLUDES_USER.bits() | Self::INCLUDES_CURRENT.bits();
        /// Other spaces plus the current one, without the user-set
        /// restriction.
        const OTHER = Self::INCLUDES_OTHERS.bits() | Self::INCLUDES_CURRENT.bits();
        /// Every space.
        const ALL = Self::INCLUDES_USER.bits()
            | Self::INCLUDES_OTHERS.bits()
            | Self::INCLUDES_CURRENT.bits();
        /// Every visible space.
        const ALL_VISIBLE = Self::VISIBLE.bits() | Self::ALL.bits();
    }
}

impl SpaceMask {
    /// True when the active space is considered.
    #[must_use]
    pub const fn includes_current(self) -> bool {
        self.contains(Self::INCLUDES_CURRENT)
    }

    /// True when inactive spaces are considered.
    #[must_use]
    pub const fn includes_others(self) -> bool {
        self.contains(Self::INCLUDES_OTHERS)
    }

    /// True when user-addressable spaces are considered.
    #[must_use]
    pub const fn includes_user(self) -> bool {
        self.contains(Self::INCLUDES_USER)
    }

    /// True when the query is restricted to visible spaces.
    #[must_use]
    pub const fn visible_only(self) -> bool {
        self.contains(Self::VISIBLE)
    }
}

impl Default for SpaceMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Space membership for one window, in query order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowSpaces {
    /// The window the entry describes.
    pub window: WindowId,
    /// Spaces the window lies on, deduplicated, first-seen order. Empty for
    /// a window the server no longer knows.
    pub spaces: Vec<SpaceId>,
}

/// Drop repeated space ids while keeping the first occurrence's position.
pub(crate) fn dedup_preserving(ids: Vec<SpaceId>) -> Vec<SpaceId> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// The space currently visible to the user.
///
/// A plain read with no failure mode under a live connection.
#[cfg(target_os = "macos")]
#[must_use]
pub fn active_space(conn: ConnectionId) -> SpaceId {
    // SAFETY: reads server state only.
    unsafe { CGSGetActiveSpace(conn.raw()) }
}

/// Resolve space membership for each window in `ids`.
///
/// Returns exactly one entry per input id, preserving input order,
/// duplicates included. The raw call answers a whole array with one flat,
/// unattributed list, so attribution requires one server round trip per id;
/// this wrapper is the one place that loop lives. A window the server no
/// longer knows yields an empty set rather than an error.
#[cfg(target_os = "macos")]
pub fn spaces_for_windows(
    conn: ConnectionId,
    mask: SpaceMask,
    ids: &[WindowId],
) -> Result<Vec<WindowSpaces>> {
    trace!("spaces_for_windows n={} mask={mask:?}", ids.len());
    let mut out = Vec::with_capacity(ids.len());
    for &window in ids {
        let spaces = copy_spaces_for_window(conn, mask, window);
        out.push(WindowSpaces { window, spaces });
    }
    Ok(out)
}

#[cfg(target_os = "macos")]
fn copy_spaces_for_window(conn: ConnectionId, mask: SpaceMask, window: WindowId) -> Vec<SpaceId> {
    let window_array = cfutil::window_ids_array(&[window]);
    // SAFETY: the input array outlives the call; a non-null result is owned
    // by us per the copy rule.
    let raw = unsafe {
        CGSCopySpacesForWindows(conn.raw(), mask, window_array.as_concrete_TypeRef())
    };
    if raw.is_null() {
        return Vec::new();
    }
    // SAFETY: non-null CFArray of CFNumbers per the ABI; adopt the +1 ref.
    let array: CFArray<CFNumber> = unsafe { CFArray::wrap_under_create_rule(raw) };
    dedup_preserving(cfutil::space_ids_from_array(&array))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_bits_match_the_wire_contract() {
        assert_eq!(SpaceMask::INCLUDES_CURRENT.bits(), 0b1);
        assert_eq!(SpaceMask::INCLUDES_OTHERS.bits(), 0b10);
        assert_eq!(SpaceMask::INCLUDES_USER.bits(), 0b100);
        assert_eq!(SpaceMask::VISIBLE.bits(), 0x1_0000);
        assert_eq!(SpaceMask::CURRENT.bits(), 0b101);
        assert_eq!(SpaceMask::OTHER.bits(), 0b011);
        assert_eq!(SpaceMask::ALL.bits(), 0b111);
        assert_eq!(SpaceMask::ALL_VISIBLE.bits(), 0x1_0007);
    }

    #[test]
    fn mask_predicates() {
        assert!(SpaceMask::ALL.includes_current());
        assert!(SpaceMask::ALL.includes_others());
        assert!(SpaceMask::ALL.includes_user());
        assert!(!SpaceMask::ALL.visible_only());
        assert!(SpaceMask::ALL_VISIBLE.visible_only());
        assert!(!SpaceMask::OTHER.includes_user());
        assert!(SpaceMask::default().includes_user());
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        assert_eq!(dedup_preserving(vec![3, 1, 3, 2, 1, 2]), vec![3, 1, 2]);
        assert_eq!(dedup_preserving(Vec::new()), Vec::<SpaceId>::new());
    }
}
