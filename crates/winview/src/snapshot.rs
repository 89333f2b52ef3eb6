//! Snapshot assembly: size, fetch, join, absorb the races.

use std::thread;

use mac_cgs::{
    ConnectionId, Error as CgsError, Rect, Result as CgsResult, SpaceId, SpaceMask, WindowId,
    WindowList, WindowSpaces, ops::WindowServer,
};
use tracing::{debug, trace, warn};

use crate::{Result, ViewerCfg, fail};

/// Which window population a snapshot covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Every window the server knows, on screen or not.
    All,
    /// Windows currently composited on screen, front to back.
    OnScreen,
    /// Menu bar windows of the target connection's process.
    MenuBar,
}

/// Selects and scopes the windows a snapshot includes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Filter {
    /// Population to enumerate.
    pub scope: Scope,
    /// Restrict to windows of one connection; `None` means all owners.
    pub target: Option<ConnectionId>,
    /// Space mask for the membership query.
    pub mask: SpaceMask,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            scope: Scope::All,
            target: None,
            mask: SpaceMask::ALL,
        }
    }
}

impl Filter {
    /// On-screen windows, every space, any owner.
    #[must_use]
    pub fn on_screen() -> Self {
        Self {
            scope: Scope::OnScreen,
            ..Self::default()
        }
    }

    /// Menu bar windows. Usually combined with [`Filter::with_target`].
    #[must_use]
    pub fn menu_bar() -> Self {
        Self {
            scope: Scope::MenuBar,
            ..Self::default()
        }
    }

    /// Restrict to windows owned by `target`.
    #[must_use]
    pub fn with_target(mut self, target: ConnectionId) -> Self {
        self.target = Some(target);
        self
    }

    /// Use `mask` for the space membership query.
    #[must_use]
    pub fn with_mask(mut self, mask: SpaceMask) -> Self {
        self.mask = mask;
        self
    }
}

/// One window as seen at snapshot time.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowRecord {
    /// Server-wide window id.
    pub id: WindowId,
    /// Owning connection, known only when the snapshot filtered by one.
    pub owner: Option<ConnectionId>,
    /// Spaces the window belongs to, first-seen order, deduplicated.
    pub spaces: Vec<SpaceId>,
    /// Screen rectangle in global display coordinates.
    pub frame: Rect,
    /// Whether `spaces` contains the active space.
    pub on_active_space: bool,
}

/// Point-in-time result of one compound query.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Records in server z-order, frontmost first.
    pub windows: Vec<WindowRecord>,
    /// Active space at assembly time.
    pub active_space: SpaceId,
    /// True when the population outran the growth loop and `windows` holds
    /// only a prefix of it.
    pub truncated: bool,
}

pub(crate) fn build(
    server: &dyn WindowServer,
    conn: ConnectionId,
    cfg: &ViewerCfg,
    filter: &Filter,
) -> Result<Snapshot> {
    // Size the first fetch. Counts are sizing hints only; the menu bar
    // scope has no count call and starts from slack alone.
    let count = with_retry(cfg, "window count", || count_for(server, conn, filter))
        .map_err(|(err, attempts)| fail(err, attempts, None))?;
    let mut capacity = count + cfg.slack;

    // Fetch, regrowing while the population outruns the buffer.
    let mut list = with_retry(cfg, "window list", || {
        list_for(server, conn, filter, capacity)
    })
    .map_err(|(err, attempts)| fail(err, attempts, None))?;
    let mut regrows = 0;
    while list.truncated() && regrows < cfg.grow_retries {
        capacity = (capacity * 2).max(list.total + cfg.slack);
        debug!(
            "window list truncated ({} of {}); regrowing to {capacity}",
            list.ids.len(),
            list.total
        );
        // Only the first fetch can hard-fail the snapshot; a refetch that
        // keeps failing never erases the ids already in hand.
        match with_retry(cfg, "window list", || {
            list_for(server, conn, filter, capacity)
        }) {
            Ok(refetched) => list = refetched,
            Err((err, _)) => {
                warn!(
                    "window list regrow failed ({err}); keeping the {} ids in hand",
                    list.ids.len()
                );
                break;
            }
        }
        regrows += 1;
    }
    let truncated = list.truncated();
    if truncated {
        warn!(
            "window list still truncated after {regrows} regrows; snapshotting {} of {}",
            list.ids.len(),
            list.total
        );
    }

    let active_space = server.active_space(conn);

    // One membership query for the whole list. Losing it does not erase
    // the ids already in hand; those ship as a partial snapshot.
    let spaces = match with_retry(cfg, "space membership", || {
        server.spaces_for_windows(conn, filter.mask, &list.ids)
    }) {
        Ok(spaces) => spaces,
        Err((err, attempts)) => {
            let windows = assemble(server, conn, filter.target, &list.ids, &[], active_space);
            let partial = (!windows.is_empty()).then(|| {
                Box::new(Snapshot {
                    windows,
                    active_space,
                    truncated,
                })
            });
            return Err(fail(err, attempts, partial));
        }
    };

    let windows = assemble(server, conn, filter.target, &list.ids, &spaces, active_space);
    Ok(Snapshot {
        windows,
        active_space,
        truncated,
    })
}

/// Run `call`, retrying transient failures with doubling backoff.
///
/// Returns the value, or the final error paired with the number of calls
/// made. Only `Unavailable` is retried; the other classes are stable and
/// fail fast.
fn with_retry<T>(
    cfg: &ViewerCfg,
    what: &str,
    mut call: impl FnMut() -> CgsResult<T>,
) -> std::result::Result<T, (CgsError, u32)> {
    let mut delay = cfg.retry_delay;
    let mut attempt: u32 = 1;
    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(err @ CgsError::Unavailable(_)) if attempt < cfg.call_attempts => {
                debug!(
                    "{what} failed (attempt {attempt}/{}): {err}; retrying",
                    cfg.call_attempts
                );
                thread::sleep(delay);
                delay *= 2;
                attempt += 1;
            }
            Err(err) => {
                if matches!(err, CgsError::Unavailable(_)) {
                    warn!("{what} failed {attempt} times: {err}; giving up");
                }
                return Err((err, attempt));
            }
        }
    }
}

fn count_for(server: &dyn WindowServer, conn: ConnectionId, filter: &Filter) -> CgsResult<usize> {
    match filter.scope {
        Scope::All => server.window_count(conn, filter.target),
        Scope::OnScreen => server.on_screen_window_count(conn, filter.target),
        Scope::MenuBar => Ok(0),
    }
}

fn list_for(
    server: &dyn WindowServer,
    conn: ConnectionId,
    filter: &Filter,
    capacity: usize,
) -> CgsResult<WindowList> {
    match filter.scope {
        Scope::All => server.window_list(conn, filter.target, capacity),
        Scope::OnScreen => server.on_screen_window_list(conn, filter.target, capacity),
        Scope::MenuBar => server.menu_bar_window_list(conn, filter.target, capacity),
    }
}

/// Join ids with membership and rects into records, list order preserved.
///
/// `spaces` is aligned with `ids` (one entry per id); an empty slice means
/// membership is unknown and every record gets an empty set. A window whose
/// rect no longer resolves vanished between calls and is dropped.
fn assemble(
    server: &dyn WindowServer,
    conn: ConnectionId,
    owner: Option<ConnectionId>,
    ids: &[WindowId],
    spaces: &[WindowSpaces],
    active_space: SpaceId,
) -> Vec<WindowRecord> {
    let mut windows = Vec::with_capacity(ids.len());
    for (i, &id) in ids.iter().enumerate() {
        let frame = match server.screen_rect(conn, id) {
            Ok(rect) => rect,
            Err(err) => {
                trace!("window {id} vanished mid-snapshot ({err}); dropping");
                continue;
            }
        };
        let membership = spaces.get(i).map(|ws| ws.spaces.clone()).unwrap_or_default();
        let on_active_space = membership.contains(&active_space);
        windows.push(WindowRecord {
            id,
            owner,
            spaces: membership,
            frame,
            on_active_space,
        });
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_everything() {
        let filter = Filter::default();
        assert_eq!(filter.scope, Scope::All);
        assert_eq!(filter.target, None);
        assert_eq!(filter.mask, SpaceMask::ALL);
    }

    #[test]
    fn builders_only_touch_their_field() {
        let filter = Filter::on_screen()
            .with_target(ConnectionId::from_raw(7))
            .with_mask(SpaceMask::ALL_VISIBLE);
        assert_eq!(filter.scope, Scope::OnScreen);
        assert_eq!(filter.target, Some(ConnectionId::from_raw(7)));
        assert_eq!(filter.mask, SpaceMask::ALL_VISIBLE);
        assert_eq!(Filter::menu_bar().scope, Scope::MenuBar);
    }
}
