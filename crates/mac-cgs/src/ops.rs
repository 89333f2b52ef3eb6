//! Trait abstraction over window server queries to improve testability.
//!
//! [`RealWindowServer`] forwards to the live wrappers; [`MockWindowServer`]
//! is a scriptable in-memory stand-in that honors the same contracts
//! (capacity clipping, per-input space attribution, error taxonomy) so
//! higher layers can be exercised on any platform.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI32, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{
    PropertyValue, Rect, SpaceId, SpaceMask, WindowId, WindowList, WindowSpaces,
    connection::{ConnectionId, raw_target},
    error::{Error, Result},
    spaces::dedup_preserving,
};

/// Window server query surface consumed by higher layers.
pub trait WindowServer: Send + Sync {
    /// Resolve the caller's own connection.
    fn main_connection(&self) -> Result<ConnectionId>;

    /// Read a property of `target` by key.
    fn connection_property(
        &self,
        conn: ConnectionId,
        target: ConnectionId,
        key: &str,
    ) -> Result<PropertyValue>;

    /// Write a property on `target`.
    fn set_connection_property(
        &self,
        conn: ConnectionId,
        target: ConnectionId,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()>;

    /// The space currently visible to the user.
    fn active_space(&self, conn: ConnectionId) -> SpaceId;

    /// Space membership per window: exactly one entry per input id, in
    /// input order, empty set for ids the server no longer knows.
    fn spaces_for_windows(
        &self,
        conn: ConnectionId,
        mask: SpaceMask,
        ids: &[WindowId],
    ) -> Result<Vec<WindowSpaces>>;

    /// Every window, optionally restricted to one owning connection.
    fn window_list(
        &self,
        conn: ConnectionId,
        target: Option<ConnectionId>,
        capacity: usize,
    ) -> Result<WindowList>;

    /// On-screen windows in z-order.
    fn on_screen_window_list(
        &self,
        conn: ConnectionId,
        target: Option<ConnectionId>,
        capacity: usize,
    ) -> Result<WindowList>;

    /// Menu bar windows of the target connection's process.
    fn menu_bar_window_list(
        &self,
        conn: ConnectionId,
        target: Option<ConnectionId>,
        capacity: usize,
    ) -> Result<WindowList>;

    /// Population for the [`WindowServer::window_list`] scope.
    fn window_count(&self, conn: ConnectionId, target: Option<ConnectionId>) -> Result<usize>;

    /// Population for the [`WindowServer::on_screen_window_list`] scope.
    fn on_screen_window_count(
        &self,
        conn: ConnectionId,
        target: Option<ConnectionId>,
    ) -> Result<usize>;

    /// Screen rectangle of one window.
    fn screen_rect(&self, conn: ConnectionId, id: WindowId) -> Result<Rect>;
}

/// Production implementation delegating to the crate wrappers.
#[cfg(target_os = "macos")]
pub struct RealWindowServer;

#[cfg(target_os = "macos")]
impl WindowServer for RealWindowServer {
    fn main_connection(&self) -> Result<ConnectionId> {
        crate::Connection::acquire().map(crate::Connection::id)
    }
    fn connection_property(
        &self,
        conn: ConnectionId,
        target: ConnectionId,
        key: &str,
    ) -> Result<PropertyValue> {
        crate::properties::connection_property(conn, target, key)
    }
    fn set_connection_property(
        &self,
        conn: ConnectionId,
        target: ConnectionId,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()> {
        crate::properties::set_connection_property(conn, target, key, value)
    }
    fn active_space(&self, conn: ConnectionId) -> SpaceId {
        crate::spaces::active_space(conn)
    }
    fn spaces_for_windows(
        &self,
        conn: ConnectionId,
        mask: SpaceMask,
        ids: &[WindowId],
    ) -> Result<Vec<WindowSpaces>> {
        crate::spaces::spaces_for_windows(conn, mask, ids)
    }
    fn window_list(
        &self,
        conn: ConnectionId,
        target: Option<ConnectionId>,
        capacity: usize,
    ) -> Result<WindowList> {
        crate::windows::window_list(conn, target, capacity)
    }
    fn on_screen_window_list(
        &self,
        conn: ConnectionId,
        target: Option<ConnectionId>,
        capacity: usize,
    ) -> Result<WindowList> {
        crate::windows::on_screen_window_list(conn, target, capacity)
    }
    fn menu_bar_window_list(
        &self,
        conn: ConnectionId,
        target: Option<ConnectionId>,
        capacity: usize,
    ) -> Result<WindowList> {
        crate::windows::menu_bar_window_list(conn, target, capacity)
    }
    fn window_count(&self, conn: ConnectionId, target: Option<ConnectionId>) -> Result<usize> {
        crate::windows::window_count(conn, target)
    }
    fn on_screen_window_count(
        &self,
        conn: ConnectionId,
        target: Option<ConnectionId>,
    ) -> Result<usize> {
        crate::windows::on_screen_window_count(conn, target)
    }
    fn screen_rect(&self, conn: ConnectionId, id: WindowId) -> Result<Rect> {
        crate::windows::screen_rect(conn, id)
    }
}

/// Scriptable in-memory window server for tests.
///
/// State sits behind shared handles so clones observe one world. List calls
/// honor the capacity contract exactly: ids are clipped to capacity while
/// the reported total is the scripted population, which makes truncation
/// paths reproducible anywhere. `fail_next_*` arms the next N calls of that
/// family with the configured `CGError` code; `fail_lists_after` instead
/// lets N list calls through and then fails every later one, modeling a
/// server that stops answering mid-sequence.
#[derive(Clone)]
pub struct MockWindowServer {
    calls: Arc<Mutex<Vec<String>>>,
    windows: Arc<Mutex<Vec<WindowId>>>,
    on_screen: Arc<Mutex<Vec<WindowId>>>,
    menu_bar: Arc<Mutex<Vec<WindowId>>>,
    spaces: Arc<Mutex<HashMap<WindowId, Vec<SpaceId>>>>,
    visible_spaces: Arc<Mutex<Vec<SpaceId>>>,
    rects: Arc<Mutex<HashMap<WindowId, Rect>>>,
    properties: Arc<Mutex<HashMap<(i32, String), PropertyValue>>>,
    active: Arc<Mutex<SpaceId>>,
    count_override: Arc<Mutex<Option<usize>>>,
    no_session: Arc<AtomicBool>,
    deny_property_writes: Arc<AtomicBool>,
    list_failures: Arc<Mutex<u32>>,
    lists_until_failure: Arc<Mutex<Option<u32>>>,
    count_failures: Arc<Mutex<u32>>,
    space_failures: Arc<Mutex<u32>>,
    fail_code: Arc<AtomicI32>,
}

impl MockWindowServer {
    /// Fresh mock: one connection, active space 1, empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            windows: Arc::new(Mutex::new(Vec::new())),
            on_screen: Arc::new(Mutex::new(Vec::new())),
            menu_bar: Arc::new(Mutex::new(Vec::new())),
            spaces: Arc::new(Mutex::new(HashMap::new())),
            visible_spaces: Arc::new(Mutex::new(Vec::new())),
            rects: Arc::new(Mutex::new(HashMap::new())),
            properties: Arc::new(Mutex::new(HashMap::new())),
            active: Arc::new(Mutex::new(1)),
            count_override: Arc::new(Mutex::new(None)),
            no_session: Arc::new(AtomicBool::new(false)),
            deny_property_writes: Arc::new(AtomicBool::new(false)),
            list_failures: Arc::new(Mutex::new(0)),
            lists_until_failure: Arc::new(Mutex::new(None)),
            count_failures: Arc::new(Mutex::new(0)),
            space_failures: Arc::new(Mutex::new(0)),
            fail_code: Arc::new(AtomicI32::new(1000)),
        }
    }

    /// Script the full window population, in z-order.
    pub fn set_windows(&self, ids: Vec<WindowId>) {
        *self.windows.lock() = ids;
    }

    /// Script the on-screen subset, in z-order.
    pub fn set_on_screen(&self, ids: Vec<WindowId>) {
        *self.on_screen.lock() = ids;
    }

    /// Script the menu bar window list.
    pub fn set_menu_bar(&self, ids: Vec<WindowId>) {
        *self.menu_bar.lock() = ids;
    }

    /// Script space membership for one window.
    pub fn set_spaces(&self, window: WindowId, spaces: Vec<SpaceId>) {
        self.spaces.lock().insert(window, spaces);
    }

    /// Script which spaces count as visible for `SpaceMask::VISIBLE`
    /// queries.
    pub fn set_visible_spaces(&self, spaces: Vec<SpaceId>) {
        *self.visible_spaces.lock() = spaces;
    }

    /// Script the screen rectangle for one window.
    pub fn set_rect(&self, window: WindowId, rect: Rect) {
        self.rects.lock().insert(window, rect);
    }

    /// Forget a window's rectangle, simulating it vanishing mid-query.
    pub fn remove_rect(&self, window: WindowId) {
        self.rects.lock().remove(&window);
    }

    /// Script the active space.
    pub fn set_active_space(&self, space: SpaceId) {
        *self.active.lock() = space;
    }

    /// Force both count calls to report this population instead of the
    /// scripted list length, modeling count/list divergence.
    pub fn set_count_override(&self, count: Option<usize>) {
        *self.count_override.lock() = count;
    }

    /// Pretend no window server session exists.
    pub fn set_no_session(&self, v: bool) {
        self.no_session.store(v, Ordering::SeqCst);
    }

    /// Refuse property writes, as the server does for foreign connections.
    pub fn set_deny_property_writes(&self, v: bool) {
        self.deny_property_writes.store(v, Ordering::SeqCst);
    }

    /// Fail the next `n` list calls with the configured code.
    pub fn fail_next_lists(&self, n: u32) {
        *self.list_failures.lock() = n;
    }

    /// Let the next `n` list calls succeed, then fail every later one with
    /// the configured code.
    pub fn fail_lists_after(&self, n: u32) {
        *self.lists_until_failure.lock() = Some(n);
    }

    /// Fail the next `n` count calls with the configured code.
    pub fn fail_next_counts(&self, n: u32) {
        *self.count_failures.lock() = n;
    }

    /// Fail the next `n` space queries with the configured code.
    pub fn fail_next_spaces(&self, n: u32) {
        *self.space_failures.lock() = n;
    }

    /// `CGError` code injected failures carry (default 1000).
    pub fn set_fail_code(&self, code: i32) {
        self.fail_code.store(code, Ordering::SeqCst);
    }

    /// True when some recorded call equals `s`.
    #[must_use]
    pub fn calls_contains(&self, s: &str) -> bool {
        self.calls.lock().iter().any(|x| x == s)
    }

    /// Number of recorded calls starting with `prefix`.
    #[must_use]
    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|x| x.starts_with(prefix)).count()
    }

    fn note(&self, s: &str) {
        self.calls.lock().push(s.to_string());
    }

    fn take_failure(&self, counter: &Mutex<u32>) -> Option<Error> {
        let mut remaining = counter.lock();
        if *remaining > 0 {
            *remaining -= 1;
            Some(Error::from_cg(self.fail_code.load(Ordering::SeqCst)))
        } else {
            None
        }
    }

    fn list_failure(&self) -> Option<Error> {
        if let Some(err) = self.take_failure(&self.list_failures) {
            return Some(err);
        }
        match self.lists_until_failure.lock().as_mut() {
            Some(0) => Some(Error::from_cg(self.fail_code.load(Ordering::SeqCst))),
            Some(successes_left) => {
                *successes_left -= 1;
                None
            }
            None => None,
        }
    }

    fn list_from(&self, scoped: &Mutex<Vec<WindowId>>, capacity: usize) -> WindowList {
        let ids = scoped.lock();
        WindowList {
            ids: ids.iter().take(capacity).copied().collect(),
            total: ids.len(),
        }
    }

    fn count_from(&self, scoped: &Mutex<Vec<WindowId>>) -> usize {
        if let Some(n) = *self.count_override.lock() {
            n
        } else {
            scoped.lock().len()
        }
    }
}

impl Default for MockWindowServer {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowServer for MockWindowServer {
    fn main_connection(&self) -> Result<ConnectionId> {
        if self.no_session.load(Ordering::SeqCst) {
            return Err(Error::NoSession);
        }
        Ok(ConnectionId::from_raw(1))
    }
    fn connection_property(
        &self,
        _conn: ConnectionId,
        target: ConnectionId,
        key: &str,
    ) -> Result<PropertyValue> {
        self.note(&format!("get_property {target} {key}"));
        self.properties
            .lock()
            .get(&(target.raw(), key.to_string()))
            .cloned()
            .ok_or(Error::NotFound)
    }
    fn set_connection_property(
        &self,
        _conn: ConnectionId,
        target: ConnectionId,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()> {
        self.note(&format!("set_property {target} {key}"));
        if self.deny_property_writes.load(Ordering::SeqCst) {
            return Err(Error::PermissionDenied);
        }
        self.properties
            .lock()
            .insert((target.raw(), key.to_string()), value.clone());
        Ok(())
    }
    fn active_space(&self, _conn: ConnectionId) -> SpaceId {
        self.note("active_space");
        *self.active.lock()
    }
    fn spaces_for_windows(
        &self,
        _conn: ConnectionId,
        mask: SpaceMask,
        ids: &[WindowId],
    ) -> Result<Vec<WindowSpaces>> {
        self.note(&format!("spaces_for_windows n={}", ids.len()));
        if let Some(err) = self.take_failure(&self.space_failures) {
            return Err(err);
        }
        let scripted = self.spaces.lock();
        let visible = self.visible_spaces.lock();
        let out = ids
            .iter()
            .map(|&window| {
                let mut spaces = scripted.get(&window).cloned().unwrap_or_default();
                if mask.visible_only() {
                    spaces.retain(|s| visible.contains(s));
                }
                WindowSpaces {
                    window,
                    spaces: dedup_preserving(spaces),
                }
            })
            .collect();
        Ok(out)
    }
    fn window_list(
        &self,
        _conn: ConnectionId,
        target: Option<ConnectionId>,
        capacity: usize,
    ) -> Result<WindowList> {
        self.note(&format!(
            "window_list target={} cap={capacity}",
            raw_target(target)
        ));
        if let Some(err) = self.list_failure() {
            return Err(err);
        }
        Ok(self.list_from(&self.windows, capacity))
    }
    fn on_screen_window_list(
        &self,
        _conn: ConnectionId,
        target: Option<ConnectionId>,
        capacity: usize,
    ) -> Result<WindowList> {
        self.note(&format!(
            "on_screen_window_list target={} cap={capacity}",
            raw_target(target)
        ));
        if let Some(err) = self.list_failure() {
            return Err(err);
        }
        Ok(self.list_from(&self.on_screen, capacity))
    }
    fn menu_bar_window_list(
        &self,
        _conn: ConnectionId,
        target: Option<ConnectionId>,
        capacity: usize,
    ) -> Result<WindowList> {
        self.note(&format!(
            "menu_bar_window_list target={} cap={capacity}",
            raw_target(target)
        ));
        if let Some(err) = self.list_failure() {
            return Err(err);
        }
        Ok(self.list_from(&self.menu_bar, capacity))
    }
    fn window_count(&self, _conn: ConnectionId, target: Option<ConnectionId>) -> Result<usize> {
        self.note(&format!("window_count target={}", raw_target(target)));
        if let Some(err) = self.take_failure(&self.count_failures) {
            return Err(err);
        }
        Ok(self.count_from(&self.windows))
    }
    fn on_screen_window_count(
        &self,
        _conn: ConnectionId,
        target: Option<ConnectionId>,
    ) -> Result<usize> {
        self.note(&format!(
            "on_screen_window_count target={}",
            raw_target(target)
        ));
        if let Some(err) = self.take_failure(&self.count_failures) {
            return Err(err);
        }
        Ok(self.count_from(&self.on_screen))
    }
    fn screen_rect(&self, _conn: ConnectionId, id: WindowId) -> Result<Rect> {
        self.note(&format!("screen_rect id={id}"));
        self.rects.lock().get(&id).copied().ok_or(Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn conn() -> ConnectionId {
        ConnectionId::from_raw(1)
    }

    #[test]
    fn no_session_blocks_acquisition() {
        let mock = MockWindowServer::new();
        assert!(mock.main_connection().is_ok());
        mock.set_no_session(true);
        assert_eq!(mock.main_connection(), Err(Error::NoSession));
    }

    #[test]
    fn properties_round_trip_per_target() {
        let mock = MockWindowServer::new();
        let me = conn();
        let other = ConnectionId::from_raw(9);
        let value = PropertyValue::String("anchor".into());

        mock.set_connection_property(me, me, "tag", &value).unwrap();
        assert_eq!(mock.connection_property(me, me, "tag"), Ok(value));
        // Same key under a different target is a different property.
        assert_eq!(
            mock.connection_property(me, other, "tag"),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn denied_property_writes_leave_no_trace() {
        let mock = MockWindowServer::new();
        let me = conn();
        mock.set_deny_property_writes(true);
        assert_eq!(
            mock.set_connection_property(me, me, "tag", &PropertyValue::Bool(true)),
            Err(Error::PermissionDenied)
        );
        assert_eq!(mock.connection_property(me, me, "tag"), Err(Error::NotFound));
    }

    #[test]
    fn space_attribution_keeps_input_order_and_duplicates() {
        let mock = MockWindowServer::new();
        mock.set_spaces(10, vec![1, 2]);
        mock.set_spaces(20, vec![2]);

        let got = mock
            .spaces_for_windows(conn(), SpaceMask::ALL, &[20, 99, 10, 20])
            .unwrap();
        let windows: Vec<_> = got.iter().map(|ws| ws.window).collect();
        assert_eq!(windows, vec![20, 99, 10, 20]);
        assert_eq!(got[0].spaces, vec![2]);
        assert!(got[1].spaces.is_empty());
        assert_eq!(got[2].spaces, vec![1, 2]);
        assert_eq!(got[3].spaces, vec![2]);
    }

    #[test]
    fn scripted_duplicate_spaces_are_deduplicated() {
        let mock = MockWindowServer::new();
        mock.set_spaces(10, vec![5, 3, 5, 3]);
        let got = mock
            .spaces_for_windows(conn(), SpaceMask::ALL, &[10])
            .unwrap();
        assert_eq!(got[0].spaces, vec![5, 3]);
    }

    #[test]
    fn visible_mask_restricts_to_visible_spaces() {
        let mock = MockWindowServer::new();
        mock.set_spaces(10, vec![1, 2, 3]);
        mock.set_visible_spaces(vec![2]);

        let all = mock
            .spaces_for_windows(conn(), SpaceMask::ALL, &[10])
            .unwrap();
        assert_eq!(all[0].spaces, vec![1, 2, 3]);

        let visible = mock
            .spaces_for_windows(conn(), SpaceMask::ALL_VISIBLE, &[10])
            .unwrap();
        assert_eq!(visible[0].spaces, vec![2]);
    }

    #[test]
    fn counts_follow_lists_until_overridden() {
        let mock = MockWindowServer::new();
        mock.set_windows(vec![1, 2, 3]);
        mock.set_on_screen(vec![1]);
        assert_eq!(mock.window_count(conn(), None), Ok(3));
        assert_eq!(mock.on_screen_window_count(conn(), None), Ok(1));

        mock.set_count_override(Some(7));
        assert_eq!(mock.window_count(conn(), None), Ok(7));
        assert_eq!(mock.on_screen_window_count(conn(), None), Ok(7));
    }

    #[test]
    fn injected_failures_are_consumed_in_order() {
        let mock = MockWindowServer::new();
        mock.set_windows(vec![1]);
        mock.fail_next_lists(2);

        assert_eq!(
            mock.window_list(conn(), None, 8),
            Err(Error::Unavailable(1000))
        );
        assert_eq!(
            mock.on_screen_window_list(conn(), None, 8),
            Err(Error::Unavailable(1000))
        );
        assert!(mock.window_list(conn(), None, 8).is_ok());
    }

    #[test]
    fn scheduled_list_failures_start_after_the_successes() {
        let mock = MockWindowServer::new();
        mock.set_windows(vec![1]);
        mock.fail_lists_after(1);

        assert!(mock.window_list(conn(), None, 8).is_ok());
        // The schedule is shared across the list family and stays failing.
        assert_eq!(
            mock.on_screen_window_list(conn(), None, 8),
            Err(Error::Unavailable(1000))
        );
        assert_eq!(
            mock.window_list(conn(), None, 8),
            Err(Error::Unavailable(1000))
        );
    }

    #[test]
    fn injected_failures_classify_through_the_code() {
        let mock = MockWindowServer::new();
        mock.set_fail_code(1010);
        mock.fail_next_spaces(1);
        assert_eq!(
            mock.spaces_for_windows(conn(), SpaceMask::ALL, &[1]),
            Err(Error::PermissionDenied)
        );
    }

    #[test]
    fn unknown_rects_are_not_found() {
        let mock = MockWindowServer::new();
        mock.set_rect(10, Rect::new(0.0, 0.0, 800.0, 600.0));
        assert!(mock.screen_rect(conn(), 10).is_ok());
        assert_eq!(mock.screen_rect(conn(), 11), Err(Error::NotFound));

        mock.remove_rect(10);
        assert_eq!(mock.screen_rect(conn(), 10), Err(Error::NotFound));
    }

    #[test]
    fn call_log_records_queries() {
        let mock = MockWindowServer::new();
        mock.window_list(conn(), Some(ConnectionId::from_raw(5)), 4)
            .unwrap();
        mock.window_list(conn(), None, 4).unwrap();
        assert!(mock.calls_contains("window_list target=5 cap=4"));
        assert_eq!(mock.calls_matching("window_list"), 2);
    }

    #[test]
    fn call_log_covers_rect_and_active_space_queries() {
        let mock = MockWindowServer::new();
        mock.set_rect(10, Rect::new(0.0, 0.0, 8.0, 8.0));

        mock.screen_rect(conn(), 10).unwrap();
        mock.active_space(conn());
        assert!(mock.calls_contains("screen_rect id=10"));
        assert_eq!(mock.calls_matching("screen_rect"), 1);
        assert_eq!(mock.calls_matching("active_space"), 1);
    }

    #[test]
    fn zero_capacity_still_reports_the_population() {
        let mock = MockWindowServer::new();
        mock.set_windows(vec![1, 2, 3, 4, 5]);

        let list = mock.window_list(conn(), None, 0).unwrap();
        assert!(list.ids.is_empty());
        assert_eq!(list.total, 5);
        assert!(list.truncated());
    }

    proptest! {
        #[test]
        fn lists_clip_to_capacity_and_report_totals(total in 0usize..200, cap in 0usize..256) {
            let mock = MockWindowServer::new();
            mock.set_windows((0..total).map(|i| i as WindowId + 1).collect());

            let list = mock.window_list(conn(), None, cap).unwrap();
            prop_assert_eq!(list.ids.len(), total.min(cap));
            prop_assert_eq!(list.total, total);
            prop_assert_eq!(list.truncated(), total > cap);
            // Clipping keeps the head of the z-order, never reorders.
            for (i, id) in list.ids.iter().enumerate() {
                prop_assert_eq!(*id, i as WindowId + 1);
            }
        }
    }
}
