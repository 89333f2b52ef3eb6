//! Buffer sizing: truncated fetches, the regrow loop, bounded retries.

use std::{sync::Arc, time::Duration};

use mac_cgs::{Rect, WindowId, ops::MockWindowServer};
use winview::{Error, Viewer, ViewerCfg, WindowServer};

fn viewer_with(mock: &MockWindowServer, cfg: ViewerCfg) -> Viewer {
    Viewer::with_cfg(Arc::new(mock.clone()) as Arc<dyn WindowServer>, cfg).unwrap()
}

fn cfg_fast() -> ViewerCfg {
    ViewerCfg {
        retry_delay: Duration::from_millis(1),
        ..ViewerCfg::default()
    }
}

fn seed(mock: &MockWindowServer, ids: &[WindowId]) {
    mock.set_windows(ids.to_vec());
    mock.set_on_screen(ids.to_vec());
    for &id in ids {
        mock.set_spaces(id, vec![1]);
        mock.set_rect(id, Rect::new(f64::from(id) * 10.0, 0.0, 100.0, 80.0));
    }
}

#[test]
fn growth_loop_recovers_from_a_stale_count() {
    let mock = MockWindowServer::new();
    let ids: Vec<WindowId> = (1..=50).collect();
    seed(&mock, &ids);
    // The count lags far behind the real population.
    mock.set_count_override(Some(2));

    let snap = viewer_with(&mock, ViewerCfg::default())
        .all_windows()
        .unwrap();
    assert_eq!(snap.windows.len(), 50);
    assert!(!snap.truncated);
    assert_eq!(mock.calls_matching("window_list"), 2);
}

#[test]
fn exhausted_growth_ships_a_truncated_prefix() {
    let mock = MockWindowServer::new();
    let ids: Vec<WindowId> = (1..=8).collect();
    seed(&mock, &ids);
    mock.set_count_override(Some(2));
    let cfg = ViewerCfg {
        slack: 0,
        grow_retries: 0,
        ..ViewerCfg::default()
    };

    let snap = viewer_with(&mock, cfg).all_windows().unwrap();
    assert!(snap.truncated);
    let got: Vec<WindowId> = snap.windows.iter().map(|w| w.id).collect();
    assert_eq!(got, vec![1, 2]);
    assert_eq!(mock.calls_matching("window_list"), 1);
}

#[test]
fn regrow_failure_keeps_the_fetched_prefix() {
    let mock = MockWindowServer::new();
    let ids: Vec<WindowId> = (1..=30).collect();
    seed(&mock, &ids);
    mock.set_count_override(Some(2));
    // The first list call lands; the server stops answering before the
    // regrow refetch.
    mock.fail_lists_after(1);

    let snap = viewer_with(&mock, cfg_fast()).all_windows().unwrap();
    assert!(snap.truncated);
    let got: Vec<WindowId> = snap.windows.iter().map(|w| w.id).collect();
    assert_eq!(got, (1..=18).collect::<Vec<WindowId>>());
    // The prefix ships as a full snapshot: membership and rects resolved.
    assert_eq!(snap.windows[0].spaces, vec![1]);
    assert_eq!(mock.calls_matching("screen_rect"), 18);
    // One fetch plus the exhausted refetch attempts, then no more regrows.
    assert_eq!(mock.calls_matching("window_list"), 4);
}

#[test]
fn shrinking_population_is_not_truncation() {
    let mock = MockWindowServer::new();
    seed(&mock, &[1, 2]);
    // The count saw windows that closed before the list call.
    mock.set_count_override(Some(40));

    let snap = viewer_with(&mock, ViewerCfg::default())
        .all_windows()
        .unwrap();
    assert_eq!(snap.windows.len(), 2);
    assert!(!snap.truncated);
    assert_eq!(mock.calls_matching("window_list"), 1);
}

#[test]
fn count_failures_exhaust_to_hard_unavailable() {
    let mock = MockWindowServer::new();
    seed(&mock, &[1]);
    mock.fail_next_counts(3);

    let err = viewer_with(&mock, cfg_fast()).all_windows().unwrap_err();
    assert_eq!(
        err,
        Error::Unavailable {
            code: 1000,
            attempts: 3,
            partial: None
        }
    );
    assert_eq!(mock.calls_matching("window_count"), 3);
}

#[test]
fn transient_count_failure_recovers() {
    let mock = MockWindowServer::new();
    seed(&mock, &[1]);
    mock.fail_next_counts(2);

    let snap = viewer_with(&mock, cfg_fast()).all_windows().unwrap();
    assert_eq!(snap.windows.len(), 1);
    assert_eq!(mock.calls_matching("window_count"), 3);
}

#[test]
fn list_failures_exhaust_to_hard_unavailable() {
    let mock = MockWindowServer::new();
    seed(&mock, &[1]);
    mock.fail_next_lists(3);

    let err = viewer_with(&mock, cfg_fast()).all_windows().unwrap_err();
    assert!(matches!(
        err,
        Error::Unavailable {
            attempts: 3,
            partial: None,
            ..
        }
    ));
    assert_eq!(mock.calls_matching("window_list"), 3);
}

#[test]
fn transient_list_failure_recovers() {
    let mock = MockWindowServer::new();
    seed(&mock, &[1]);
    mock.fail_next_lists(1);

    let snap = viewer_with(&mock, cfg_fast()).all_windows().unwrap();
    assert_eq!(snap.windows.len(), 1);
    assert_eq!(mock.calls_matching("window_list"), 2);
}
