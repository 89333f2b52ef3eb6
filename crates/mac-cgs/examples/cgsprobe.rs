//! Probe the window server through the raw query layer.
//!
//! Prints the active space, window populations, and the first few on-screen
//! windows with their space membership and screen rectangles:
//!
//! ```sh
//! cargo run -p mac-cgs --example cgsprobe
//! ```

#[cfg(target_os = "macos")]
fn main() {
    use mac_cgs::{Connection, SpaceMask};

    let conn = match Connection::acquire() {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("cgsprobe: {err}");
            std::process::exit(1);
        }
    };
    let cid = conn.id();
    println!("connection:   {cid}");
    println!("active space: {}", mac_cgs::active_space(cid));

    let total = mac_cgs::window_count(cid, None).unwrap_or(0);
    let on_screen = mac_cgs::on_screen_window_count(cid, None).unwrap_or(0);
    println!("windows:      {total} known, {on_screen} on screen");

    let list = match mac_cgs::on_screen_window_list(cid, None, 16) {
        Ok(list) => list,
        Err(err) => {
            eprintln!("cgsprobe: window list failed: {err}");
            std::process::exit(1);
        }
    };
    if list.truncated() {
        println!("showing {} of {}", list.ids.len(), list.total);
    }
    let spaces = mac_cgs::spaces_for_windows(cid, SpaceMask::ALL, &list.ids).unwrap_or_default();
    for ws in &spaces {
        match mac_cgs::screen_rect(cid, ws.window) {
            Ok(rect) => println!(
                "  {:>8}  spaces {:?}  ({}, {}) {}x{}",
                ws.window, ws.spaces, rect.x, rect.y, rect.w, rect.h
            ),
            Err(err) => println!("  {:>8}  spaces {:?}  rect: {err}", ws.window, ws.spaces),
        }
    }
}

#[cfg(not(target_os = "macos"))]
fn main() {
    eprintln!("cgsprobe talks to the macOS window server and does nothing elsewhere");
}
