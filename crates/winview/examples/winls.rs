//! List windows the way snapshots see them.
//!
//! ```sh
//! cargo run -p winview --example winls
//! ```

#[cfg(target_os = "macos")]
fn main() {
    use std::sync::Arc;

    use winview::{Filter, RealWindowServer, Viewer};

    let viewer = match Viewer::connect(Arc::new(RealWindowServer)) {
        Ok(viewer) => viewer,
        Err(err) => {
            eprintln!("winls: {err}");
            std::process::exit(1);
        }
    };
    println!("active space: {}", viewer.active_space());

    let snap = match viewer.snapshot(&Filter::on_screen()) {
        Ok(snap) => snap,
        Err(err) => {
            eprintln!("winls: {err}");
            std::process::exit(1);
        }
    };
    if snap.truncated {
        println!("(list truncated; showing {} windows)", snap.windows.len());
    }
    for w in &snap.windows {
        let marker = if w.on_active_space { '*' } else { ' ' };
        println!(
            "{marker} {:>8}  spaces {:?}  {}x{} at ({}, {})",
            w.id, w.spaces, w.frame.w, w.frame.h, w.frame.x, w.frame.y
        );
    }
}

#[cfg(not(target_os = "macos"))]
fn main() {
    eprintln!("winls talks to the macOS window server and does nothing elsewhere");
}
