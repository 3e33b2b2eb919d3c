//! Ctrl-C cleanup
//!
//! A named semaphore outlives the process that created it. If the run is
//! interrupted, a dedicated thread (signal-hook's iterator API, so nothing
//! runs in signal context) unlinks the name before exiting.

use std::io;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::warn;

pub fn install_cleanup(semaphore: &str) -> io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let name = semaphore.to_string();

    std::thread::Builder::new()
        .name("approx-pi-signals".to_string())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                warn!(signal = sig, "interrupted, removing semaphore {}", name);
                if let Err(e) = approx_pi::semaphore::unlink(&name) {
                    warn!("failed to unlink {}: {}", name, e);
                }
                std::process::exit(128 + sig);
            }
        })?;
    Ok(())
}
