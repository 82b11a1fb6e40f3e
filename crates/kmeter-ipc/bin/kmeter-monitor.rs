//! Follows a shared level record and logs the levels in dBFS.
//!
//! Usage: `kmeter-monitor <name>`, where `<name>` is the record created by
//! the metering process.

use kmeter_ipc::{CrossBoundaryNotifier, Result};
use std::env;
use std::time::Duration;

const WAIT_TIMEOUT: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let name = env::args().nth(1).unwrap_or_else(|| "meter".to_string());
    let notifier = CrossBoundaryNotifier::open_shared(&name)?;

    let owner = notifier.record().owner();
    tracing::info!(%name, owner, "monitoring level record");

    loop {
        match notifier.wait_snapshot(WAIT_TIMEOUT) {
            Some(snapshot) => {
                let db = snapshot.to_dbfs();
                tracing::info!(
                    "{:7.1} {:7.1} {:7.1} {:7.1} dBFS",
                    db[0],
                    db[1],
                    db[2],
                    db[3]
                );
            }
            None => {
                let alive = notifier
                    .shared_map()
                    .is_some_and(|map| map.producer_alive());
                if !alive {
                    tracing::info!(owner, "producer exited");
                    break;
                }
            }
        }
    }

    Ok(())
}
