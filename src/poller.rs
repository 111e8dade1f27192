//! Fixed-interval polling of the coordinator.

use crate::coordinator::Coordinator;
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};

/// Run refresh cycles forever on a steady cadence. The caller has already
/// run the startup refresh, so the first tick fires after one interval. At
/// most one refresh is in flight at a time; a failed tick keeps the last
/// cached reading and does not change the schedule.
pub fn run_loop(coordinator: &mut Coordinator, interval: Duration) {
    let mut next_tick = Instant::now() + interval;
    loop {
        let now = Instant::now();
        if now < next_tick {
            thread::sleep(next_tick - now);
        }
        next_tick += interval;

        match coordinator.refresh() {
            Ok(()) => log_reading(coordinator),
            Err(e) => warn!("{}: {}", coordinator.provider_name(), e),
        }
    }
}

fn log_reading(coordinator: &Coordinator) {
    if let (Some(value), Some((start, end))) = (coordinator.value(), coordinator.period()) {
        info!(
            "{}: consumption {} m3 over {}..{}",
            coordinator.provider_name(),
            value,
            start,
            end
        );
    }
}
