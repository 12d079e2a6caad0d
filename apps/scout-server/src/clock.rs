//! Decay clock: advances every known user's drive state on a fixed cadence.

use tokio::time::MissedTickBehavior;

use crate::{tasks::TaskHandle, AppState};

pub fn start(state: AppState) -> TaskHandle {
    let interval = state.engine().tick_interval();
    TaskHandle::new(
        "engine.clock",
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                state.engine().tick_now().await;
            }
        }),
    )
}
