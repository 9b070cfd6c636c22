//! Periodic drivers for an [`EligibilityEngine`].

use {
    crate::engine::{EligibilityEngine, TickOutcome},
    log::*,
    std::{sync::Arc, time::Duration},
    tap_chain::Address,
    tokio::{
        task::JoinHandle,
        time::{interval, MissedTickBehavior},
    },
};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub tick_interval: Duration,
    pub refresh_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// Runs the countdown tick and the periodic refresh for one address as two
/// independent tasks. The first refresh happens immediately.
///
/// Stopping or dropping the poller aborts both tasks and shuts the engine
/// down.
pub struct Poller {
    engine: Arc<EligibilityEngine>,
    tick_task: JoinHandle<()>,
    refresh_task: JoinHandle<()>,
}

impl Poller {
    /// Must be called within a tokio runtime.
    pub fn start(engine: Arc<EligibilityEngine>, address: Address, config: PollerConfig) -> Self {
        info!(
            "watching {address}: tick every {:?}, refresh every {:?}",
            config.tick_interval, config.refresh_interval
        );
        let tick_task = tokio::spawn(run_ticks(engine.clone(), config.tick_interval));
        let refresh_task =
            tokio::spawn(run_refreshes(engine.clone(), address, config.refresh_interval));
        Self {
            engine,
            tick_task,
            refresh_task,
        }
    }

    pub fn engine(&self) -> &Arc<EligibilityEngine> {
        &self.engine
    }

    pub fn stop(self) {
        // Teardown happens in drop.
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.tick_task.abort();
        self.refresh_task.abort();
        self.engine.shutdown();
    }
}

async fn run_ticks(engine: Arc<EligibilityEngine>, period: Duration) {
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of an interval completes immediately.
    ticks.tick().await;
    loop {
        ticks.tick().await;
        if engine.is_shut_down() {
            break;
        }
        if engine.tick_and_reconcile().await == TickOutcome::Expired {
            trace!("countdown expiry reconciled");
        }
    }
}

async fn run_refreshes(engine: Arc<EligibilityEngine>, address: Address, period: Duration) {
    let mut refreshes = interval(period);
    refreshes.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        refreshes.tick().await;
        if engine.is_shut_down() {
            break;
        }
        engine.refresh(address).await;
    }
}
