//! Reconnect supervisor
//!
//! Checks the broker link on a fixed tick and asks it to connect whenever
//! it is found disconnected. Attempts are fire-and-forget: the outcome is
//! read off the link state on a later tick. Consecutive failures stretch
//! the wait between attempts; reaching `Connected` resets it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use crate::broker::{BrokerLink, LinkState};
use crate::config::BridgeSettings;
use crate::utils::wait_for_shutdown;

/// Decides, tick by tick, whether to start a connection attempt.
#[derive(Debug)]
pub struct ReconnectSchedule {
    tick: Duration,
    backoff: Backoff,
    failures: u32,
    attempt_in_flight: bool,
    ticks_to_skip: u32,
}

impl ReconnectSchedule {
    pub fn new(tick: Duration, max: Duration) -> Self {
        Self {
            tick,
            backoff: Backoff {
                first: tick,
                max,
                factor: 2.0,
            },
            failures: 0,
            attempt_in_flight: false,
            ticks_to_skip: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Returns true when this tick should start a connection attempt.
    pub fn on_tick(&mut self, state: LinkState) -> bool {
        match state {
            LinkState::Connected => {
                if self.failures > 0 {
                    info!("broker link recovered after {} failed attempt(s)", self.failures);
                }
                self.failures = 0;
                self.attempt_in_flight = false;
                self.ticks_to_skip = 0;
                false
            }
            LinkState::Connecting => false,
            LinkState::Disconnected => {
                if self.attempt_in_flight {
                    self.attempt_in_flight = false;
                    self.failures += 1;
                    let delay = self.backoff.delay(self.failures - 1);
                    self.ticks_to_skip = self.ticks_for(delay).saturating_sub(1);
                    warn!(
                        failures = self.failures,
                        "broker connection attempt failed, next in {delay:?}"
                    );
                }
                if self.ticks_to_skip > 0 {
                    self.ticks_to_skip -= 1;
                    return false;
                }
                self.attempt_in_flight = true;
                true
            }
        }
    }

    fn ticks_for(&self, delay: Duration) -> u32 {
        let tick = self.tick.as_secs_f64().max(f64::EPSILON);
        let ticks = (delay.as_secs_f64() / tick).ceil();
        if ticks >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            (ticks as u32).max(1)
        }
    }
}

pub struct ReconnectSupervisor {
    link: Arc<BrokerLink>,
    period: Duration,
    schedule: ReconnectSchedule,
}

impl ReconnectSupervisor {
    pub fn new(link: Arc<BrokerLink>, settings: &BridgeSettings) -> Self {
        let period = settings.reconnect_interval();
        Self {
            link,
            period,
            schedule: ReconnectSchedule::new(period, settings.reconnect_max_backoff()),
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }

            if !self.schedule.on_tick(self.link.state()) {
                continue;
            }
            info!("attempting MQTT connection");
            if let Err(e) = self.link.request_connect() {
                debug!("connect request skipped: {e}");
            }
        }
        info!("reconnect supervisor stopped");
    }
}
