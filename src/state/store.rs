//! The process-wide snapshot of latest readings.
//!
//! Only the dispatcher writes; snapshot reads and the registry's welcome
//! messages read concurrently. A write replaces a whole `Reading` while the
//! write lock is held, so readers see either the old or the new value and
//! never a mix of both.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::channel::{Channel, Reading};

/// Latest reading per channel, in the shape clients receive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentData {
    pub solar: Reading,
    pub turbine: Reading,
    pub gps: Reading,
}

impl Default for CurrentData {
    fn default() -> Self {
        Self {
            solar: Channel::Solar.default_reading(),
            turbine: Channel::Turbine.default_reading(),
            gps: Channel::Gps.default_reading(),
        }
    }
}

impl CurrentData {
    pub fn get(&self, channel: Channel) -> &Reading {
        match channel {
            Channel::Solar => &self.solar,
            Channel::Turbine => &self.turbine,
            Channel::Gps => &self.gps,
        }
    }

    fn slot(&mut self, channel: Channel) -> &mut Reading {
        match channel {
            Channel::Solar => &mut self.solar,
            Channel::Turbine => &mut self.turbine,
            Channel::Gps => &mut self.gps,
        }
    }
}

/// Every channel's reading plus broker link health.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub current_data: CurrentData,
    pub broker_connected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<RwLock<StateSnapshot>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A consistent copy of the whole snapshot.
    pub fn snapshot(&self) -> StateSnapshot {
        self.read().clone()
    }

    pub fn get(&self, channel: Channel) -> Reading {
        self.read().current_data.get(channel).clone()
    }

    pub fn broker_connected(&self) -> bool {
        self.read().broker_connected
    }

    /// Replaces a channel's reading wholesale.
    pub fn set(&self, channel: Channel, reading: Reading) {
        *self.write().current_data.slot(channel) = reading;
    }

    /// Applies several replacements under a single write lock.
    pub fn set_many(&self, updates: Vec<(Channel, Reading)>) {
        let mut guard = self.write();
        for (channel, reading) in updates {
            *guard.current_data.slot(channel) = reading;
        }
    }

    pub fn set_broker_connected(&self, connected: bool) {
        self.write().broker_connected = connected;
    }

    // A writer that panicked mid-update cannot leave a partial Reading
    // behind (values are swapped whole), so poisoning is safe to ignore.
    fn read(&self) -> RwLockReadGuard<'_, StateSnapshot> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateSnapshot> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
