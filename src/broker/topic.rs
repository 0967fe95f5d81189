use std::collections::HashMap;

use crate::config::TopicSettings;
use crate::state::Channel;

/// Where a broker topic's payload goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The whole payload is the channel's new reading.
    Channel(Channel),
    /// The payload holds `solar` and/or `turbine` sub-objects.
    Combined,
}

/// The fixed set of subscribed topics and their routes.
#[derive(Debug, Clone)]
pub struct TopicMap {
    routes: HashMap<String, Route>,
    ordered: Vec<String>,
}

impl TopicMap {
    pub fn from_settings(topics: &TopicSettings) -> Self {
        let entries = [
            (topics.solar.clone(), Route::Channel(Channel::Solar)),
            (topics.turbine.clone(), Route::Channel(Channel::Turbine)),
            (topics.gps.clone(), Route::Channel(Channel::Gps)),
            (topics.sensor.clone(), Route::Combined),
        ];
        let ordered = entries.iter().map(|(t, _)| t.clone()).collect();
        Self {
            routes: entries.into_iter().collect(),
            ordered,
        }
    }

    pub fn route(&self, topic: &str) -> Option<Route> {
        self.routes.get(topic).copied()
    }

    /// Topics in subscription order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl Default for TopicMap {
    fn default() -> Self {
        Self::from_settings(&TopicSettings::default())
    }
}
