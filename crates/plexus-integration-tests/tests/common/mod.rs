//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use plexus_config::Config;
use plexus_events::{BusConfig, PubSubBus};
use plexus_queue::TaskQueue;
use plexus_store::{ObservableStore, StoreConfig};

/// The coordination services a host shell hands to every widget.
#[derive(Debug, Clone)]
pub struct Shell {
    pub queue: TaskQueue,
    pub bus: PubSubBus,
    pub store: ObservableStore,
}

impl Shell {
    /// Bus and store sharing one queue, default configuration.
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    /// Bus and store sharing one queue, configured from `config`.
    pub fn from_config(config: &Config) -> Self {
        plexus_test::init_test_logging();
        let queue = TaskQueue::new();
        Self {
            bus: PubSubBus::with_config(queue.clone(), BusConfig::from(&config.bus)),
            store: ObservableStore::with_config(queue.clone(), StoreConfig::from(&config.store)),
            queue,
        }
    }

    /// Wait until everything queued so far has run.
    pub async fn settle(&self) {
        self.queue.flush().await.unwrap();
    }
}
