//! Processing step applied to each dequeued event.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use sluice_core::{Clock, Event};
use tracing::debug;

use crate::error::Result;

/// Handles one event on behalf of the worker loop.
///
/// Implementations may fail; the worker logs the failure and continues with
/// the next event. There is no retry.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    /// Processes a single event.
    async fn process(&self, event: &Event) -> Result<()>;
}

/// Processor standing in for forwarding logic with a fixed nominal cost.
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    clock: Arc<dyn Clock>,
    cost: Duration,
}

impl SimulatedProcessor {
    /// Creates a processor that spends `cost` on every event.
    pub fn new(clock: Arc<dyn Clock>, cost: Duration) -> Self {
        Self { clock, cost }
    }

    /// Returns the per-event cost.
    pub fn cost(&self) -> Duration {
        self.cost
    }
}

#[async_trait]
impl EventProcessor for SimulatedProcessor {
    async fn process(&self, event: &Event) -> Result<()> {
        debug!(
            event_type = %event.event_type,
            cost_ms = u64::try_from(self.cost.as_millis()).unwrap_or(u64::MAX),
            "simulating event workload"
        );
        self.clock.sleep(self.cost).await;
        Ok(())
    }
}
