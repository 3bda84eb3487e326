//! Background worker that drains the sluice admission queue.
//!
//! Exactly one worker consumes the queue for the lifetime of the process.
//! Each iteration dequeues one event and hands it to an [`EventProcessor`];
//! a failed or panicking processing step is logged and counted, and the loop
//! moves on to the next event.
//!
//! # Lifecycle
//!
//! 1. **Spawn** - [`spawn_worker`] starts the loop on its own tokio task
//! 2. **Drain** - the loop suspends on an empty queue and wakes on enqueue
//! 3. **Stop** - closing the queue lets the loop finish the remaining events
//!    and exit; [`WorkerHandle::shutdown`] does this with a bounded wait
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use sluice_core::{BoundedQueue, RealClock};
//! use sluice_worker::{spawn_worker, SimulatedProcessor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = Arc::new(BoundedQueue::new(100)?);
//! let processor = SimulatedProcessor::new(Arc::new(RealClock), Duration::from_millis(50));
//!
//! let worker = spawn_worker(queue.clone(), Arc::new(processor));
//! // ... hand `queue` to the submission path ...
//! worker.shutdown(Duration::from_secs(10)).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod processor;
pub mod worker;

pub use error::{Result, WorkerError};
pub use processor::{EventProcessor, SimulatedProcessor};
pub use worker::{spawn_worker, EventWorker, WorkerConfig, WorkerHandle, WorkerStats};

/// Default nominal cost of processing one event, in milliseconds.
pub const DEFAULT_PROCESSING_COST_MS: u64 = 50;

/// Default time to wait for the worker to exit after the queue closes.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECONDS: u64 = 10;
