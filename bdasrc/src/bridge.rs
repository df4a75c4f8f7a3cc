//! Driver callback to queue bridge.
//!
//! The capture stage invokes the callback on a driver-owned thread, once per
//! sample. The bridge copies the valid bytes and pushes them; it never waits
//! for the consumer and never lets an error or panic escape into the driver.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log::error;

use crate::graph::{Delivery, MediaSample, SampleCallback};
use crate::queue::{CapturedBuffer, EnqueueOutcome, SampleQueue};

/// Producer side of a session's [`SampleQueue`].
#[derive(Clone)]
pub struct DeliveryBridge {
    queue: Arc<SampleQueue>,
}

impl DeliveryBridge {
    pub fn new(queue: Arc<SampleQueue>) -> Self {
        Self { queue }
    }

    /// Copy one sample into the queue.
    pub fn deliver(&self, sample: &dyn MediaSample) -> Delivery {
        let buffer = match sample.buffer() {
            Ok(buffer) => buffer,
            Err(e) => {
                error!("[Bridge] Unable to read sample buffer: {}", e);
                return Delivery::Dropped;
            }
        };

        let len = sample.actual_len().min(buffer.len());
        match self.queue.push(CapturedBuffer::from_slice(&buffer[..len])) {
            EnqueueOutcome::Discarded => Delivery::Dropped,
            EnqueueOutcome::Queued | EnqueueOutcome::Evicted(_) => Delivery::Queued,
        }
    }

    /// Callback suitable for a capture stage.
    pub fn into_callback(self) -> SampleCallback {
        Arc::new(move |sample: &dyn MediaSample| {
            // Unwinding into driver code is undefined.
            match catch_unwind(AssertUnwindSafe(|| self.deliver(sample))) {
                Ok(delivery) => delivery,
                Err(_) => {
                    error!("[Bridge] Panic while delivering a sample");
                    Delivery::Dropped
                }
            }
        })
    }
}
