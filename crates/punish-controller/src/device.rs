//! Delivery of intensity commands to the haptic device.
//!
//! The controller must never wait on the device, but commands still have to
//! reach it in the order they were decided. [`DeviceLink`] queues values on
//! an unbounded channel drained by one background task that awaits each
//! acknowledgement before sending the next.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use punish_core::error::DeviceError;
use punish_core::traits::DeviceDriver;

/// Non-blocking, ordered sender of intensity commands.
#[derive(Debug)]
pub struct DeviceLink {
    tx: mpsc::UnboundedSender<u32>,
    task: JoinHandle<()>,
}

impl DeviceLink {
    /// Spawn the forwarding task on the current tokio runtime.
    pub fn spawn(driver: Arc<dyn DeviceDriver>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
        let task = tokio::spawn(async move {
            while let Some(value) = rx.recv().await {
                match driver.set_intensity(value).await {
                    Ok(()) => debug!(intensity = value, "device acknowledged"),
                    Err(e) => warn!(intensity = value, error = %e, "device command failed"),
                }
            }
            debug!("device link closed");
        });
        Self { tx, task }
    }

    /// Queue an intensity command. Never blocks.
    pub fn send(&self, value: u32) {
        if self.tx.send(value).is_err() {
            warn!(intensity = value, "device link is gone; command dropped");
        }
    }

    /// Stop accepting commands and wait until every queued one has been
    /// handed to the driver.
    pub async fn close(self) {
        let Self { tx, task } = self;
        drop(tx);
        if let Err(e) = task.await {
            warn!(error = %e, "device link task ended abnormally");
        }
    }
}

/// Device that only logs what it is told. Used when no hardware is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDevice;

#[async_trait]
impl DeviceDriver for TracingDevice {
    async fn set_intensity(&self, value: u32) -> Result<(), DeviceError> {
        info!(intensity = value, "device intensity set");
        Ok(())
    }
}
