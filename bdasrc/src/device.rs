//! Device discovery.
//!
//! Tuner hardware and auxiliary driver stages are reached through a
//! [`DeviceDirectory`]: category based enumeration returning monikers, and
//! binding a moniker to a live [`ProcessingStage`]. [`DeviceDiscovery`]
//! selects a device by ordinal and wraps it in a [`DeviceHandle`] that
//! releases the hardware when dropped.

use std::sync::Arc;

use bdasrc_types::DeviceCategory;
use log::{debug, info};
use thiserror::Error;

use crate::graph::ProcessingStage;

/// Errors reported by a device directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    #[error("Device '{0}' is busy")]
    Busy(String),

    #[error("Unable to bind '{name}': {reason}")]
    Bind { name: String, reason: String },
}

/// Enumerated, not yet bound, device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMoniker {
    pub category: DeviceCategory,
    /// Position in the enumeration.
    pub index: usize,
    /// Driver path of the device.
    pub display_name: String,
    /// Friendly name, `None` when it could not be read.
    pub friendly_name: Option<String>,
}

impl DeviceMoniker {
    /// Friendly name, falling back to the display name.
    pub fn label(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.display_name)
    }
}

/// Category based device enumeration and binding.
pub trait DeviceDirectory: Send + Sync {
    /// Enumerate the devices registered under `category`.
    ///
    /// The order is stable within one process run.
    fn enumerate(&self, category: DeviceCategory) -> Result<Vec<DeviceMoniker>, DirectoryError>;

    /// Bind a moniker to its stage, acquiring the underlying hardware.
    fn bind(&self, moniker: &DeviceMoniker) -> Result<Arc<dyn ProcessingStage>, DirectoryError>;
}

/// Discovery errors.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("No {0} devices found")]
    NoDevices(DeviceCategory),

    #[error("No {category} device at index {index} ({available} available)")]
    NotFound {
        category: DeviceCategory,
        index: usize,
        available: usize,
    },

    #[error("Unable to enumerate {category} devices: {source}")]
    Enumeration {
        category: DeviceCategory,
        #[source]
        source: DirectoryError,
    },

    #[error("Unable to bind device: {0}")]
    Bind(#[source] DirectoryError),
}

/// A bound tuner device.
///
/// Holds the device's stage; the hardware is released once the handle and
/// every graph holding the stage are gone.
pub struct DeviceHandle {
    moniker: DeviceMoniker,
    stage: Arc<dyn ProcessingStage>,
}

impl DeviceHandle {
    /// Friendly name, empty when the device did not report one.
    pub fn name(&self) -> &str {
        self.moniker.friendly_name.as_deref().unwrap_or("")
    }

    pub fn moniker(&self) -> &DeviceMoniker {
        &self.moniker
    }

    /// The device's stage.
    pub fn stage(&self) -> &Arc<dyn ProcessingStage> {
        &self.stage
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("moniker", &self.moniker)
            .finish()
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        debug!("[Device] Releasing '{}'", self.moniker.label());
    }
}

/// Ordinal device selection over a [`DeviceDirectory`].
#[derive(Clone)]
pub struct DeviceDiscovery {
    directory: Arc<dyn DeviceDirectory>,
}

impl DeviceDiscovery {
    pub fn new(directory: Arc<dyn DeviceDirectory>) -> Self {
        Self { directory }
    }

    /// The underlying directory.
    pub fn directory(&self) -> &Arc<dyn DeviceDirectory> {
        &self.directory
    }

    /// Enumerate the devices of a category.
    pub fn enumerate(&self, category: DeviceCategory) -> Result<Vec<DeviceMoniker>, DiscoveryError> {
        self.directory
            .enumerate(category)
            .map_err(|source| DiscoveryError::Enumeration { category, source })
    }

    /// Bind the `index`-th device (0-based) of a category.
    pub fn bind_at(
        &self,
        category: DeviceCategory,
        index: usize,
    ) -> Result<DeviceHandle, DiscoveryError> {
        let monikers = self.enumerate(category)?;
        if monikers.is_empty() {
            return Err(DiscoveryError::NoDevices(category));
        }

        let available = monikers.len();
        let moniker = monikers
            .into_iter()
            .nth(index)
            .ok_or(DiscoveryError::NotFound {
                category,
                index,
                available,
            })?;

        let stage = self
            .directory
            .bind(&moniker)
            .map_err(DiscoveryError::Bind)?;

        info!(
            "[Device] Bound {} #{}: '{}'",
            category,
            index,
            moniker.label()
        );
        Ok(DeviceHandle { moniker, stage })
    }
}
