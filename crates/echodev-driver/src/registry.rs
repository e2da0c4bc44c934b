//! The driver-side index of attached device instances.
//!
//! One registry object owns its entries behind a single mutex; it is meant
//! to be constructed by whatever layer performs attach and injected where
//! opens happen, not held as ambient process state. Identifiers are assigned
//! monotonically and never reused within the registry's lifetime. Detach
//! removes the entry only: live sessions hold their own reference and remain
//! valid (the entry's device is dropped with its last reference).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use echodev_device::EchoDevice;
use tracing::info;

use crate::error::{DriverError, DriverResult};
use crate::lock;
use crate::session::DeviceSession;

/// Stable identifier for an attached device (the "device number").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(u32);

impl DeviceId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "echodev{}", self.0)
    }
}

/// A device instance shared between the registry and its open sessions.
/// The mutex is the single exclusion scope for that device's register, DMA
/// and local-memory state.
pub type SharedEchoDevice = Arc<Mutex<EchoDevice>>;

#[derive(Default)]
struct Entries {
    devices: BTreeMap<DeviceId, SharedEchoDevice>,
    next_id: u32,
}

#[derive(Default)]
pub struct DeviceRegistry {
    entries: Mutex<Entries>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device and returns its freshly assigned identifier.
    pub fn attach(&self, device: EchoDevice) -> DeviceId {
        let mut entries = lock(&self.entries);
        let id = DeviceId(entries.next_id);
        entries.next_id += 1;
        entries.devices.insert(id, Arc::new(Mutex::new(device)));
        info!(%id, "device attached");
        id
    }

    /// Looks up an identifier. A linear scan would do at expected device
    /// counts; the map is simply what the entries already live in.
    pub fn resolve(&self, id: DeviceId) -> DriverResult<SharedEchoDevice> {
        lock(&self.entries)
            .devices
            .get(&id)
            .cloned()
            .ok_or(DriverError::NoSuchDevice(id))
    }

    /// Removes a device. Sessions opened before the detach keep their
    /// reference; subsequent resolves of `id` fail.
    pub fn detach(&self, id: DeviceId) -> DriverResult<()> {
        let removed = lock(&self.entries).devices.remove(&id);
        match removed {
            Some(_) => {
                info!(%id, "device detached");
                Ok(())
            }
            None => Err(DriverError::NoSuchDevice(id)),
        }
    }

    /// Resolves `id` and binds a new session to the device.
    pub fn open(&self, id: DeviceId) -> DriverResult<DeviceSession> {
        Ok(DeviceSession::new(self.resolve(id)?))
    }

    /// Number of currently attached devices.
    pub fn len(&self) -> usize {
        lock(&self.entries).devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_never_reused() {
        let registry = DeviceRegistry::new();
        let a = registry.attach(EchoDevice::new());
        let b = registry.attach(EchoDevice::new());
        assert_ne!(a, b);

        registry.detach(a).unwrap();
        let c = registry.attach(EchoDevice::new());
        assert_ne!(c, a, "detached identifier must not come back");
        assert_ne!(c, b);
    }

    #[test]
    fn resolve_after_detach_is_not_found() {
        let registry = DeviceRegistry::new();
        let id = registry.attach(EchoDevice::new());
        assert!(registry.resolve(id).is_ok());

        registry.detach(id).unwrap();
        assert!(matches!(
            registry.resolve(id),
            Err(DriverError::NoSuchDevice(gone)) if gone == id
        ));
        assert!(matches!(
            registry.detach(id),
            Err(DriverError::NoSuchDevice(_))
        ));
    }
}
