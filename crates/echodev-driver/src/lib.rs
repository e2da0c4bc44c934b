//! Host-side driver for the emulated echo device.
//!
//! A [`registry::DeviceRegistry`] multiplexes attached
//! [`echodev_device::EchoDevice`] instances behind one identifier space;
//! opening an identifier yields a [`session::DeviceSession`] with the bulk
//! DMA I/O path, a direct [`session::MappedRegion`], control commands, and
//! interrupt service.
#![forbid(unsafe_code)]

pub mod error;
pub mod ioctl;
pub mod registry;
pub mod session;

pub use error::{DriverError, DriverResult};
pub use ioctl::IoctlRequest;
pub use registry::{DeviceId, DeviceRegistry, SharedEchoDevice};
pub use session::{DeviceSession, MappedRegion};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, continuing with the inner state if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
