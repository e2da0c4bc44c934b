use echodev_device::AccessError;
use thiserror::Error;

use crate::registry::DeviceId;

#[derive(Debug, Error)]
pub enum DriverError {
    /// Open/resolve of an identifier with no registry entry.
    #[error("no such device: {0}")]
    NoSuchDevice(DeviceId),
    /// A raw control command code the driver does not understand.
    #[error("invalid ioctl command {0:#x}")]
    InvalidIoctl(u32),
    /// A register access the device rejected.
    #[error(transparent)]
    Register(#[from] AccessError),
    /// The device flagged ERROR after a transfer the driver believed to be
    /// in bounds.
    #[error("dma engine reported an error for an in-bounds transfer")]
    DmaFault,
}

pub type DriverResult<T> = Result<T, DriverError>;
