//! The control command set.
//!
//! Commands are a closed enum so dispatch is an exhaustive match rather than
//! a code-indexed handler table; [`IoctlRequest::from_raw`] keeps the numeric
//! boundary for callers that receive commands as integers.

use crate::error::{DriverError, DriverResult};

/// Raw command codes as they cross the process boundary.
pub mod raw {
    pub const GET_ID: u32 = 0x00;
    pub const GET_INV: u32 = 0x01;
    pub const GET_RAND: u32 = 0x02;
    pub const SET_INV: u32 = 0x03;
    pub const IRQ: u32 = 0x04;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlRequest {
    /// Read the ID register.
    GetId,
    /// Read the invert register.
    GetInvert,
    /// Read the random-value register.
    GetRandom,
    /// Write the invert register.
    SetInvert(u32),
    /// Request interrupt assertion.
    RequestIrq,
}

impl IoctlRequest {
    /// Decodes a raw command code and its 32-bit argument. Unknown codes
    /// fail with [`DriverError::InvalidIoctl`].
    pub fn from_raw(cmd: u32, arg: u32) -> DriverResult<Self> {
        match cmd {
            raw::GET_ID => Ok(Self::GetId),
            raw::GET_INV => Ok(Self::GetInvert),
            raw::GET_RAND => Ok(Self::GetRandom),
            raw::SET_INV => Ok(Self::SetInvert(arg)),
            raw::IRQ => Ok(Self::RequestIrq),
            _ => Err(DriverError::InvalidIoctl(cmd)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_known_code() {
        assert_eq!(IoctlRequest::from_raw(raw::GET_ID, 0).unwrap(), IoctlRequest::GetId);
        assert_eq!(
            IoctlRequest::from_raw(raw::SET_INV, 7).unwrap(),
            IoctlRequest::SetInvert(7)
        );
        assert_eq!(IoctlRequest::from_raw(raw::IRQ, 0).unwrap(), IoctlRequest::RequestIrq);
    }

    #[test]
    fn unknown_code_is_invalid_argument() {
        match IoctlRequest::from_raw(0xDEAD, 0) {
            Err(DriverError::InvalidIoctl(0xDEAD)) => {}
            other => panic!("expected InvalidIoctl, got {other:?}"),
        }
    }
}
