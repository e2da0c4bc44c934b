//! Emulated DMA- and interrupt-capable "echo" device.
//!
//! The device exposes a 64-byte control window ([`regs`]) and 4 KiB of local
//! data memory, moves bulk data with a bounded synchronous DMA engine, and
//! signals its driver over a single explicitly acknowledged interrupt line.
//! The host-side driver lives in the `echodev-driver` crate.
#![forbid(unsafe_code)]

pub mod bar0;
pub mod bar1;
pub mod device;
pub mod dma;
pub mod irq;
pub mod regs;

pub use device::{AccessError, EchoDevice};
pub use dma::{DmaCmd, DmaDirection};
pub use irq::IrqLine;
