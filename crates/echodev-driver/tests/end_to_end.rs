//! The full attach/open/transfer scenario, driven like the original user
//! tools: bulk writes and reads through the session, raw descriptors
//! through the register surface.

use echodev_device::regs::{REG_DMA_CMD, REG_DMA_CNT, REG_DMA_DST, REG_DMA_SRC};
use echodev_device::{DmaCmd, EchoDevice};
use echodev_driver::DeviceRegistry;
use echodev_memory::Bus;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn write_then_read_roundtrip() {
    init_tracing();
    let registry = DeviceRegistry::new();
    let id = registry.attach(EchoDevice::new());
    let mut session = registry.open(id).unwrap();

    let payload = *b"echo!echo!";
    assert_eq!(session.write(&payload).unwrap(), payload.len());
    assert_eq!(session.offset(), payload.len() as u64);

    session.seek(0);
    let back = session.read(payload.len()).unwrap();
    assert_eq!(back, payload);
}

#[test]
fn oversized_write_near_the_end_is_clamped() {
    init_tracing();
    let registry = DeviceRegistry::new();
    let id = registry.attach(EchoDevice::new());
    let mut session = registry.open(id).unwrap();

    session.seek(4090);
    let big = vec![0xC3u8; 4096];
    assert_eq!(session.write(&big).unwrap(), 6, "only 6 bytes fit before the end");
    assert_eq!(session.offset(), 4096);

    session.seek(4090);
    assert_eq!(session.read(16).unwrap(), vec![0xC3u8; 6]);
}

#[test]
fn raw_descriptor_with_oversized_count_flags_error_and_copies_nothing() {
    init_tracing();
    let registry = DeviceRegistry::new();
    let id = registry.attach(EchoDevice::new());
    let device = registry.resolve(id).unwrap();

    let mut host = Bus::new(8192);
    host.as_mut_slice().fill(0x77);

    let mut dev = device.lock().unwrap();
    for (reg, val) in [(REG_DMA_SRC, 0u64), (REG_DMA_DST, 0), (REG_DMA_CNT, 5000)] {
        dev.mmio_write(reg, val as u32, &mut host).unwrap();
        dev.mmio_write(reg + 4, (val >> 32) as u32, &mut host).unwrap();
    }
    dev.mmio_write(REG_DMA_CMD, DmaCmd::RUN.bits() as u32, &mut host)
        .unwrap();

    let status = DmaCmd::from_bits_retain(u64::from(dev.mmio_read(REG_DMA_CMD).unwrap()));
    assert!(status.contains(DmaCmd::ERROR));
    assert!(status.contains(DmaCmd::DONE));
    assert!(!status.contains(DmaCmd::RUN));
    assert!(dev.local_bytes().iter().all(|&b| b == 0), "local memory unchanged");
}

#[test]
fn two_devices_do_not_share_state() {
    init_tracing();
    let registry = DeviceRegistry::new();
    let a = registry.attach(EchoDevice::new());
    let b = registry.attach(EchoDevice::new());

    let mut sa = registry.open(a).unwrap();
    let mut sb = registry.open(b).unwrap();

    sa.write(b"first").unwrap();
    sb.write(b"second").unwrap();

    sa.seek(0);
    sb.seek(0);
    assert_eq!(sa.read(5).unwrap(), b"first");
    assert_eq!(sb.read(6).unwrap(), b"second");
}
