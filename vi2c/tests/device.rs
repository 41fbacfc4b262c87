//! Integration tests for the device registration layer

#[macro_use]
extern crate hamcrest;
use hamcrest::prelude::*;

use std::sync::Arc;

use vi2c::errno::{EBADF, EFAULT, ENOSPC};
use vi2c::{Device, DeviceConfig, DeviceError, StoreError, UserPtr};

fn device_with_capacity(capacity: usize) -> Device {
    let device = Device::new(DeviceConfig {
        capacity,
        ..DeviceConfig::default()
    })
    .unwrap();
    device.register_device();
    device
}

#[test]
fn test_smoke_write_twice_then_read_back() {
    let device = device_with_capacity(1024);

    let writer = device.open().unwrap();
    assert_that!(device.write(writer, &[1u8, 2, 3][..]).unwrap(), is(equal_to(3)));
    assert_that!(device.write(writer, &[1u8, 2, 3][..]).unwrap(), is(equal_to(3)));
    device.close(writer).unwrap();

    let reader = device.open().unwrap();
    let mut data = vec![0u8; 1024];
    assert_that!(device.read(reader, &mut data).unwrap(), is(equal_to(1024)));
    assert_that!(&data[..6], is(equal_to(&[1u8, 2, 3, 1, 2, 3][..])));
    assert!(data[6..].iter().all(|b| *b == 0));
}

#[test]
fn test_handles_are_independent_cursors() {
    let device = device_with_capacity(1024);
    let s1 = device.open().unwrap();
    device.write(s1, &b"HelloWorld"[..]).unwrap();

    let s2 = device.open().unwrap();
    let mut buf = [0u8; 5];
    device.read(s2, &mut buf[..]).unwrap();
    assert_that!(&buf, is(equal_to(b"Hello")));
    device.read(s2, &mut buf[..]).unwrap();
    assert_that!(&buf, is(equal_to(b"World")));
    assert_that!(device.open_sessions(), is(equal_to(2)));
}

#[test]
fn test_syscall_codes() {
    let device = device_with_capacity(4);
    let handle = device.open().unwrap();

    assert_that!(device.sys_write(handle, &b"abcdef"[..]), is(equal_to(4)));
    assert_that!(
        device.sys_write(handle, &b"g"[..]),
        is(equal_to(-(ENOSPC as isize)))
    );

    let reader = device.open().unwrap();
    assert_that!(
        device.sys_read(reader, &mut UserPtr::null(4)),
        is(equal_to(-(EFAULT as isize)))
    );
    let mut buf = [0u8; 8];
    assert_that!(device.sys_read(reader, &mut buf[..]), is(equal_to(4)));
    assert_that!(device.sys_read(reader, &mut buf[..]), is(equal_to(0)));

    device.close(reader).unwrap();
    assert_that!(
        device.sys_read(reader, &mut buf[..]),
        is(equal_to(-(EBADF as isize)))
    );
}

#[test]
fn test_store_errors_are_wrapped() {
    let device = device_with_capacity(2);
    let handle = device.open().unwrap();
    device.write(handle, &b"xy"[..]).unwrap();

    let err = device.write(handle, &b"z"[..]).unwrap_err();
    assert_eq!(err, DeviceError::Store(StoreError::NoSpace));
    assert_eq!(err.errno(), ENOSPC);
    assert_eq!(err.to_string(), "No space left in store");
}

#[test]
fn test_reregistration_creates_fresh_store() {
    let device = device_with_capacity(16);
    let first = device.device_number().unwrap();

    let handle = device.open().unwrap();
    device.write(handle, &b"old"[..]).unwrap();

    assert!(device.deregister_device());
    assert_that!(device.open_sessions(), is(equal_to(0)));
    assert_eq!(
        device.write(handle, &b"x"[..]),
        Err(DeviceError::BadHandle(handle))
    );
    assert_eq!(device.open(), Err(DeviceError::NotRegistered));

    let second = device.register_device();
    assert_that!(second.major(), is(not(equal_to(first.major()))));
    assert_eq!(device.store().unwrap().snapshot(), vec![0u8; 16]);
    assert_eq!(
        device.read(handle, &mut [0u8; 1][..]),
        Err(DeviceError::BadHandle(handle))
    );
}

#[test]
fn test_stale_handle_cannot_reach_new_session() {
    let device = device_with_capacity(16);
    let old = device.open().unwrap();

    device.deregister_device();
    device.register_device();

    let fresh = device.open().unwrap();
    assert_that!(fresh, is(not(equal_to(old))));

    assert_eq!(
        device.write(old, &b"zz"[..]),
        Err(DeviceError::BadHandle(old))
    );
    assert_eq!(
        device.read(old, &mut [0u8; 4][..]),
        Err(DeviceError::BadHandle(old))
    );
    assert_eq!(device.close(old), Err(DeviceError::BadHandle(old)));

    // the fresh session's cursor has not moved
    let mut buf = [0xFFu8; 2];
    assert_that!(device.read(fresh, &mut buf[..]).unwrap(), is(equal_to(2)));
    assert_that!(&buf, is(equal_to(&[0u8, 0])));
    assert_that!(device.open_sessions(), is(equal_to(1)));
}

#[test]
fn test_closing_keeps_data() {
    let device = device_with_capacity(8);
    for _ in 0..3 {
        let handle = device.open().unwrap();
        device.close(handle).unwrap();
    }
    let writer = device.open().unwrap();
    device.write(writer, &b"data"[..]).unwrap();
    device.close(writer).unwrap();

    let reader = device.open().unwrap();
    let mut buf = [0u8; 4];
    device.read(reader, &mut buf[..]).unwrap();
    assert_that!(&buf, is(equal_to(b"data")));
}

#[test]
fn test_concurrent_sessions_on_threads() {
    let device = Arc::new(device_with_capacity(1024));

    let writer = device.open().unwrap();
    device.write(writer, &vec![0x5Au8; 1024]).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let device = Arc::clone(&device);
            scope.spawn(move || {
                let handle = device.open().unwrap();
                let mut total = 0;
                let mut buf = [0u8; 100];
                loop {
                    let n = device.read(handle, &mut buf[..]).unwrap();
                    if n == 0 {
                        break;
                    }
                    assert!(buf[..n].iter().all(|b| *b == 0x5A));
                    total += n;
                }
                assert_eq!(total, 1024);
                device.close(handle).unwrap();
            });
        }
    });

    assert_that!(device.open_sessions(), is(equal_to(1)));
}

#[test]
fn test_drop_deregisters() {
    let device = device_with_capacity(8);
    let store = device.store().unwrap();
    let mut session = store.open();
    store.write(&mut session, &b"ab"[..]).unwrap();
    drop(device);

    // an outstanding store clone stays valid after the device is gone
    assert_eq!(&store.snapshot()[..2], b"ab");
}
