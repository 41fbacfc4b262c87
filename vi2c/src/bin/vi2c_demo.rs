//! vI2C device demo
//!
//! Registers the device, writes `[1, 2, 3]` twice through one session, then
//! reads the store back from several concurrent sessions.
//!
//! Usage: `vi2c_demo [config.json] [readers]`

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vi2c::{Device, DeviceConfig, DeviceError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => DeviceConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => DeviceConfig::default(),
    };
    let readers: usize = args.next().map_or(Ok(3), |n| n.parse())?;

    let device = Arc::new(Device::new(config)?);
    let number = device.register_device();
    println!("Registered {} as {number}", device.config().node_path());

    let writer = device.open()?;
    device.write(writer, &[0x01u8, 0x02, 0x03][..])?;
    device.write(writer, &[0x01u8, 0x02, 0x03][..])?;
    device.close(writer)?;

    let mut tasks = Vec::with_capacity(readers);
    for i in 0..readers {
        let device = Arc::clone(&device);
        tasks.push(tokio::task::spawn_blocking(move || {
            read_all(&format!("r{i}"), &device)
        }));
    }
    for task in tasks {
        task.await??;
    }

    device.deregister_device();
    println!("All readers completed");
    Ok(())
}

fn read_all(name: &str, device: &Device) -> Result<(), DeviceError> {
    let handle = device.open()?;
    let mut data = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        let n = device.read(handle, &mut buf[..])?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }
    device.close(handle)?;

    let used = data.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    println!("({name}) {} bytes, data: {:02x?}", data.len(), &data[..used]);
    Ok(())
}
