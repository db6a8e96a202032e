//! Scan for an STM32 telemetry peripheral, subscribe to every notifiable
//! characteristic, and print incoming payloads until Ctrl+C.

use stm32_telemetry_ble::ble::uuids::{characteristic_label, service_label};
use stm32_telemetry_ble::utils::{describe_properties, render_payload};
use stm32_telemetry_ble::{listen, Error, Monitor, Result, Stm32Device};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stm32_telemetry_ble=info".parse().unwrap()),
        )
        .init();

    let monitor = match Monitor::new().await {
        Ok(monitor) => monitor,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("Scanning for STM32 devices...");

    let device = match monitor.find_device().await {
        Ok(device) => device,
        Err(e @ Error::DeviceNotFound { .. }) => {
            println!("Failed to find an STM32 device: {}", e);
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("Found STM32 device: {} ({})", device.name(), device.address());

    // Everything past device selection shares one catch-all.
    if let Err(e) = run(&device).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(device: &Stm32Device) -> Result<()> {
    println!("Connecting to {} ({})...", device.name(), device.address());
    device.connect().await?;
    println!("Connected to {} ({})", device.name(), device.address());

    for service in device.services() {
        match service_label(&service.uuid) {
            Some(label) => println!("Service: {} ({})", service.uuid, label),
            None => println!("Service: {}", service.uuid),
        }

        for characteristic in &service.characteristics {
            let properties = describe_properties(characteristic.properties);
            match characteristic_label(&characteristic.uuid) {
                Some(label) => println!(
                    "  Characteristic: {} ({}), properties: {}",
                    characteristic.uuid, label, properties
                ),
                None => println!(
                    "  Characteristic: {}, properties: {}",
                    characteristic.uuid, properties
                ),
            }
        }
    }

    let subscribed = device.subscribe_notifiable().await?;
    if subscribed == 0 {
        println!("No notifiable characteristics on this device.");
    } else {
        for uuid in device.subscribed_uuids() {
            println!("Subscribed to notifications on {}", uuid);
        }
    }

    println!("Listening for data. Press Ctrl+C to exit.");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    listen(
        device.notifications(),
        |event| {
            println!(
                "Data received from {}: {}",
                event.characteristic_uuid,
                render_payload(&event.data)
            );
        },
        shutdown,
    )
    .await;

    println!("Exiting...");
    device.shutdown().await?;

    Ok(())
}
