//! Connect to a fan from a saved manifest, print what it reports, and
//! optionally change its configuration.
//!
//! ```text
//! cargo run -p purecool-link-sdk --example fan_control -- manifest.json [host] [speed]
//! ```
//!
//! Without `host` the fan is discovered over mDNS. With `speed` (1-10 or
//! `auto`) the fan is switched on at that speed once the first state
//! snapshot arrives. Ctrl-C disconnects.

use std::sync::mpsc;
use std::time::Duration;

use purecool_api::{DeviceDescriptor, FanMode, FanSpeed, StateDelta, StatusMessage};
use purecool_sdk::logging::{init_logging, LoggingMode};
use purecool_sdk::{ConnectionStatus, DirectAddress, Session, SessionConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingMode::Development)?;

    let mut args = std::env::args().skip(1);
    let manifest_path = args.next().ok_or("usage: fan_control <manifest.json> [host] [speed]")?;
    let host = args.next().filter(|h| h != "-");
    let speed = args.next().map(|s| parse_speed(&s)).transpose()?;

    let manifest = std::fs::read_to_string(manifest_path)?;
    let descriptor = DeviceDescriptor::from_manifest(&manifest)?
        .into_iter()
        .find(DeviceDescriptor::is_active)
        .ok_or("manifest lists no active device")?;
    println!("Using {} (product type {})", descriptor, descriptor.product_type());

    let session = Session::builder(descriptor)
        .with_config(SessionConfig::from_env()?)
        .build()?;

    let statuses = session.subscribe_status();
    std::thread::spawn(move || {
        for status in statuses {
            println!("-- {}", status);
            if status == ConnectionStatus::Disconnected {
                break;
            }
        }
    });

    let (first_state_tx, first_state_rx) = mpsc::channel();
    session.add_message_listener(move |message: &StatusMessage| match message {
        StatusMessage::State(state) => {
            println!("{}", state);
            let _ = first_state_tx.send(());
        }
        StatusMessage::Environment(env) => println!(
            "humidity {:?}% temperature {:?}C dust {:?} voc {:?}",
            env.humidity,
            env.temperature_celsius(),
            env.dust,
            env.volatile_compounds
        ),
        StatusMessage::Other { kind } => println!("({})", kind),
    });

    if !session.connect_default(host.map(DirectAddress::new))? {
        println!("Could not connect");
        return Ok(());
    }

    if let Some(speed) = speed {
        if first_state_rx.recv_timeout(Duration::from_secs(10)).is_ok() {
            let delta = StateDelta::new().fan_mode(FanMode::Fan).fan_speed(speed);
            match session.set_configuration(&delta) {
                Some(seq) => println!("Sent configuration #{}", seq),
                None => println!("Configuration not sent"),
            }
        }
    }

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })?;
    let _ = stop_rx.recv();

    session.disconnect();
    Ok(())
}

fn parse_speed(value: &str) -> Result<FanSpeed, String> {
    if value.eq_ignore_ascii_case("auto") {
        return Ok(FanSpeed::Auto);
    }
    value
        .parse::<u8>()
        .ok()
        .and_then(FanSpeed::level)
        .ok_or_else(|| format!("invalid speed {:?}, expected 1-10 or auto", value))
}
