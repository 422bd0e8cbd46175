//! Watch every configured purifier and print its state after each poll
//!
//! Reads the device list from the path given as the first argument, or from
//! the default config location. Logging follows `PURIFIER_LOG_MODE` and
//! `PURIFIER_LOG_LEVEL`.
//!
//! Run with: cargo run -p purifier-sdk --example bridge_demo -- devices.json

use purifier_sdk::{logging, BridgeConfig, Purifier, PurifierBridge, SdkError};
use tokio::sync::broadcast::error::RecvError;

fn print_state(purifier: &Purifier) {
    println!(
        "{:<16} power={:?} mode={:?} aqi={:?} pm2.5={:?} temp={:?} humidity={:?} speed={:?}",
        purifier.name(),
        purifier.power().ok(),
        purifier.mode().ok(),
        purifier.air_quality().ok(),
        purifier.pm25_density().ok(),
        purifier.temperature().ok(),
        purifier.humidity().ok(),
        purifier.rotation_speed().ok(),
    );
}

#[tokio::main]
async fn main() -> Result<(), SdkError> {
    if let Err(e) = logging::init_logging_from_env() {
        eprintln!("Logging disabled: {}", e);
    }

    let config = match std::env::args().nth(1) {
        Some(path) => BridgeConfig::from_path(path)?,
        None => BridgeConfig::load_default()?,
    };

    let bridge = PurifierBridge::from_config(config)?;
    if bridge.is_empty() {
        println!("No purifiers configured");
        return Ok(());
    }

    println!("Watching {} purifiers: {}", bridge.len(), bridge.names().join(", "));
    bridge.start_all();

    for purifier in bridge.purifiers() {
        let purifier = purifier.clone();
        let mut updates = purifier.subscribe();
        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    // A lagged receiver still sees the latest cached state.
                    Ok(_) | Err(RecvError::Lagged(_)) => print_state(&purifier),
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to listen for ctrl-c: {}", e);
    }
    println!("Shutting down");
    bridge.shutdown();
    Ok(())
}
