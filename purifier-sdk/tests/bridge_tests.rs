//! Bridge-level tests against scripted devices
//!
//! Each purifier is backed by a `ScriptedDevice`, so the full stack from the
//! typed handle down to the command resolver runs without a network.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use purifier_sdk::{
    AirQuality, BridgeConfig, ConnectivityState, DeviceConfig, Feature, Mode, Model,
    PropertyName, PropertyValue, PurifierBridge, SdkError, SyncConfig, SyncError,
};
use purifier_state::testing::{ok, unsupported, ScriptedDevice};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

// ============================================================================
// Test Helpers
// ============================================================================

const TOKEN: &str = "00112233445566778899aabbccddeeff";

fn device(name: &str, model: Model) -> DeviceConfig {
    DeviceConfig::new("192.168.1.40", TOKEN, model, name)
}

fn bridge(devices: Vec<DeviceConfig>, scripted: &ScriptedDevice) -> PurifierBridge {
    PurifierBridge::builder()
        .with_sync_config(SyncConfig::default())
        .with_connector(scripted.connector())
        .build(BridgeConfig { devices })
        .unwrap()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Engine logs show up in the output of failing tests
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("purifier_state=debug")
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_lookup_by_name() {
    let scripted = ScriptedDevice::new();
    let bridge = bridge(
        vec![device("Bedroom", Model::M1), device("Hall", Model::V6)],
        &scripted,
    );

    assert_eq!(bridge.len(), 2);
    assert_eq!(bridge.names(), vec!["Bedroom", "Hall"]);
    assert_eq!(bridge.get("Hall").unwrap().model(), Model::V6);
    assert!(matches!(
        bridge.purifier("Kitchen"),
        Err(SdkError::DeviceNotFound(_))
    ));
}

#[test]
fn test_duplicate_names_rejected() {
    let scripted = ScriptedDevice::new();
    let result = PurifierBridge::builder()
        .with_connector(scripted.connector())
        .build(BridgeConfig {
            devices: vec![device("Hall", Model::M1), device("Hall", Model::M2)],
        });
    assert!(matches!(result, Err(SdkError::DuplicateName(_))));
}

#[test]
fn test_invalid_device_rejected() {
    let scripted = ScriptedDevice::new();
    let mut bad = device("Hall", Model::M1);
    bad.token = "short".to_string();

    let result = PurifierBridge::builder()
        .with_connector(scripted.connector())
        .build(BridgeConfig { devices: vec![bad] });
    assert!(matches!(result, Err(SdkError::Sync(SyncError::Config(_)))));
}

// ============================================================================
// Typed handles
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_typed_reads_after_start() {
    init_test_logging();
    let scripted = ScriptedDevice::new();
    scripted.respond(
        "get_prop",
        Ok(json!(["on", "favorite", 8, 224, 45, 91, 14, "on", "off", "on"])),
    );
    let bridge = bridge(vec![device("Bedroom", Model::M1)], &scripted);
    let bedroom = bridge.purifier("Bedroom").unwrap();

    assert!(matches!(
        bedroom.power(),
        Err(SdkError::Sync(SyncError::NotConnected))
    ));

    bridge.start_all();
    settle().await;

    assert_eq!(bedroom.connectivity(), ConnectivityState::Connected);
    assert!(bedroom.power().unwrap());
    assert_eq!(bedroom.mode().unwrap(), Mode::Favorite);
    assert_eq!(bedroom.air_quality().unwrap(), AirQuality::Good);
    assert_eq!(bedroom.pm25_density().unwrap(), 8.0);
    assert_eq!(bedroom.temperature().unwrap(), 22.4);
    assert_eq!(bedroom.humidity().unwrap(), 45);
    assert_eq!(bedroom.filter_life().unwrap(), 91);
    assert_eq!(bedroom.rotation_speed().unwrap(), 100);
    assert!(bedroom.light().unwrap());
    assert!(!bedroom.buzzer().unwrap());
    assert!(bedroom.child_lock().unwrap());

    bridge.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_setters_reach_the_device() {
    init_test_logging();
    let scripted = ScriptedDevice::new();
    scripted.respond(
        "get_prop",
        Ok(json!(["on", "auto", 8, 224, 45, 91, 7, "on", "off", "on"])),
    );
    scripted.respond("set_mode", ok());
    scripted.respond("set_level_favorite", unsupported());
    scripted.respond("set_favorite_level", ok());
    scripted.respond("set_led", ok());

    let bridge = bridge(vec![device("Bedroom", Model::Ma2)], &scripted);
    bridge.start_all();
    settle().await;
    scripted.clear_calls();

    let bedroom = bridge.purifier("Bedroom").unwrap();
    bedroom.set_rotation_speed(50).await.unwrap();
    bedroom.set_light(false).await.unwrap();

    assert_eq!(
        scripted.methods(),
        vec!["set_mode", "set_level_favorite", "set_favorite_level", "set_led"]
    );
    assert_eq!(scripted.calls()[3].params, vec![json!("off")]);

    assert!(matches!(
        bedroom.set_rotation_speed(120).await,
        Err(SdkError::Sync(SyncError::Validation(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_device_does_not_block_others() {
    init_test_logging();
    let reachable = ScriptedDevice::new();
    reachable.respond(
        "get_prop",
        Ok(json!(["off", "idle", 3, 200, 50, 60, 1, 2, "on", "off"])),
    );
    let unreachable = ScriptedDevice::new();
    unreachable.fail_connects(usize::MAX);

    let good = PurifierBridge::builder()
        .with_connector(reachable.connector())
        .build(BridgeConfig {
            devices: vec![device("Hall", Model::V6)],
        })
        .unwrap();
    let bad = PurifierBridge::builder()
        .with_connector(unreachable.connector())
        .build(BridgeConfig {
            devices: vec![device("Attic", Model::V6)],
        })
        .unwrap();

    good.start_all();
    bad.start_all();
    tokio::time::sleep(Duration::from_secs(65)).await;

    let hall = good.purifier("Hall").unwrap();
    assert!(!hall.power().unwrap());
    assert!(!hall.light().unwrap());
    assert_eq!(unreachable.connect_attempts(), 3);
    assert_eq!(
        bad.purifier("Attic").unwrap().connectivity(),
        ConnectivityState::Disconnected
    );

    good.shutdown();
    bad.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_lagged_subscriber_keeps_receiving() {
    init_test_logging();
    let scripted = ScriptedDevice::new();
    scripted.respond(
        "get_prop",
        Ok(json!(["on", "auto", 8, 224, 45, 91, 7, "on", "off", "on"])),
    );
    let bridge = PurifierBridge::builder()
        .with_sync_config(SyncConfig::default().with_event_buffer_size(1))
        .with_connector(scripted.connector())
        .build(BridgeConfig {
            devices: vec![device("Hall", Model::M2)],
        })
        .unwrap();
    let hall = bridge.purifier("Hall").unwrap();
    let mut updates = hall.subscribe();

    bridge.start_all();
    settle().await;
    tokio::time::sleep(Duration::from_secs(15)).await;

    // Two polls into a one-slot channel: the first update was overwritten.
    assert!(matches!(updates.recv().await, Err(RecvError::Lagged(1))));
    let update = updates.recv().await.unwrap();
    assert_eq!(
        update.snapshot.get(PropertyName::Power),
        Some(&PropertyValue::Bool(true))
    );

    scripted.respond(
        "get_prop",
        Ok(json!(["off", "auto", 8, 224, 45, 91, 7, "on", "off", "on"])),
    );
    tokio::time::sleep(Duration::from_secs(15)).await;
    let update = updates.recv().await.unwrap();
    assert_eq!(
        update.snapshot.get(PropertyName::Power),
        Some(&PropertyValue::Bool(false))
    );

    bridge.shutdown();
}

// ============================================================================
// Property-based tests
// ============================================================================

fn flags_strategy() -> impl Strategy<Value = [bool; 6]> {
    prop::array::uniform6(any::<bool>())
}

proptest! {
    /// The exposed feature list is exactly the set of enabled flags, in order
    #[test]
    fn prop_features_follow_flags(flags in flags_strategy()) {
        let mut config = device("Study", Model::M2);
        config.features.temperature = flags[0];
        config.features.humidity = flags[1];
        config.features.air_quality = flags[2];
        config.features.light = flags[3];
        config.features.buzzer = flags[4];
        config.features.child_lock = flags[5];

        let scripted = ScriptedDevice::new();
        let bridge = bridge(vec![config], &scripted);
        let exposed: Vec<Feature> = bridge
            .purifier("Study")
            .unwrap()
            .features()
            .into_iter()
            .map(|f| f.feature)
            .collect();

        let expected: Vec<Feature> = Feature::ALL
            .iter()
            .zip(flags.iter())
            .filter(|(_, enabled)| **enabled)
            .map(|(feature, _)| *feature)
            .collect();
        prop_assert_eq!(exposed, expected);
    }

    /// Display-name overrides win; everything else falls back to "<name> <label>"
    #[test]
    fn prop_display_names(custom in "[A-Za-z][A-Za-z ]{0,15}") {
        let mut config = device("Study", Model::M2);
        config.names.insert(Feature::AirQuality, custom.clone());

        let scripted = ScriptedDevice::new();
        let bridge = bridge(vec![config], &scripted);
        let features = bridge.purifier("Study").unwrap().features();

        for exposed in features {
            if exposed.feature == Feature::AirQuality && !custom.trim().is_empty() {
                prop_assert_eq!(&exposed.display_name, &custom);
            } else {
                prop_assert_eq!(
                    exposed.display_name,
                    format!("Study {}", exposed.feature.default_label())
                );
            }
        }
    }
}

#[test]
fn test_runtime_is_shared_between_handle_clones() {
    let scripted = ScriptedDevice::new();
    let bridge = bridge(vec![device("Hall", Model::V2)], &scripted);
    let a = bridge.purifier("Hall").unwrap().clone();
    let b = bridge.purifier("Hall").unwrap().clone();
    assert!(Arc::ptr_eq(a.runtime(), b.runtime()));
}
