// # HAP transport
//
// This crate adapts the external `hap` crate (HomeKit Accessory Protocol
// server) to the bridge's `SwitchAccessory` trait.
//
// ## Responsibilities
//
// - Build the single switch accessory (category Switch, fixed name)
// - Seed the initial mirrored value before the transport is exposed
// - Deliver user-driven toggles as a stream of `ToggleEvent`s
// - Own the HAP IP server (pairing PIN and persistence path come from the
//   bridge configuration; pairing, discovery, and wire format are entirely
//   the `hap` crate's job)
//
// ## What this crate does NOT do
//
// - No calls into the remote DNS-filtering service
// - No reconciliation decisions (owned by `BridgeEngine`)
// - No synchronization of the mirrored value beyond what the `hap` crate
//   provides internally

use aghk_core::config::BridgeConfig;
use aghk_core::traits::{SwitchAccessory, ToggleEvent};
use aghk_core::{Error, Result};
use async_trait::async_trait;
use futures::future::FutureExt;
use hap::accessory::switch::SwitchAccessory as Switch;
use hap::accessory::{AccessoryCategory, AccessoryInformation, HapAccessory};
use hap::characteristic::AsyncCharacteristicCallbacks;
use hap::server::{IpServer, Server};
use hap::storage::{FileStorage, Storage};
use hap::{Config as HapConfig, HapType, MacAddress, Pin as HapPin};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// Fixed device label for the exposed accessory
pub const DEVICE_NAME: &str = "AdGuard Home";

/// Accessory instance id of the switch (the only accessory)
const SWITCH_ID: u64 = 1;

/// Stable device id for the bridge
const DEVICE_ID: [u8; 6] = [0xA6, 0x44, 0x71, 0x0A, 0x99, 0x1E];

fn hap_err(e: hap::Error) -> Error {
    Error::accessory(e.to_string())
}

/// The exposed switch, as seen by the engine
///
/// Holds the accessory pointer registered with the HAP server. Setting the
/// mirrored value goes through the server's own synchronization; toggles
/// arrive on a channel fed by the characteristic's remote-update callback.
pub struct HapSwitch {
    /// Pointer to the registered accessory
    accessory: Arc<futures::lock::Mutex<Box<dyn HapAccessory>>>,

    /// Receiver for user-driven toggles, handed to the engine via watch()
    toggle_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<ToggleEvent>>>,

    /// Set while the engine writes the mirrored value, so the update
    /// callback can tell engine writes apart from user toggles
    suppress: Arc<AtomicBool>,
}

impl HapSwitch {
    async fn set_power_state(&self, on: bool) -> Result<()> {
        let mut accessory = self.accessory.lock().await;

        let service = accessory
            .get_mut_service(HapType::Switch)
            .ok_or_else(|| Error::accessory("switch service not found"))?;
        let characteristic = service
            .get_mut_characteristic(HapType::PowerState)
            .ok_or_else(|| Error::accessory("power state characteristic not found"))?;

        characteristic
            .set_value(serde_json::Value::Bool(on))
            .await
            .map_err(hap_err)
    }
}

#[async_trait]
impl SwitchAccessory for HapSwitch {
    async fn set_on(&self, on: bool) -> Result<()> {
        // Engine-driven write: the update callback must not report it as a
        // user toggle
        self.suppress.store(true, Ordering::SeqCst);
        let result = self.set_power_state(on).await;
        self.suppress.store(false, Ordering::SeqCst);
        result
    }

    fn watch(&self) -> Pin<Box<dyn Stream<Item = ToggleEvent> + Send + 'static>> {
        let rx = self
            .toggle_rx
            .lock()
            .expect("toggle receiver lock")
            .take()
            .expect("watch() can only be called once");

        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}

/// The HAP IP transport
///
/// Owns the server; the accessory handle is split off at construction so
/// the engine can hold it independently of the server task.
pub struct HapTransport {
    server: IpServer,
}

impl HapTransport {
    /// Build the transport and the switch accessory
    ///
    /// The mirrored value is seeded with `initial_on` before the server is
    /// started, so the switch is exposed with the remote state already in
    /// place.
    pub async fn new(config: &BridgeConfig, initial_on: bool) -> Result<(Self, HapSwitch)> {
        let mut storage = FileStorage::new(&config.storage_path)
            .await
            .map_err(hap_err)?;

        let hap_config = match storage.load_config().await {
            Ok(mut hap_config) => {
                hap_config.redetermine_local_ip();
                storage.save_config(&hap_config).await.map_err(hap_err)?;
                hap_config
            }
            Err(_) => {
                let hap_config = HapConfig {
                    pin: parse_pin(&config.homekit_pin)?,
                    name: DEVICE_NAME.into(),
                    device_id: MacAddress::new(DEVICE_ID),
                    category: AccessoryCategory::Switch,
                    ..Default::default()
                };
                storage.save_config(&hap_config).await.map_err(hap_err)?;
                hap_config
            }
        };

        let mut switch = Switch::new(
            SWITCH_ID,
            AccessoryInformation {
                name: DEVICE_NAME.into(),
                ..Default::default()
            },
        )
        .map_err(hap_err)?;

        let (toggle_tx, toggle_rx) = mpsc::unbounded_channel();
        let suppress = Arc::new(AtomicBool::new(false));

        let callback_suppress = Arc::clone(&suppress);
        switch.switch.power_state.on_update_async(Some(
            move |current: bool, new: bool| {
                let toggle_tx = toggle_tx.clone();
                let suppress = Arc::clone(&callback_suppress);
                async move {
                    if suppress.load(Ordering::SeqCst) {
                        return Ok(());
                    }

                    tracing::debug!("Power state toggled: {} -> {}", current, new);
                    if toggle_tx.send(ToggleEvent { on: new }).is_err() {
                        tracing::warn!("Toggle receiver dropped, ignoring toggle");
                    }
                    Ok(())
                }
                .boxed()
            },
        ));

        let server = IpServer::new(hap_config, storage).await.map_err(hap_err)?;
        let accessory = server.add_accessory(switch).await.map_err(hap_err)?;

        let hap_switch = HapSwitch {
            accessory,
            toggle_rx: std::sync::Mutex::new(Some(toggle_rx)),
            suppress,
        };

        // Seed the mirror so the accessory never exposes a stale default
        hap_switch.set_on(initial_on).await?;

        Ok((Self { server }, hap_switch))
    }

    /// Run the transport until it fails or the task is stopped
    pub async fn run(self) -> Result<()> {
        tracing::info!("Starting transport");
        self.server.run_handle().await.map_err(hap_err)
    }
}

/// Parse a configured 8-digit PIN into the HAP pairing PIN
fn parse_pin(pin: &str) -> Result<HapPin> {
    if pin.len() != 8 || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::config(format!(
            "homekit_pin must be exactly 8 digits, got {:?}",
            pin
        )));
    }

    let mut digits = [0u8; 8];
    for (i, b) in pin.bytes().enumerate() {
        digits[i] = b - b'0';
    }

    HapPin::new(digits).map_err(|e| Error::config(format!("invalid homekit_pin: {}", e)))
}
