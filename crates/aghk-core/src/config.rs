//! Configuration for the bridge
//!
//! The configuration is a single JSON file selected with the `--config`
//! flag. Required fields are validated at startup, before any network call
//! and before the accessory is registered.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fixed subpath under the home directory for accessory pairing state
const DEFAULT_STORAGE_SUBPATH: &str = ".homecontrol";

/// Default HomeKit pairing PIN
const DEFAULT_HOMEKIT_PIN: &str = "00102003";

/// Bridge configuration
///
/// Immutable after load; owned by the process for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Storage path for HomeKit pairing and accessory state.
    /// Defaults to ~/.homecontrol
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    /// HomeKit pairing PIN. Defaults to 00102003
    #[serde(default = "default_homekit_pin")]
    pub homekit_pin: String,

    /// AdGuard Home URL
    #[serde(default)]
    pub url: String,

    /// AdGuard Home username
    #[serde(default)]
    pub username: String,

    /// AdGuard Home password
    #[serde(default)]
    pub password: String,
}

impl BridgeConfig {
    /// Load the configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            crate::Error::config(format!("cannot open {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_reader(file).map_err(|e| {
            crate::Error::config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Missing required fields are fatal at startup with a descriptive
    /// message.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.is_empty() {
            return Err(crate::Error::config("missing url"));
        }

        if self.username.is_empty() {
            return Err(crate::Error::config("missing username"));
        }

        if self.password.is_empty() {
            return Err(crate::Error::config("missing password"));
        }

        if self.homekit_pin.len() != 8 || !self.homekit_pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(crate::Error::config(format!(
                "homekit_pin must be exactly 8 digits, got {:?}",
                self.homekit_pin
            )));
        }

        Ok(())
    }
}

fn default_storage_path() -> String {
    let home = std::env::var("HOME").unwrap_or_default();
    Path::new(&home)
        .join(DEFAULT_STORAGE_SUBPATH)
        .to_string_lossy()
        .into_owned()
}

fn default_homekit_pin() -> String {
    DEFAULT_HOMEKIT_PIN.to_string()
}
