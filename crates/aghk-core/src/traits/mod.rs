//! Trait seams between the core engine and its collaborators
//!
//! The engine talks to the outside world through exactly two traits:
//! - [`ProtectionClient`]: the remote DNS-filtering service
//! - [`SwitchAccessory`]: the locally exposed HomeKit switch

mod protection_client;
mod switch_accessory;

pub use protection_client::ProtectionClient;
pub use switch_accessory::{SwitchAccessory, ToggleEvent};
