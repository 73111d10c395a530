// # aghk-core
//
// Core library for the AdGuard Home HomeKit bridge.
//
// ## Architecture Overview
//
// This library provides the core functionality for the bridge:
// - **ProtectionClient**: Trait for reading and writing the remote
//   `protection_enabled` flag
// - **SwitchAccessory**: Trait for the exposed HomeKit switch (mirrored
//   value + user toggle events)
// - **BridgeEngine**: Reconciliation loop between the two
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from the HTTP and
//    HomeKit implementations
// 2. **Event-Driven**: Toggle events arrive as an async stream; polling is
//    a single non-overlapping ticker
// 3. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod engine;
pub mod error;
pub mod traits;

// Re-export core types for convenience
pub use config::BridgeConfig;
pub use engine::BridgeEngine;
pub use error::{Error, Result};
pub use traits::{ProtectionClient, SwitchAccessory, ToggleEvent};
