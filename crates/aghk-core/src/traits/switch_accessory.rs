// # Switch Accessory Trait
//
// Defines the interface for the exposed HomeKit switch: a settable
// mirrored value plus a stream of user-driven toggle events.
//
// ## Implementations
//
// - HAP IP transport: `aghk-hap` crate

use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// A user-driven toggle of the switch (physical button or Home app)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleEvent {
    /// The value the user switched to
    pub on: bool,
}

/// Trait for the exposed switch accessory
///
/// Two interactions only:
/// 1. **set_on()**: the reconciliation loop pushes a newly observed remote
///    value into the mirrored characteristic
/// 2. **watch()**: stream of toggle events delivered by the accessory
///    transport when the user flips the switch
///
/// The mirrored boolean is the only shared mutable state in the system;
/// concurrent set from the poll task and concurrent read by the accessory
/// transport are synchronized inside the accessory library, not here.
///
/// Implementations must not call back into the remote service: pairing,
/// discovery, and network exposure are their whole job.
#[async_trait]
pub trait SwitchAccessory: Send + Sync {
    /// Set the mirrored value shown to the user
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The characteristic was updated
    /// - `Err(Error)`: The accessory transport rejected the update
    async fn set_on(&self, on: bool) -> Result<(), crate::Error>;

    /// Watch for user-driven toggles
    ///
    /// Returns a stream that yields a [`ToggleEvent`] whenever the user
    /// flips the switch. Called exactly once, by the engine.
    ///
    /// # Behavior
    ///
    /// - Must not yield events for values set via [`set_on`]
    /// - Must be cancellation-safe (dropping the stream cleans up)
    fn watch(&self) -> Pin<Box<dyn Stream<Item = ToggleEvent> + Send + 'static>>;
}
