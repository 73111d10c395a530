//! Core bridge engine
//!
//! The BridgeEngine is responsible for:
//! - Polling the remote protection flag via ProtectionClient
//! - Pushing observed values into the switch's mirrored value
//! - Forwarding user toggles back to the remote service
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐                      ┌──────────────────┐
//! │ ProtectionClient │── poll (15s tick) ──▶│   BridgeEngine   │
//! │  (remote truth)  │◀── set on toggle ────│                  │
//! └──────────────────┘                      └──────────────────┘
//!                                              │            ▲
//!                                       set_on │            │ ToggleEvent
//!                                              ▼            │
//!                                           ┌──────────────────┐
//!                                           │ SwitchAccessory  │
//!                                           │ (mirrored value) │
//!                                           └──────────────────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. Tick fires (fixed period, never overlapping)
//! 2. Fetch remote state; on failure log and wait for the next tick
//! 3. On success push the observed boolean into the mirrored value
//! 4. Independently, toggle events are forwarded to the remote service,
//!    best effort (the mirror already shows the user's intended value)

use crate::error::Result;
use crate::traits::{ProtectionClient, SwitchAccessory, ToggleEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Fixed period between remote status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Capacity of the engine event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by the BridgeEngine for monitoring/logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started,

    /// A poll cycle observed the remote state and updated the mirror
    PollSucceeded {
        enabled: bool,
    },

    /// A poll cycle failed; the mirrored value is unchanged
    PollFailed {
        error: String,
    },

    /// The user toggled the switch
    ToggleReceived {
        on: bool,
    },

    /// A toggle was forwarded to the remote service
    ToggleForwarded {
        on: bool,
    },

    /// Forwarding a toggle failed; the mirror keeps the user's value
    ToggleForwardFailed {
        on: bool,
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Core bridge engine
///
/// The engine owns the reconciliation between the remote flag and the
/// mirrored switch value.
///
/// ## Lifecycle
///
/// 1. Create with [`BridgeEngine::new()`]
/// 2. Start with [`BridgeEngine::run()`]
/// 3. Engine runs until a shutdown signal is received
///
/// ## States
///
/// Idle (waiting for a tick, a toggle, or cancellation) and Polling
/// (in-flight status fetch). Polls never overlap: the ticker is awaited in
/// the same task that performs the fetch, and missed ticks are delayed.
///
/// ## Startup
///
/// The engine does not establish the initial mirrored value. The caller
/// performs one fetch before registering the accessory (a failure there is
/// fatal to startup), so the first tick fires one full period after
/// [`run()`] is called.
pub struct BridgeEngine {
    /// Client for the remote protection flag
    client: Box<dyn ProtectionClient>,

    /// The exposed switch accessory
    switch: Box<dyn SwitchAccessory>,

    /// Period between status polls
    poll_interval: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl BridgeEngine {
    /// Create a new bridge engine with the default poll interval
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields
    /// engine events
    pub fn new(
        client: Box<dyn ProtectionClient>,
        switch: Box<dyn SwitchAccessory>,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        Self::with_poll_interval(client, switch, DEFAULT_POLL_INTERVAL)
    }

    /// Create a new bridge engine with an explicit poll interval
    pub fn with_poll_interval(
        client: Box<dyn ProtectionClient>,
        switch: Box<dyn SwitchAccessory>,
        poll_interval: Duration,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            client,
            switch,
            poll_interval,
            event_tx: tx,
        };

        (engine, rx)
    }

    /// Run the engine
    ///
    /// Runs continuously until SIGINT is received.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine with a controlled shutdown signal
    ///
    /// The daemon uses this to tie the loop to its own signal handling;
    /// tests use it for deterministic shutdown.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(EngineEvent::Started);

        // Watch for user toggles
        let mut toggles = self.switch.watch();

        // The initial value was fetched by the caller before the accessory
        // was registered, so the first tick fires one full period from now.
        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if let Some(mut rx) = shutdown_rx {
            // Controlled mode: wait for the provided shutdown signal
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.poll_once().await;
                    }

                    Some(event) = toggles.next() => {
                        self.handle_toggle(event).await;
                    }

                    _ = &mut rx => {
                        info!("Shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.poll_once().await;
                    }

                    Some(event) = toggles.next() => {
                        self.handle_toggle(event).await;
                    }

                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        info!("Engine stopped");
        Ok(())
    }

    /// Perform one poll cycle
    ///
    /// Fetches the remote state and pushes it into the mirrored value. Any
    /// failure is logged and swallowed; the mirror keeps its last value
    /// until the next successful poll.
    async fn poll_once(&self) {
        match self.client.protection_enabled().await {
            Ok(enabled) => {
                debug!("Poll observed protection enabled: {}", enabled);

                if let Err(e) = self.switch.set_on(enabled).await {
                    warn!("Failed to update mirrored value: {}", e);
                    self.emit_event(EngineEvent::PollFailed {
                        error: e.to_string(),
                    });
                    return;
                }

                self.emit_event(EngineEvent::PollSucceeded { enabled });
            }
            Err(e) => {
                error!("Error checking protection enabled: {}", e);
                self.emit_event(EngineEvent::PollFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    /// Handle a user-driven toggle
    ///
    /// Forwards the new value to the remote service, best effort. The
    /// accessory already reflects the user's intended value; a rejected set
    /// is logged and the mirror stays until the next successful poll.
    async fn handle_toggle(&self, event: ToggleEvent) {
        info!("Switch toggled to {}", event.on);
        self.emit_event(EngineEvent::ToggleReceived { on: event.on });

        match self.client.set_protection_enabled(event.on).await {
            Ok(()) => {
                debug!("Forwarded protection enabled: {}", event.on);
                self.emit_event(EngineEvent::ToggleForwarded { on: event.on });
            }
            Err(e) => {
                error!("Error setting protection enabled: {}", e);
                self.emit_event(EngineEvent::ToggleForwardFailed {
                    on: event.on,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Send event, logging if the channel is full (the consumer is
        // monitoring only; dropping is safe)
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_events_are_comparable() {
        let event = EngineEvent::PollSucceeded { enabled: true };

        let _ = event.clone();
        assert_eq!(event.clone(), event);
        assert_ne!(event, EngineEvent::PollSucceeded { enabled: false });
    }

    #[test]
    fn default_poll_interval_is_fifteen_seconds() {
        assert_eq!(DEFAULT_POLL_INTERVAL, Duration::from_secs(15));
    }
}
