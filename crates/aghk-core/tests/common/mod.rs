//! Test doubles and common utilities for engine contract tests
//!
//! This module provides minimal test doubles that verify the engine's
//! reconciliation behavior without any real HTTP or HomeKit transport.

use aghk_core::engine::EngineEvent;
use aghk_core::error::{Error, Result};
use aghk_core::traits::{ProtectionClient, SwitchAccessory, ToggleEvent};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// A mock ProtectionClient with scripted get responses and recorded sets
pub struct MockProtectionClient {
    /// Scripted responses for protection_enabled(); when exhausted, the
    /// default value is returned
    get_script: Arc<std::sync::Mutex<VecDeque<std::result::Result<bool, String>>>>,
    /// Value returned once the script is exhausted
    default_enabled: bool,
    /// Call counter for protection_enabled()
    get_call_count: Arc<AtomicUsize>,
    /// Recorded values from set_protection_enabled() calls
    set_calls: Arc<std::sync::Mutex<Vec<bool>>>,
    /// When true, set_protection_enabled() fails
    fail_sets: Arc<AtomicBool>,
}

impl MockProtectionClient {
    pub fn new(default_enabled: bool) -> Self {
        Self {
            get_script: Arc::new(std::sync::Mutex::new(VecDeque::new())),
            default_enabled,
            get_call_count: Arc::new(AtomicUsize::new(0)),
            set_calls: Arc::new(std::sync::Mutex::new(Vec::new())),
            fail_sets: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue a scripted response for the next protection_enabled() call
    pub fn script_get(&self, response: std::result::Result<bool, &str>) {
        self.get_script
            .lock()
            .unwrap()
            .push_back(response.map_err(String::from));
    }

    /// Handle to the get call counter (survives moving the client into the engine)
    pub fn get_call_count_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.get_call_count)
    }

    /// Handle to the recorded set values
    pub fn set_calls_handle(&self) -> Arc<std::sync::Mutex<Vec<bool>>> {
        Arc::clone(&self.set_calls)
    }

    /// Handle to the set-failure flag
    pub fn fail_sets_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_sets)
    }
}

#[async_trait::async_trait]
impl ProtectionClient for MockProtectionClient {
    async fn protection_enabled(&self) -> Result<bool> {
        self.get_call_count.fetch_add(1, Ordering::SeqCst);

        match self.get_script.lock().unwrap().pop_front() {
            Some(Ok(enabled)) => Ok(enabled),
            Some(Err(msg)) => Err(Error::http(msg)),
            None => Ok(self.default_enabled),
        }
    }

    async fn set_protection_enabled(&self, enabled: bool) -> Result<()> {
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(Error::protocol("unexpected status code: 500"));
        }

        self.set_calls.lock().unwrap().push(enabled);
        Ok(())
    }
}

/// A mock SwitchAccessory that records mirrored values and lets the test
/// inject user toggles
pub struct MockSwitch {
    /// Recorded values from set_on() calls
    values: Arc<std::sync::Mutex<Vec<bool>>>,
    /// Receiver for the engine's watch stream
    toggle_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<ToggleEvent>>>,
    /// Call counter for watch()
    watch_call_count: Arc<AtomicUsize>,
}

impl MockSwitch {
    /// Create a new mock switch
    ///
    /// Returns the switch and a sender the test uses to simulate user
    /// toggles.
    pub fn new() -> (Self, mpsc::UnboundedSender<ToggleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let switch = Self {
            values: Arc::new(std::sync::Mutex::new(Vec::new())),
            toggle_rx: std::sync::Mutex::new(Some(rx)),
            watch_call_count: Arc::new(AtomicUsize::new(0)),
        };

        (switch, tx)
    }

    /// Handle to the recorded mirrored values
    pub fn values_handle(&self) -> Arc<std::sync::Mutex<Vec<bool>>> {
        Arc::clone(&self.values)
    }

    /// Handle to the watch call counter
    pub fn watch_call_count_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.watch_call_count)
    }
}

#[async_trait::async_trait]
impl SwitchAccessory for MockSwitch {
    async fn set_on(&self, on: bool) -> Result<()> {
        self.values.lock().unwrap().push(on);
        Ok(())
    }

    fn watch(&self) -> Pin<Box<dyn Stream<Item = ToggleEvent> + Send + 'static>> {
        self.watch_call_count.fetch_add(1, Ordering::SeqCst);

        // Take the receiver (only called once)
        let rx = self
            .toggle_rx
            .lock()
            .unwrap()
            .take()
            .expect("watch() can only be called once");

        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}

/// Receive the next engine event, skipping the initial Started marker
pub async fn next_event(rx: &mut mpsc::Receiver<EngineEvent>) -> EngineEvent {
    loop {
        let event = tokio::time::timeout(std::time::Duration::from_secs(60), rx.recv())
            .await
            .expect("timed out waiting for engine event")
            .expect("event channel closed");

        if event != EngineEvent::Started {
            return event;
        }
    }
}
