// # Protection Client Trait
//
// Defines the interface for reading and writing the remote service's
// `protection_enabled` flag.
//
// ## Implementations
//
// - AdGuard Home: `aghk-adguard` crate
//
// ## Usage
//
// ```rust,ignore
// use aghk_core::ProtectionClient;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let client = /* ProtectionClient implementation */;
//
//     let enabled = client.protection_enabled().await?;
//     client.set_protection_enabled(!enabled).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for remote protection-flag clients
///
/// The remote service is the source of truth for the flag; the bridge only
/// holds a mirrored copy on the accessory.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks. The
/// poll loop and the toggle handler may call in concurrently; each call is
/// expected to be an independent request with no shared mutable state.
///
/// # No Retry Logic
///
/// Implementations must not retry or back off. Any failure is returned to
/// the caller: the poll loop logs it and waits for the next tick, the
/// toggle handler logs it and moves on.
#[async_trait]
pub trait ProtectionClient: Send + Sync {
    /// Fetch the current remote protection state
    ///
    /// # Returns
    ///
    /// - `Ok(bool)`: The remote `protection_enabled` value
    /// - `Err(Error)`: Transport failure, authentication failure, non-200
    ///   status, or malformed body
    async fn protection_enabled(&self) -> Result<bool, crate::Error>;

    /// Set the remote protection state
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The remote service accepted the new value
    /// - `Err(Error)`: Transport failure, authentication failure, or
    ///   non-200 status
    async fn set_protection_enabled(&self, enabled: bool) -> Result<(), crate::Error>;
}
