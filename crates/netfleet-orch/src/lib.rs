/*!
 * netfleet Orchestration
 *
 * This crate provides the concurrent fan-out executor and the fleet
 * orchestrator: bulk connection, discovery-protocol configuration, and
 * neighbor/interface collection across a registry of network devices,
 * with per-device failures contained and logged rather than raised.
 */

#![warn(missing_docs)]

pub mod error;
pub mod executor;

mod collect;
mod connect;
mod discovery;
mod orchestrator;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export the caller-facing surface
pub use collect::DeviceNeighbors;
pub use error::{Error, Result};
pub use executor::BoundedExecutor;
pub use orchestrator::FleetOrchestrator;

/// netfleet orchestration crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the orchestration system
pub fn init() -> Result<()> {
    tracing::info!("netfleet Orchestration {} initialized", VERSION);
    Ok(())
}
