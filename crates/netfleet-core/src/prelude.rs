/*!
 * Prelude module for netfleet Core.
 *
 * This module re-exports commonly used types and functions from the netfleet Core crate
 * to make them easier to import.
 */

// Re-export error types
pub use crate::error::{Error, Result};

// Re-export core types
pub use crate::types::{Ipv4Interface, Value};

// Re-export config types
pub use crate::config::{Config, ConfigBuilder, OrchestrationConfig, SharedConfig};

// Re-export utility functions
pub use crate::utils::with_timeout;

// Re-export logging macros
pub use tracing::{debug, error, info, trace, warn};

// Re-export core initialization
pub use crate::init;
