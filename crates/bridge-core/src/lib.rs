//! Legacy Component Bridge
//!
//! Lets components written against the legacy component model run in a modern
//! dependency-injection container: legacy metadata is rewritten at load time,
//! legacy interceptor lists are driven at call time.
//!
//! # Core Concepts
//!
//! - [`Bridge`]: Facade over both halves, sharing one binding registry
//! - [`BridgeConfig`]: TOML configuration with serde defaults
//! - [`logging::init`]: `tracing` subscriber setup
//!
//! # Example
//!
//! ```rust,no_run
//! use bridge_core::{Bridge, BridgeConfig};
//! use bridge_rewrite::MapTypeSource;
//! # fn factory() -> std::sync::Arc<dyn bridge_dispatch::InstanceFactory> { unimplemented!() }
//!
//! let config = BridgeConfig::load("bridge.toml")?;
//! bridge_core::logging::init(&config.logging)?;
//!
//! let bridge = Bridge::new(config, std::sync::Arc::new(MapTypeSource::new()), factory());
//! # Ok::<(), bridge_core::BridgeError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;

pub use bridge::Bridge;
pub use config::{BridgeConfig, DispatchConfig, ExtensionConfig, LoggingConfig};
pub use error::{BridgeError, Result};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
