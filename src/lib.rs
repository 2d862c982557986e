//! # Helion - Local TCP Monitor for Felicity Solar Inverters
//!
//! A Rust implementation of a local poller for Felicity hybrid inverters,
//! talking directly to the inverter's WiFi dongle over TCP without any cloud
//! dependency.
//!
//! ## Features
//!
//! - **Local Only**: Plain TCP to the dongle, no vendor cloud account
//! - **Tolerant Parsing**: Heuristic recovery of JSON fragments from noisy,
//!   unframed responses
//! - **Derived Values**: ~100 mapped fields with firmware-aware PV layout
//!   detection
//! - **Glitch Filtering**: Suppresses implausible daily energy counter spikes
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `client`: TCP transport and per-command response collection
//! - `protocol`: Payload normalization and JSON fragment extraction
//! - `record`: The merged raw record and path lookups
//! - `fields`: Static field table (paths, scales, transforms)
//! - `mapper`: Raw-to-display projection, PV layout heuristics
//! - `energy`: Daily energy counter glitch filter
//! - `driver`: Polling loop and snapshot publication

pub mod client;
pub mod config;
pub mod driver;
pub mod energy;
pub mod error;
pub mod fields;
pub mod logging;
pub mod mapper;
pub mod protocol;
pub mod record;

// Re-export commonly used types
pub use config::Config;
pub use driver::FelicityDriver;
pub use error::{HelionError, Result};
