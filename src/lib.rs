//! CAMARA MCP Gateway Library
//!
//! Exposes CAMARA network APIs (device reachability, roaming, location,
//! number verification, OTP, QoS, SIM/device swap, edge discovery) as
//! MCP tools over Streamable HTTP.
//!
//! # Pipeline
//!
//! Each tool call runs one linear pass: argument validation (catalog) →
//! path resolution (registry) → outbound dispatch → response
//! normalization. The result is always a single [`normalize::NormalizedResult`]
//! value; upstream failures never surface as transport faults.
//!
//! # Versioning
//!
//! Two upstream API generations are supported (`spring25`, `fall25`),
//! selected once per process from configuration. The endpoint table is
//! validated for full version coverage at startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod invoker;
pub mod normalize;
pub mod protocol;
pub mod registry;
pub mod server;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
