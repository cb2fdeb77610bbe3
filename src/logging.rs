//! # Logging
//!
//! Every node logs through `tracing`: `trace!` for construction and updates,
//! `debug!` for emissions, `warn!` when a producer suspends on backpressure
//! and `error!` on structural failures. Nothing is printed until a
//! subscriber is installed, which applications can do with [`init_tracing`].

use tracing::trace;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a formatting subscriber filtered by `RUST_LOG`.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case the existing one is left in place.
pub fn init_tracing() -> bool {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
  let installed = tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer())
    .try_init()
    .is_ok();
  trace!("init_tracing() -> installed={}", installed);
  installed
}
