//! # ordercast-settings
//!
//! Configuration management with layered sources for the ordercast service.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`OrdercastSettings::default()`]
//! 2. **User file** — `~/.ordercast/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `ORDERCAST_*` overrides (highest priority)
//!
//! There is no global settings singleton: the daemon loads settings once at
//! startup and hands each component the slice of configuration it needs.
//!
//! # Usage
//!
//! ```no_run
//! use ordercast_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("port: {}", settings.server.port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
