//! Workspace placeholder crate.
//!
//! Exposes the feature flags that map to the individual workspace crates
//! (`core-service`, `core-playback`). Host applications can depend on
//! `player-core-workspace` and enable `desktop-shims` without wiring each
//! crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_playback as playback;
#[cfg(feature = "desktop-shims")]
pub use core_service as service;
