//! mela-core: configuration and small shared helpers for the Mela
//! crowd-management backend.

pub mod clock;
pub mod config;

pub use clock::epoch_secs;
pub use config::MelaConfig;
