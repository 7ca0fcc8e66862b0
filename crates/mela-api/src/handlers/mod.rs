//! Route handlers, one module per resource.

pub mod alerts;
pub mod crowd;
pub mod locations;
pub mod lost_found;
pub mod mobile;
pub mod routes;
pub mod settings;
pub mod timing;
pub mod zones;
