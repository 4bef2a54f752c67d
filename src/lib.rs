// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Library entry point exposing core modules for binaries and integration tests.

pub mod cloud;
pub mod config;
pub mod domain;
pub mod history;
pub mod repository;
pub mod server;
pub mod state;
pub mod sync;
pub mod telemetry;
