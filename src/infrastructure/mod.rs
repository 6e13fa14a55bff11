//! Infrastructure layer: configuration, logging, and the resilient HTTP
//! transport used by the external adapters.

pub mod config;
pub mod http;
pub mod logging;
