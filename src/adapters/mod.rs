//! Adapters: concrete implementations of the domain ports.

pub mod memory;
pub mod notion;
pub mod webhook;
