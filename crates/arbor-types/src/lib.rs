//! Foundation types for Arbor.
//!
//! This crate contains the types shared by every Arbor crate: the
//! workspace-level error type, the TOML configuration model, the network
//! transport traits, and the platform-agnostic key events that the session
//! layer consumes.

pub mod backend;
pub mod config;
pub mod error;
pub mod key;
