//! Config Bootstrap Library
//!
//! This module exports the core components for testing and integration.

pub mod config;
pub mod error;
pub mod fetch;
