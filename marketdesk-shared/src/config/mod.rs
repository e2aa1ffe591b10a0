//! # Configuration
//!
//! Client configuration for the MarketDesk chat console and library.

pub mod client;

pub use client::{Config, ConfigError, DEFAULT_PAGE_SIZE};
