#![cfg_attr(not(test), forbid(unsafe_code))]
#![deny(warnings, clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

//! Wire models, push frame codec, and configuration shared by the
//! MarketDesk chat library and its command-line console.

pub mod codec;
pub mod config;
pub mod models;
