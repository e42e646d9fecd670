//! # stemsplit common library
//!
//! Shared code for the stemsplit service crates:
//! - Error and result types
//! - Configuration loading (TOML, environment, compiled defaults)
//! - Identifier helpers

pub mod config;
pub mod error;
pub mod uuid_utils;

pub use error::{Error, Result};
