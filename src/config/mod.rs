//! # Configuration Module
//!
//! Grading service, preprocessing and storage settings shared by the CLI and
//! the library.

pub mod config;

pub use config::{ApiKey, GradeConfig, API_KEY_ENV};
