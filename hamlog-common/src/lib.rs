//! # HamLog Common Library
//!
//! Shared code for the HamLog logbook service:
//! - Configuration loading (TOML bootstrap + environment overrides)
//! - Database initialization and schema
//! - QSO record type and validation
//! - Callsign normalization
//! - Credential hashing and bearer token primitives
//! - ADIF export writer

pub mod adif;
pub mod auth;
pub mod callsign;
pub mod config;
pub mod db;
pub mod error;
pub mod qso;

pub use error::{Error, Result};
