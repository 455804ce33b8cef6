//! Test helpers for hamlog-server integration tests
//!
//! - Fakes for the callsign directory and the completion model
//! - In-memory database and router construction
//! - Request builders and JSON extraction

#![allow(dead_code)]

pub mod fakes;
pub mod test_app;

pub use fakes::{FakeDirectory, FakeModel};
pub use test_app::{
    bearer, extract_json, json_request, register_and_login, test_pool, TestApp,
};
