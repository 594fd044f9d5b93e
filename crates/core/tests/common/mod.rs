//! Shared test utilities for engine integration tests.
//!
//! - [`transport`] - A fake feature service keyed by layer URL
//! - [`fixtures`] - Esri JSON and GeoJSON response bodies

#![allow(dead_code)]

pub mod fixtures;
pub mod transport;
