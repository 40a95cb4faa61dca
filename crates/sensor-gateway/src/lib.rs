//! Sensor gateway library
//!
//! HTTP surface and startup wiring for the sensor gateway:
//! - Configuration from CLI flags and environment variables
//! - Store construction and the startup connectivity check
//! - axum routes for ingest, download, delete, and health

pub mod config;
pub mod routes;
pub mod startup;
