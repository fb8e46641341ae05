//! Metadata lookup service library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod backup;
pub mod config;
pub mod crypto;
pub mod resolver;
pub mod routes;
pub mod state;
pub mod store;
