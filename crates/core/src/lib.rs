//! Ignite Shop Core - Shared types library.
//!
//! This crate provides common types used across all Ignite Shop components:
//! - `storefront` - Public-facing catalog, product and checkout pages
//! - `integration-tests` - End-to-end tests against a fake provider API
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for provider IDs and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
