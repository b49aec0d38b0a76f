//! VoltCart Core - Shared types library.
//!
//! This crate provides common types used across all VoltCart components:
//! - `storefront` - API client, customer-facing stores and checkout
//! - `admin` - Back-office stores over the same API
//! - `cli` - Terminal shell that drives the stores
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no caches. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`load`] - Residential electrical load and breaker estimation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod load;
pub mod types;

pub use load::{Appliances, BreakerRating, LoadEstimate};
pub use types::*;
