//! Core types shared by the cache decision crates.
//!
//! This crate provides:
//! - `RequestContext` - Read-only request input with host classification
//! - `CacheConfig` - TTL, exclusion, mobile and ESI settings

mod config;
mod context;

pub use config::*;
pub use context::*;
