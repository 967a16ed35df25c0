//! Cache-control decision engine for the edge cache.
//!
//! This crate provides:
//! - `CacheControl` - Per-request flag state with a one-way no-cache veto
//! - `ExclusionRules` - Admin-configured do-not-cache rules
//! - `resolve_ttl` - TTL selection by page class
//! - `DecisionEngine` - The ordered finalize pipeline and header output
//! - `CacheControlHeader` - The rendered `X-LiteSpeed-Cache-Control` header
//!
//! # Example
//!
//! ```
//! use edge_cache::{DecisionEngine, EsiContext};
//! use edge_core::{CacheConfig, RequestContext};
//!
//! let engine = DecisionEngine::new(CacheConfig::default().with_public_ttl(120)).unwrap();
//!
//! // One control state per request.
//! let ctx = RequestContext::get("/hello");
//! let mut control = engine.begin();
//! let header = engine.output(&ctx, &EsiContext::none(), &mut control);
//!
//! assert_eq!(header.to_string(), "X-LiteSpeed-Cache-Control: public,max-age=120");
//! ```

mod control;
mod engine;
mod esi;
mod exclusion;
mod headers;
mod ttl;

pub use control::*;
pub use engine::*;
pub use esi::*;
pub use exclusion::*;
pub use headers::*;
pub use ttl::*;
