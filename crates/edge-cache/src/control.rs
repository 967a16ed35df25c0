//! Per-request cache-control flags.
//!
//! A [`CacheControl`] is created fresh for every request and threaded through
//! the decision pipeline. Flags only ever get set; the not-cacheable bit in
//! particular is a one-way veto.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bit positions of the control mask.
pub mod bits {
    pub const NOT_CACHEABLE: u8 = 1;
    pub const PRIVATE: u8 = 2;
    pub const SHARED: u8 = 4;
    pub const NO_VARY: u8 = 8;
    pub const STALE: u8 = 128;
}

/// What a recorded control event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlEventKind {
    NoCache,
    Private,
    Shared,
    NoVary,
    Stale,
    CustomTtl,
    Mobile,
}

impl fmt::Display for ControlEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoCache => "no_cache",
            Self::Private => "private",
            Self::Shared => "shared",
            Self::NoVary => "no_vary",
            Self::Stale => "stale",
            Self::CustomTtl => "custom_ttl",
            Self::Mobile => "mobile",
        };
        f.write_str(s)
    }
}

/// Diagnostic record of a single flag mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub kind: ControlEventKind,
    pub message: String,
}

/// Mutable cache decision state for one request.
#[derive(Debug, Clone, Default)]
pub struct CacheControl {
    mask: u8,
    custom_ttl: u32,
    mobile: bool,
    nocache_reason: Option<String>,
    finalized: bool,
    events: Vec<ControlEvent>,
}

impl CacheControl {
    /// Fresh state: cacheable, public, no custom TTL.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, kind: ControlEventKind, message: String) {
        tracing::debug!(kind = %kind, "{}", message);
        self.events.push(ControlEvent { kind, message });
    }

    /// Serve the response without a vary key.
    pub fn set_no_vary(&mut self) {
        self.mask |= bits::NO_VARY;
        self.record(ControlEventKind::NoVary, "Cache_control is set to no_vary".into());
    }

    /// Whether the response skips the vary key.
    pub fn is_no_vary(&self) -> bool {
        self.mask & bits::NO_VARY != 0
    }

    /// Allow serving a stale copy while it refreshes.
    pub fn set_stale(&mut self) {
        self.mask |= bits::STALE;
        self.record(ControlEventKind::Stale, "Cache_control is set to stale".into());
    }

    /// Whether a stale copy may be served.
    pub fn is_stale(&self) -> bool {
        self.mask & bits::STALE != 0
    }

    /// Cache per visitor instead of publicly.
    pub fn set_private(&mut self) {
        self.mask |= bits::PRIVATE;
        self.record(ControlEventKind::Private, "Cache_control is set to private".into());
    }

    /// Whether the response is private. True for shared responses too.
    pub fn is_private(&self) -> bool {
        self.mask & bits::PRIVATE != 0
    }

    /// Mark the response shared-private. Always implies private.
    pub fn set_shared(&mut self) {
        self.mask |= bits::SHARED;
        self.set_private();
        self.record(ControlEventKind::Shared, "Cache_control is set to shared".into());
    }

    /// Whether the response is shared-private.
    pub fn is_shared(&self) -> bool {
        self.mask & bits::SHARED != 0 && self.is_private()
    }

    /// Veto caching for the rest of the request.
    ///
    /// The first reason given is kept for [`nocache_reason`](Self::nocache_reason);
    /// later calls are still recorded as events.
    pub fn set_nocache(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.mask |= bits::NOT_CACHEABLE;
        if self.nocache_reason.is_none() {
            self.nocache_reason = Some(reason.clone());
        }
        self.record(
            ControlEventKind::NoCache,
            format!("Cache_control is set to nocache by: {}", reason),
        );
    }

    /// Whether the response may still be cached.
    pub fn get_cacheable(&self) -> bool {
        self.mask & bits::NOT_CACHEABLE == 0
    }

    /// Why caching was vetoed, if it was.
    pub fn nocache_reason(&self) -> Option<&str> {
        self.nocache_reason.as_deref()
    }

    /// Set a custom TTL for this response. 0 means "use the configured TTL".
    pub fn set_custom_ttl(&mut self, ttl: u32) {
        self.custom_ttl = ttl;
        self.record(
            ControlEventKind::CustomTtl,
            format!("Cache_control TTL is set to {}", ttl),
        );
    }

    /// Set a custom TTL from untyped input, e.g. a header or option value.
    ///
    /// Non-numeric or negative input is ignored and the previous value kept.
    /// Returns whether the value was accepted.
    pub fn set_custom_ttl_raw(&mut self, value: &str) -> bool {
        match value.trim().parse::<u32>() {
            Ok(ttl) => {
                self.set_custom_ttl(ttl);
                true
            }
            Err(_) => {
                self.record(
                    ControlEventKind::CustomTtl,
                    format!(
                        "Cache_control TTL ignored invalid value {:?}, keeping {}",
                        value, self.custom_ttl
                    ),
                );
                false
            }
        }
    }

    /// Custom TTL, or 0 when none was set.
    pub fn custom_ttl(&self) -> u32 {
        self.custom_ttl
    }

    /// Mark the current page as mobile.
    pub fn set_mobile(&mut self) {
        self.mobile = true;
        self.record(ControlEventKind::Mobile, "Cache_control is set to mobile".into());
    }

    /// Whether the page was marked as mobile.
    pub fn is_mobile(&self) -> bool {
        self.mobile
    }

    /// Raw flag mask.
    pub fn bits(&self) -> u8 {
        self.mask
    }

    /// Diagnostic trail in the order the mutations happened.
    pub fn events(&self) -> &[ControlEvent] {
        &self.events
    }

    /// Whether the decision pipeline already ran on this state.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.finalized = true;
    }
}
