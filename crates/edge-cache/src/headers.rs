//! Cache-control header rendering.

use std::fmt;

use http::header::{HeaderName, HeaderValue, InvalidHeaderValue};

use crate::control::CacheControl;

/// Response header consumed by the LiteSpeed cache module.
pub const HEADER_CACHE_CONTROL: &str = "X-LiteSpeed-Cache-Control";

/// Value used when caching is vetoed.
pub const NO_CACHE: &str = "no-cache";

/// The rendered cache-control header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheControlHeader {
    value: String,
}

impl CacheControlHeader {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        HEADER_CACHE_CONTROL
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Convert into a typed header pair for an `http` response.
    pub fn to_http(&self) -> Result<(HeaderName, HeaderValue), InvalidHeaderValue> {
        let value = HeaderValue::from_str(&self.value)?;
        Ok((HeaderName::from_static("x-litespeed-cache-control"), value))
    }
}

impl fmt::Display for CacheControlHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", HEADER_CACHE_CONTROL, self.value)
    }
}

/// Render the header value for a finalized control state.
///
/// `ttl` is ignored when the state is not cacheable.
pub fn format_value(control: &CacheControl, ttl: u32, esi_suffix: &str) -> String {
    if !control.get_cacheable() {
        return format!("{}{}", NO_CACHE, esi_suffix);
    }

    let scope = if control.is_shared() {
        "shared,private"
    } else if control.is_private() {
        "private"
    } else {
        "public"
    };

    let mut value = String::from(scope);
    if control.is_no_vary() {
        value.push_str(",no-vary");
    }
    value.push_str(&format!(",max-age={}", ttl));
    value.push_str(esi_suffix);
    value
}
