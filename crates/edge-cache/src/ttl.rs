//! Time-to-live resolution.

use edge_core::{RequestContext, TtlConfig};

/// Resolve the TTL for a response, first satisfied rule wins:
/// custom TTL, front page, feed, 404, 403, 5xx, then the public default.
///
/// The 403 and 5xx TTLs apply even when they are 0.
pub fn resolve_ttl(ctx: &RequestContext, ttl: &TtlConfig, custom_ttl: u32) -> u32 {
    if custom_ttl != 0 {
        return custom_ttl;
    }

    if ctx.page.front_page {
        return ttl.front_page;
    }

    if ctx.page.feed && ttl.feed > 0 {
        return ttl.feed;
    }

    if ctx.page.not_found && ttl.not_found > 0 {
        return ttl.not_found;
    }

    match ctx.error_code {
        Some(403) => ttl.forbidden,
        Some(code) if code >= 500 => ttl.server_error,
        _ => ttl.public,
    }
}

#[cfg(test)]
mod tests {
    use edge_core::PageInfo;

    use super::*;

    fn ttls() -> TtlConfig {
        TtlConfig {
            front_page: 600,
            feed: 300,
            not_found: 60,
            forbidden: 0,
            server_error: 10,
            public: 120,
        }
    }

    fn page(page: PageInfo) -> RequestContext {
        RequestContext::get("/").with_page(page)
    }

    #[test]
    fn test_front_page() {
        let ctx = page(PageInfo {
            front_page: true,
            ..Default::default()
        });
        assert_eq!(resolve_ttl(&ctx, &ttls(), 0), 600);
    }

    #[test]
    fn test_custom_wins_over_front_page() {
        let ctx = page(PageInfo {
            front_page: true,
            ..Default::default()
        });
        assert_eq!(resolve_ttl(&ctx, &ttls(), 45), 45);
    }

    #[test]
    fn test_front_page_zero_is_returned() {
        let mut config = ttls();
        config.front_page = 0;
        let ctx = page(PageInfo {
            front_page: true,
            feed: true,
            ..Default::default()
        });
        assert_eq!(resolve_ttl(&ctx, &config, 0), 0);
    }

    #[test]
    fn test_feed_falls_through_when_zero() {
        let ctx = page(PageInfo {
            feed: true,
            ..Default::default()
        });
        assert_eq!(resolve_ttl(&ctx, &ttls(), 0), 300);

        let mut config = ttls();
        config.feed = 0;
        assert_eq!(resolve_ttl(&ctx, &config, 0), 120);
    }

    #[test]
    fn test_not_found() {
        let ctx = page(PageInfo {
            not_found: true,
            ..Default::default()
        });
        assert_eq!(resolve_ttl(&ctx, &ttls(), 0), 60);
    }

    #[test]
    fn test_error_codes() {
        let forbidden = RequestContext::get("/").with_error_code(403);
        assert_eq!(resolve_ttl(&forbidden, &ttls(), 0), 0);

        let bad_gateway = RequestContext::get("/").with_error_code(502);
        assert_eq!(resolve_ttl(&bad_gateway, &ttls(), 0), 10);

        let teapot = RequestContext::get("/").with_error_code(418);
        assert_eq!(resolve_ttl(&teapot, &ttls(), 0), 120);
    }

    #[test]
    fn test_public_default() {
        assert_eq!(resolve_ttl(&RequestContext::get("/about"), &ttls(), 0), 120);
    }
}
