//! Do-not-cache rule matching.

use std::collections::HashSet;
use std::fmt;

use edge_core::{CacheConfig, ConfigError, Method, RequestContext};
use regex::Regex;

/// Errors raised while compiling exclusion rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("invalid user agent pattern {pattern:?}: {source}")]
    InvalidUserAgent {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Why a request was excluded from caching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The bypass query parameter is set.
    QueryAction,
    /// Only GET requests are cached.
    NotGet(Method),
    /// Feed requests while the feed TTL is 0.
    FeedDisabled,
    Trackback,
    /// 404 responses while the 404 TTL is 0.
    NotFoundDisabled,
    Search,
    /// Matched a configured URI rule. Carries the request URI.
    Uri(String),
    /// Matched a configured category.
    Category(String),
    /// Matched a configured tag.
    Tag(String),
    /// Request carries a configured cookie.
    Cookie(String),
    /// User agent matched the configured pattern.
    UserAgent,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryAction => write!(f, "Query String Action"),
            Self::NotGet(method) => write!(f, "not GET method ({})", method),
            Self::FeedDisabled => write!(f, "feed"),
            Self::Trackback => write!(f, "trackback"),
            Self::NotFoundDisabled => write!(f, "404 pages"),
            Self::Search => write!(f, "search"),
            Self::Uri(uri) => write!(f, "Admin configured URI Do not cache: {}", uri),
            Self::Category(name) => write!(f, "Admin configured Category Do not cache: {}", name),
            Self::Tag(name) => write!(f, "Admin configured Tag Do not cache: {}", name),
            Self::Cookie(name) => write!(f, "Admin configured Cookie Do not cache: {}", name),
            Self::UserAgent => write!(f, "Admin configured User Agent Do not cache."),
        }
    }
}

/// A single URI rule.
#[derive(Debug, Clone, PartialEq, Eq)]
enum UriRule {
    /// `/foo$` - the URI must equal `/foo`.
    Exact(String),
    /// `/foo` - the URI must start with `/foo`.
    Prefix(String),
}

impl UriRule {
    fn parse(rule: &str) -> Option<Self> {
        let rule = rule.trim();
        if rule.is_empty() {
            return None;
        }
        match rule.strip_suffix('$') {
            Some(body) => Some(Self::Exact(body.to_string())),
            None => Some(Self::Prefix(rule.to_string())),
        }
    }

    fn matches(&self, uri: &str) -> bool {
        match self {
            Self::Exact(body) => uri == body,
            Self::Prefix(prefix) => uri.starts_with(prefix.as_str()),
        }
    }
}

/// Exclusion rules compiled once from configuration.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    uris: Vec<UriRule>,
    categories: HashSet<String>,
    tags: HashSet<String>,
    cookies: HashSet<String>,
    user_agent: Option<Regex>,
}

fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

fn term_set<'a>(terms: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    terms
        .into_iter()
        .map(normalize_term)
        .filter(|t| !t.is_empty())
        .collect()
}

impl ExclusionRules {
    /// Compile rules, failing on an invalid user agent pattern.
    pub fn compile(config: &CacheConfig) -> Result<Self, RuleError> {
        let mut rules = Self::compile_static(config);
        rules.user_agent = compile_user_agent(&config.exclusions.user_agents)?;
        Ok(rules)
    }

    /// Compile rules, dropping an invalid user agent pattern so that it never
    /// matches.
    pub fn compile_lenient(config: &CacheConfig) -> Self {
        let mut rules = Self::compile_static(config);
        rules.user_agent = match compile_user_agent(&config.exclusions.user_agents) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring user agent exclusion");
                None
            }
        };
        rules
    }

    fn compile_static(config: &CacheConfig) -> Self {
        let exclusions = &config.exclusions;
        Self {
            uris: exclusions.uris.iter().filter_map(|r| UriRule::parse(r)).collect(),
            categories: term_set(exclusions.categories.iter().map(String::as_str)),
            tags: term_set(exclusions.tags.iter().map(String::as_str)),
            cookies: exclusions
                .cookies
                .split('|')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect(),
            user_agent: None,
        }
    }

    /// Whether a user agent pattern is active.
    pub fn has_user_agent_rule(&self) -> bool {
        self.user_agent.is_some()
    }

    /// Check the request against every rule, first match wins.
    pub fn evaluate(&self, ctx: &RequestContext, config: &CacheConfig) -> Option<ExclusionReason> {
        if ctx
            .query_param(&config.bypass_query_key)
            .is_some_and(|v| !v.is_empty() && v != "0")
        {
            return Some(ExclusionReason::QueryAction);
        }

        if ctx.method != Method::Get {
            return Some(ExclusionReason::NotGet(ctx.method.clone()));
        }

        if ctx.page.feed && config.ttl.feed == 0 {
            return Some(ExclusionReason::FeedDisabled);
        }

        if ctx.page.trackback {
            return Some(ExclusionReason::Trackback);
        }

        if ctx.page.not_found && config.ttl.not_found == 0 {
            return Some(ExclusionReason::NotFoundDisabled);
        }

        if ctx.page.search {
            return Some(ExclusionReason::Search);
        }

        if self.uri_excluded(&ctx.uri, config.site_path.as_deref()) {
            return Some(ExclusionReason::Uri(ctx.uri.clone()));
        }

        if let Some(ref post) = ctx.post {
            if let Some(hit) = first_hit(&self.categories, &post.categories) {
                return Some(ExclusionReason::Category(hit));
            }
            if let Some(hit) = first_hit(&self.tags, &post.tags) {
                return Some(ExclusionReason::Tag(hit));
            }
        }

        if !self.cookies.is_empty() {
            let mut names: Vec<&String> = ctx.cookies.keys().collect();
            names.sort();
            if let Some(name) = names.into_iter().find(|n| self.cookies.contains(n.as_str())) {
                return Some(ExclusionReason::Cookie(name.clone()));
            }
        }

        if let (Some(re), Some(ua)) = (&self.user_agent, ctx.user_agent()) {
            if re.is_match(ua) {
                return Some(ExclusionReason::UserAgent);
            }
        }

        None
    }

    /// Match the URI against the configured rules. On a multisite network the
    /// site base path is stripped first, keeping its trailing slash as the
    /// leading slash of the remainder. The base only strips whole path
    /// segments, so `/shop` never matches inside `/shopping`.
    pub fn uri_excluded(&self, uri: &str, site_path: Option<&str>) -> bool {
        if self.uris.is_empty() {
            return false;
        }

        let uri = site_path
            .map(|base| base.trim_end_matches('/'))
            .filter(|base| !base.is_empty())
            .and_then(|base| uri.strip_prefix(base))
            .filter(|rest| rest.starts_with('/'))
            .unwrap_or(uri);

        self.uris.iter().any(|rule| rule.matches(uri))
    }
}

fn compile_user_agent(pattern: &str) -> Result<Option<Regex>, RuleError> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|source| RuleError::InvalidUserAgent {
            pattern: pattern.to_string(),
            source,
        })
}

fn first_hit(configured: &HashSet<String>, assigned: &[String]) -> Option<String> {
    if configured.is_empty() {
        return None;
    }
    assigned
        .iter()
        .find(|term| configured.contains(&normalize_term(term)))
        .cloned()
}

#[cfg(test)]
mod tests {
    use edge_core::{PageInfo, PostInfo};

    use super::*;

    fn config_with_uris(uris: &[&str]) -> CacheConfig {
        let mut config = CacheConfig::default();
        config.exclusions.uris = uris.iter().map(|s| s.to_string()).collect();
        config
    }

    fn evaluate(config: &CacheConfig, ctx: &RequestContext) -> Option<ExclusionReason> {
        ExclusionRules::compile(config).unwrap().evaluate(ctx, config)
    }

    #[test]
    fn test_plain_get_not_excluded() {
        let config = CacheConfig::default();
        assert_eq!(evaluate(&config, &RequestContext::get("/hello")), None);
    }

    #[test]
    fn test_query_action() {
        let config = CacheConfig::default();
        let ctx = RequestContext::get("/?LSCWP_CTRL=before_optm").with_query("LSCWP_CTRL", "before_optm");
        assert_eq!(evaluate(&config, &ctx), Some(ExclusionReason::QueryAction));

        let empty = RequestContext::get("/").with_query("LSCWP_CTRL", "");
        assert_eq!(evaluate(&config, &empty), None);
    }

    #[test]
    fn test_query_action_checked_before_method() {
        let config = CacheConfig::default();
        let ctx = RequestContext::new(Method::Post, "/").with_query("LSCWP_CTRL", "purge");
        assert_eq!(evaluate(&config, &ctx), Some(ExclusionReason::QueryAction));
    }

    #[test]
    fn test_not_get() {
        let config = CacheConfig::default();
        let ctx = RequestContext::new(Method::Head, "/");
        assert_eq!(evaluate(&config, &ctx), Some(ExclusionReason::NotGet(Method::Head)));
    }

    #[test]
    fn test_feed_depends_on_ttl() {
        let mut config = CacheConfig::default();
        let ctx = RequestContext::get("/feed/").with_page(PageInfo {
            feed: true,
            ..Default::default()
        });
        assert_eq!(evaluate(&config, &ctx), Some(ExclusionReason::FeedDisabled));

        config.ttl.feed = 60;
        assert_eq!(evaluate(&config, &ctx), None);
    }

    #[test]
    fn test_not_found_depends_on_ttl() {
        let mut config = CacheConfig::default();
        let ctx = RequestContext::get("/missing").with_page(PageInfo {
            not_found: true,
            ..Default::default()
        });
        assert_eq!(evaluate(&config, &ctx), Some(ExclusionReason::NotFoundDisabled));

        config.ttl.not_found = 3600;
        assert_eq!(evaluate(&config, &ctx), None);
    }

    #[test]
    fn test_trackback_and_search() {
        let config = CacheConfig::default();
        let trackback = RequestContext::get("/p/trackback/").with_page(PageInfo {
            trackback: true,
            search: true,
            ..Default::default()
        });
        assert_eq!(evaluate(&config, &trackback), Some(ExclusionReason::Trackback));

        let search = RequestContext::get("/?s=x").with_page(PageInfo {
            search: true,
            ..Default::default()
        });
        assert_eq!(evaluate(&config, &search), Some(ExclusionReason::Search));
    }

    #[test]
    fn test_anchored_uri_rule() {
        let config = config_with_uris(&["/foo$"]);
        assert_eq!(
            evaluate(&config, &RequestContext::get("/foo")),
            Some(ExclusionReason::Uri("/foo".to_string()))
        );
        assert_eq!(evaluate(&config, &RequestContext::get("/foo/bar")), None);
        assert_eq!(evaluate(&config, &RequestContext::get("/fo")), None);
    }

    #[test]
    fn test_prefix_uri_rule() {
        let config = config_with_uris(&["/foo"]);
        assert!(evaluate(&config, &RequestContext::get("/foo")).is_some());
        assert!(evaluate(&config, &RequestContext::get("/foo/bar")).is_some());
        assert!(evaluate(&config, &RequestContext::get("/fo")).is_none());
        assert!(evaluate(&config, &RequestContext::get("/bar/foo")).is_none());
    }

    #[test]
    fn test_blank_uri_rules_ignored() {
        let config = config_with_uris(&["", "   ", "/cart"]);
        assert!(evaluate(&config, &RequestContext::get("/")).is_none());
        assert!(evaluate(&config, &RequestContext::get("/cart/")).is_some());
    }

    #[test]
    fn test_multisite_path_stripped() {
        let config = config_with_uris(&["/checkout$", "/account"]).with_site_path("/shop/");
        let rules = ExclusionRules::compile(&config).unwrap();

        assert!(rules.uri_excluded("/shop/checkout", config.site_path.as_deref()));
        assert!(rules.uri_excluded("/shop/account/orders", config.site_path.as_deref()));
        assert!(!rules.uri_excluded("/shop/checkout/done", config.site_path.as_deref()));
        // Other sites' paths are left alone.
        assert!(!rules.uri_excluded("/blog/checkout", config.site_path.as_deref()));
        assert!(rules.uri_excluded("/checkout", config.site_path.as_deref()));
    }

    #[test]
    fn test_multisite_path_with_non_ascii_segment() {
        let config = config_with_uris(&["/cart"]).with_site_path("/café/");
        let rules = ExclusionRules::compile(&config).unwrap();

        assert!(rules.uri_excluded("/café/cart", config.site_path.as_deref()));
        assert!(rules.uri_excluded("/café/cart", Some("/café")));
        assert!(!rules.uri_excluded("/café/menu", Some("/café")));
        assert!(!rules.uri_excluded("/cafés/cart", Some("/café")));
    }

    #[test]
    fn test_site_path_without_trailing_slash() {
        let config = config_with_uris(&["/pping", "/orders"]);
        let rules = ExclusionRules::compile(&config).unwrap();

        // "/shopping" is not under "/shop", so it is matched unstripped.
        assert!(!rules.uri_excluded("/shopping", Some("/shop")));
        assert!(rules.uri_excluded("/shop/orders", Some("/shop")));
        assert!(!rules.uri_excluded("/shop", Some("/shop")));
        assert!(!rules.uri_excluded("/shopping", Some("/")));
    }

    #[test]
    fn test_category_and_tag() {
        let mut config = CacheConfig::default();
        config.exclusions.categories = vec!["Members".to_string()];
        config.exclusions.tags = vec!["live".to_string()];

        let by_category = RequestContext::get("/p/1").with_post(PostInfo {
            categories: vec!["news".into(), "members".into()],
            ..Default::default()
        });
        assert_eq!(
            evaluate(&config, &by_category),
            Some(ExclusionReason::Category("members".to_string()))
        );

        let by_tag = RequestContext::get("/p/2").with_post(PostInfo {
            tags: vec!["Live".into()],
            ..Default::default()
        });
        assert_eq!(evaluate(&config, &by_tag), Some(ExclusionReason::Tag("Live".to_string())));

        let neither = RequestContext::get("/p/3").with_post(PostInfo {
            categories: vec!["news".into()],
            tags: vec!["archive".into()],
            ..Default::default()
        });
        assert_eq!(evaluate(&config, &neither), None);
    }

    #[test]
    fn test_cookie_list() {
        let mut config = CacheConfig::default();
        config.exclusions.cookies = "woocommerce_items_in_cart| cart_hash".to_string();

        let ctx = RequestContext::get("/").with_cookie("cart_hash", "abc");
        assert_eq!(
            evaluate(&config, &ctx),
            Some(ExclusionReason::Cookie("cart_hash".to_string()))
        );

        let other = RequestContext::get("/").with_cookie("cart_hash_x", "abc");
        assert_eq!(evaluate(&config, &other), None);
    }

    #[test]
    fn test_user_agent_pattern() {
        let mut config = CacheConfig::default();
        config.exclusions.user_agents = "Googlebot|bingbot".to_string();

        let bot = RequestContext::get("/").with_header("User-Agent", "Mozilla/5.0 (compatible; Googlebot/2.1)");
        assert_eq!(evaluate(&config, &bot), Some(ExclusionReason::UserAgent));

        let human = RequestContext::get("/").with_header("User-Agent", "Mozilla/5.0 Firefox/120.0");
        assert_eq!(evaluate(&config, &human), None);

        assert_eq!(evaluate(&config, &RequestContext::get("/")), None);
    }

    #[test]
    fn test_invalid_user_agent_pattern() {
        let mut config = CacheConfig::default();
        config.exclusions.user_agents = "bot(".to_string();

        assert!(matches!(
            ExclusionRules::compile(&config),
            Err(RuleError::InvalidUserAgent { .. })
        ));

        let lenient = ExclusionRules::compile_lenient(&config);
        assert!(!lenient.has_user_agent_rule());
        let ctx = RequestContext::get("/").with_header("User-Agent", "bot(");
        assert_eq!(lenient.evaluate(&ctx, &config), None);
    }

    #[test]
    fn test_reason_text() {
        assert_eq!(
            ExclusionReason::Uri("/foo".into()).to_string(),
            "Admin configured URI Do not cache: /foo"
        );
        assert_eq!(ExclusionReason::NotGet(Method::Post).to_string(), "not GET method (POST)");
    }

    #[test]
    fn test_extension_method_keeps_its_name() {
        let config = CacheConfig::default();
        let ctx = RequestContext::new("PURGE".parse().unwrap(), "/");
        let reason = evaluate(&config, &ctx).unwrap();
        assert_eq!(reason, ExclusionReason::NotGet(Method::Other("PURGE".to_string())));
        assert_eq!(reason.to_string(), "not GET method (PURGE)");
    }
}
