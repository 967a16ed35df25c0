//! Request context with host-resolved classification.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};

        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{:x}-{:x}", nanos, std::process::id(), seq))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Query string parameters.
pub type QueryParams = HashMap<String, String>;

/// HTTP headers.
pub type Headers = HashMap<String, String>;

/// Request cookies keyed by name.
pub type Cookies = HashMap<String, String>;

/// HTTP method.
///
/// Serialized as its upper-case name. Extension methods keep the name they
/// arrived with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Connect,
    Trace,
    /// Any extension method, by name.
    Other(String),
}

impl Method {
    /// Canonical name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl From<String> for Method {
    fn from(name: String) -> Self {
        match name.as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "CONNECT" => Self::Connect,
            "TRACE" => Self::Trace,
            _ => Self::Other(name),
        }
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        match method {
            Method::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl From<&http::Method> for Method {
    fn from(method: &http::Method) -> Self {
        // Method names are case-sensitive; "get" is an extension method.
        Self::from(method.as_str().to_string())
    }
}

/// Page classification resolved by the host before the decision runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageInfo {
    pub front_page: bool,
    pub feed: bool,
    pub not_found: bool,
    pub trackback: bool,
    pub search: bool,
    pub admin: bool,
    pub network_admin: bool,
}

/// The post being rendered, if the request resolves to one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostInfo {
    /// Category slugs or names assigned to the post.
    pub categories: Vec<String>,
    /// Tag slugs or names assigned to the post.
    pub tags: Vec<String>,
    /// Whether the post requires a password to view.
    pub password_protected: bool,
}

/// Read-only per-request input to the cache decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier. Never read from input.
    #[serde(skip)]
    pub request_id: RequestId,
    /// HTTP method.
    #[serde(default)]
    pub method: Method,
    /// Raw request URI (path plus query string).
    pub uri: String,
    /// Query string parameters.
    #[serde(default)]
    pub query: QueryParams,
    /// HTTP headers.
    #[serde(default)]
    pub headers: Headers,
    /// Request cookies.
    #[serde(default)]
    pub cookies: Cookies,
    /// Host page classification.
    #[serde(default)]
    pub page: PageInfo,
    /// Error status the host is about to respond with.
    #[serde(default)]
    pub error_code: Option<u16>,
    /// Queried post.
    #[serde(default)]
    pub post: Option<PostInfo>,
    /// Whether the visitor carries the cookie unlocking a protected post.
    #[serde(default)]
    pub has_unlock_cookie: bool,
    /// Host-side mobile detection result.
    #[serde(default)]
    pub host_detected_mobile: bool,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::generate(),
            method,
            uri: uri.into(),
            query: HashMap::new(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            page: PageInfo::default(),
            error_code: None,
            post: None,
            has_unlock_cookie: false,
            host_detected_mobile: false,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::Get, uri)
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Set the page classification.
    pub fn with_page(mut self, page: PageInfo) -> Self {
        self.page = page;
        self
    }

    /// Set the error status.
    pub fn with_error_code(mut self, code: u16) -> Self {
        self.error_code = Some(code);
        self
    }

    /// Set the queried post.
    pub fn with_post(mut self, post: PostInfo) -> Self {
        self.post = Some(post);
        self
    }

    /// Mark the request as carrying the post unlock cookie.
    pub fn with_unlock_cookie(mut self) -> Self {
        self.has_unlock_cookie = true;
        self
    }

    /// Mark the request as mobile according to the host.
    pub fn with_host_mobile(mut self) -> Self {
        self.host_detected_mobile = true;
        self
    }

    /// Get a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a cookie value by name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|s| s.as_str())
    }

    /// The `User-Agent` header, if present.
    pub fn user_agent(&self) -> Option<&str> {
        self.header("user-agent")
    }

    /// Whether the queried post is password protected.
    pub fn is_password_protected_post(&self) -> bool {
        self.post.as_ref().is_some_and(|p| p.password_protected)
    }

    /// Whether this is an admin or network-admin screen.
    pub fn is_admin_area(&self) -> bool {
        self.page.admin || self.page.network_admin
    }
}
