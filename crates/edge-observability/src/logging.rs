//! Structured logging of cache-control decisions.

use std::collections::BTreeMap;
use std::fmt;

use edge_cache::{CacheControl, CacheControlHeader, ControlEventKind};
use edge_core::{RequestContext, RequestId};
use serde::Serialize;

/// Log level for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "TRACE"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format (for production/log aggregation).
    #[default]
    Json,
    /// Human-readable format (for development).
    Human,
}

/// A structured log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Request ID for correlation.
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Additional structured fields.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogEntry {
    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }

    /// Format as human-readable string.
    pub fn to_human(&self) -> String {
        let mut s = format!("[{}] {}", self.level, self.message);

        if !self.fields.is_empty() {
            s.push_str(" | ");
            let fields: Vec<String> = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            s.push_str(&fields.join(" "));
        }

        s
    }

    /// Format according to `format`.
    pub fn render(&self, format: LogFormat) -> String {
        match format {
            LogFormat::Json => self.to_json(),
            LogFormat::Human => self.to_human(),
        }
    }
}

/// Logs the diagnostic trail of one request's cache decision.
#[derive(Debug, Clone)]
pub struct DecisionLogger {
    request_id: RequestId,
    uri: Option<String>,
    min_level: LogLevel,
    format: LogFormat,
}

impl DecisionLogger {
    /// Create a logger for a request ID.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            uri: None,
            min_level: LogLevel::Info,
            format: LogFormat::Json,
        }
    }

    /// Create a logger carrying the request's ID and URI.
    pub fn for_request(ctx: &RequestContext) -> Self {
        Self::new(ctx.request_id.clone()).with_uri(ctx.uri.clone())
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set minimum log level.
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Set output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    fn entry(&self, level: LogLevel, message: String, fields: BTreeMap<String, serde_json::Value>) -> LogEntry {
        LogEntry {
            level,
            message,
            request_id: self.request_id.to_string(),
            uri: self.uri.clone(),
            fields,
        }
    }

    /// Build log entries for every recorded control event, followed by a
    /// summary entry when a header was rendered.
    ///
    /// Vetoes log at info, other flag changes at debug.
    pub fn entries(&self, control: &CacheControl, header: Option<&CacheControlHeader>) -> Vec<LogEntry> {
        let mut entries: Vec<LogEntry> = control
            .events()
            .iter()
            .map(|event| {
                let level = match event.kind {
                    ControlEventKind::NoCache => LogLevel::Info,
                    _ => LogLevel::Debug,
                };
                let mut fields = BTreeMap::new();
                fields.insert("event".to_string(), serde_json::json!(event.kind.to_string()));
                self.entry(level, event.message.clone(), fields)
            })
            .collect();

        if let Some(header) = header {
            let mut fields = BTreeMap::new();
            fields.insert("cacheable".to_string(), serde_json::json!(control.get_cacheable()));
            fields.insert("header".to_string(), serde_json::json!(header.value()));
            if let Some(reason) = control.nocache_reason() {
                fields.insert("reason".to_string(), serde_json::json!(reason));
            }
            entries.push(self.entry(LogLevel::Info, "cache control decided".to_string(), fields));
        }

        entries
    }

    /// Render entries at or above the minimum level without writing them.
    pub fn render(&self, control: &CacheControl, header: Option<&CacheControlHeader>) -> Vec<String> {
        self.entries(control, header)
            .into_iter()
            .filter(|e| e.level >= self.min_level)
            .map(|e| e.render(self.format))
            .collect()
    }

    /// Write entries at or above the minimum level to stderr.
    pub fn emit(&self, control: &CacheControl, header: Option<&CacheControlHeader>) {
        for line in self.render(control, header) {
            eprintln!("{}", line);
        }
    }
}
