//! Config file discovery and templates.

use std::path::{Path, PathBuf};

/// File names searched for, in order, in each directory.
pub const CONFIG_NAMES: [&str; 3] = ["lscache.toml", ".lscache.toml", "lscache.json"];

/// Find the nearest config file in `start` or its ancestors.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Generate a commented default config.
pub fn generate_default_config() -> String {
    r#"# Cache-control decision configuration

# Force every response to no-cache.
no_cache = false

# Query parameter that bypasses the cache when set.
bypass_query_key = "LSCWP_CTRL"

# Base path of this site in a multisite network.
# site_path = "/blog2/"

[ttl]
front_page = 1800
feed = 0
not_found = 3600
forbidden = 3600
server_error = 3600
public = 28800

[exclusions]
# A trailing `$` matches the whole URI, anything else is a prefix.
uris = []
categories = []
tags = []
# Pipe-delimited cookie names.
cookies = ""
# Regular expression matched against the User-Agent header.
user_agents = ""

[mobile]
enabled = false
vary_value = ""

[esi]
loggedin = false
server = "litespeed"
"#
    .to_string()
}
