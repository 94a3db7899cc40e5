//! User-agent chains sent with every call.
//!
//! # Design
//! A chain lists products from most to least specific and renders as one
//! space-separated `name/version` string. `UserAgent` is immutable:
//! `add_agent` returns a new chain, so an executor's chain can be shared
//! between clones without coordination.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One `product/version` element of a user-agent chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgentEntry {
    pub product_name: String,
    pub product_version: String,
}

impl UserAgentEntry {
    pub fn new(product_name: impl Into<String>, product_version: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            product_version: product_version.into(),
        }
    }

    /// This library's own entry.
    pub fn runtime() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

impl fmt::Display for UserAgentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.product_name, self.product_version)
    }
}

/// Ordered user-agent chain, most specific entry first, rendered as one
/// space-separated header value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserAgent {
    entries: Vec<UserAgentEntry>,
    rendered: String,
}

impl UserAgent {
    pub fn new(entries: Vec<UserAgentEntry>) -> Self {
        let rendered = entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        Self { entries, rendered }
    }

    /// A new chain with `entry` appended as the least specific element.
    pub fn add_agent(&self, entry: UserAgentEntry) -> Self {
        let mut entries = self.entries.clone();
        entries.push(entry);
        Self::new(entries)
    }

    pub fn entries(&self) -> &[UserAgentEntry] {
        &self.entries
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}
