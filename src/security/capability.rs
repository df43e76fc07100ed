//! Capability tags.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque permission tag such as `read:accounts`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(String);

impl Capability {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Capability {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

pub type CapabilitySet = BTreeSet<Capability>;

/// Build a capability set from string tags.
pub fn capability_set<I, S>(tags: I) -> CapabilitySet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tags.into_iter().map(|t| Capability::new(t)).collect()
}
