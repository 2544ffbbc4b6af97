use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Name of a realm — a partition of identity space.
///
/// Realm names are opaque strings at this layer; each authentication
/// mechanism ultimately binds to exactly one realm partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RealmName(Cow<'static, str>);

impl RealmName {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RealmName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for RealmName {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RealmName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
