//! Classification tags and the scopes they live in.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// User classification of an organization within a market.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Untagged. Never stored; absence of a row means `None`.
    #[default]
    None,
    Partner,
    Competitor,
    /// Free-form label
    Custom(String),
}

impl Tag {
    /// Parses a stored tag value. Named variants match case-insensitively;
    /// empty strings and `"none"` are untagged.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "none" => Tag::None,
            "partner" => Tag::Partner,
            "competitor" => Tag::Competitor,
            _ => Tag::Custom(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Tag::None => "none",
            Tag::Partner => "partner",
            Tag::Competitor => "competitor",
            Tag::Custom(label) => label,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Tag::None)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Tag::parse(s))
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Tag::parse(&value))
    }
}

/// Where a set of tags applies: a saved market or an ephemeral session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TagScope {
    SavedMarket(String),
    Session(String),
}

impl fmt::Display for TagScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagScope::SavedMarket(id) => write!(f, "market:{}", id),
            TagScope::Session(id) => write!(f, "session:{}", id),
        }
    }
}
