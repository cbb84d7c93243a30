//! Traffic registry domain model.
//!
//! A traffic record remembers which cache tags influenced the output of a
//! previously rendered URL. Tags are persisted as one delimited string
//! (`,tag1,tag2,`) so that membership is a single `LIKE '%,tag,%'` test.

use crate::domain::error::{DomainError, Result};
use regex::Regex;
use std::collections::BTreeSet;

/// Separator used in the persisted tag list
pub const TAG_DELIMITER: char = ',';

/// URL → cache tags observed for that URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficRecord {
    pub url: String,
    pub tags: BTreeSet<String>,
}

impl TrafficRecord {
    /// Build a record, dropping empty tags and tags that contain the delimiter.
    pub fn new<I, S>(url: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            url: url.into(),
            tags: normalize_tags(tags),
        }
    }

    /// Persisted form: `,a,b,` (empty string for no tags)
    pub fn encoded_tags(&self) -> String {
        encode_tags(&self.tags)
    }
}

/// A tag that can be stored and matched as a single list member
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty() && !tag.contains(TAG_DELIMITER)
}

pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| is_valid_tag(t))
        .collect()
}

pub fn encode_tags(tags: &BTreeSet<String>) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let mut out = String::from(TAG_DELIMITER);
    for tag in tags {
        out.push_str(tag);
        out.push(TAG_DELIMITER);
    }
    out
}

pub fn decode_tags(encoded: &str) -> BTreeSet<String> {
    normalize_tags(encoded.split(TAG_DELIMITER))
}

/// One blocklist entry
#[derive(Debug, Clone)]
enum Pattern {
    Exact(String),
    /// `foo*`
    Prefix(String),
    /// `*` anywhere else
    Wildcard(Regex),
}

impl Pattern {
    fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match raw.find('*') {
            None => Ok(Pattern::Exact(raw.to_string())),
            Some(pos) if pos == raw.len() - 1 => Ok(Pattern::Prefix(raw[..pos].to_string())),
            Some(_) => {
                let body = raw
                    .split('*')
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(".*");
                Regex::new(&format!("^{}$", body))
                    .map(Pattern::Wildcard)
                    .map_err(|e| DomainError::InvalidPattern {
                        pattern: raw.to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Exact(p) => p == value,
            Pattern::Prefix(p) => value.starts_with(p.as_str()),
            Pattern::Wildcard(re) => re.is_match(value),
        }
    }
}

/// Blocklist supporting exact, prefix (`node:*`) and wildcard (`*_list`) entries
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    patterns: Vec<Pattern>,
}

impl PatternList {
    pub fn new<I, S>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = raw
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| Pattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, value: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(value))
    }

    /// Keep only values that no entry matches
    pub fn filter<'a, I>(&self, values: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        values
            .into_iter()
            .filter(|v| !self.matches(v))
            .cloned()
            .collect()
    }
}
