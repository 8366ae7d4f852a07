/// Migration unit identifiers
///
/// An identifier is `<prefix>-<name>` where the prefix is a timestamp
/// (`20190115000000`) or a dotted version (`1.4.0`). Ordering compares the
/// numeric prefix segments first, so `1.10.0` sorts after `1.9.0`, and falls
/// back to the name only for equal prefixes.

use crate::error::MigrationError;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MigrationId {
    raw: String,
    prefix: Vec<u64>,
    name_start: usize,
}

impl MigrationId {
    pub fn parse(raw: &str) -> Result<Self, MigrationError> {
        let invalid = || MigrationError::InvalidMigrationId(raw.to_string());

        let (prefix, name) = raw.split_once('-').ok_or_else(invalid)?;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid());
        }

        let segments = prefix
            .split('.')
            .map(|segment| {
                if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                segment.parse::<u64>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            prefix: segments,
            name_start: prefix.len() + 1,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Human part of the identifier, after the ordering prefix
    pub fn name(&self) -> &str {
        &self.raw[self.name_start..]
    }
}

impl Ord for MigrationId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.prefix
            .cmp(&other.prefix)
            .then_with(|| self.name().cmp(other.name()))
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for MigrationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for MigrationId {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MigrationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}
