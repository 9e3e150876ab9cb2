//! Word-boundary table: the position of each phone within a word.
//!
//! Read from `word_boundary.int`, one `<phone-id> <type>` pair per line, where
//! type is one of `nonword`, `begin`, `end`, `internal`, `singleton`.

use crate::error::ModelError;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Position of a phone relative to word boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhoneBoundary {
    /// Silence or noise, never part of a word
    Nonword,
    /// First phone of a multi-phone word
    Begin,
    /// Last phone of a multi-phone word
    End,
    /// Neither first nor last
    Internal,
    /// The whole word
    Singleton,
}

impl FromStr for PhoneBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nonword" => Ok(Self::Nonword),
            "begin" => Ok(Self::Begin),
            "end" => Ok(Self::End),
            "internal" => Ok(Self::Internal),
            "singleton" => Ok(Self::Singleton),
            other => Err(format!("unknown boundary type {other:?}")),
        }
    }
}

/// Phone → boundary lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WordBoundaryTable {
    phones: HashMap<u32, PhoneBoundary>,
}

impl WordBoundaryTable {
    /// Parse the text form. `path` is used in error messages only.
    pub fn parse(path: &Path, text: &str) -> Result<Self, ModelError> {
        let mut phones = HashMap::new();

        for (i, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();

            let (phone, kind) = match (fields.next(), fields.next(), fields.next()) {
                (None, ..) => continue,
                (Some(phone), Some(kind), None) => (phone, kind),
                _ => {
                    return Err(ModelError::InvalidTable {
                        path: path.to_path_buf(),
                        line: i + 1,
                        reason: "expected `<phone> <type>`".to_string(),
                    });
                }
            };

            let invalid = |reason: String| ModelError::InvalidTable {
                path: path.to_path_buf(),
                line: i + 1,
                reason,
            };

            let phone: u32 = phone
                .parse()
                .map_err(|_| invalid(format!("invalid phone id {phone:?}")))?;
            let kind: PhoneBoundary = kind.parse().map_err(invalid)?;

            phones.insert(phone, kind);
        }

        Ok(Self { phones })
    }

    /// Read `word_boundary.int`.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
        Self::parse(path, &text)
    }

    /// Boundary type of `phone`, if listed.
    pub fn get(&self, phone: u32) -> Option<PhoneBoundary> {
        self.phones.get(&phone).copied()
    }

    pub fn len(&self) -> usize {
        self.phones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phones.is_empty()
    }
}

impl FromIterator<(u32, PhoneBoundary)> for WordBoundaryTable {
    fn from_iter<I: IntoIterator<Item = (u32, PhoneBoundary)>>(iter: I) -> Self {
        Self {
            phones: iter.into_iter().collect(),
        }
    }
}
