//! Canonical identifier grammar: `Input:<Name>`, `Producer:<Alias>`,
//! `Artifact:<ProducerAlias>.<OutputName>[<dim>]…`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A canonical identifier failed the grammar check in [`ids`](self).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("identifier is missing the required `{0}:` prefix: {1}")]
    MissingPrefix(&'static str, String),
    #[error("identifier has an empty name: {0}")]
    EmptyName(String),
    #[error("identifier contains an invalid segment `{1}`: {0}")]
    InvalidSegment(String, String),
    #[error("identifier has unbalanced `[` `]` brackets: {0}")]
    UnbalancedBrackets(String),
}

fn validate_segment(segment: &str, full: &str) -> Result<(), IdError> {
    if segment.is_empty() {
        return Err(IdError::InvalidSegment(full.to_string(), segment.to_string()));
    }
    let ok = segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !ok {
        return Err(IdError::InvalidSegment(full.to_string(), segment.to_string()));
    }
    Ok(())
}

/// Splits a dotted, bracketed name into plain segments and loop indices,
/// validating bracket balance along the way.
fn validate_name(name: &str, full: &str) -> Result<(), IdError> {
    if name.is_empty() {
        return Err(IdError::EmptyName(full.to_string()));
    }
    let mut depth = 0i32;
    let mut current = String::new();
    for c in name.chars() {
        match c {
            '[' => {
                if depth == 0 && !current.is_empty() {
                    for seg in current.split('.') {
                        validate_segment(seg, full)?;
                    }
                    current.clear();
                }
                depth += 1;
            }
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(IdError::UnbalancedBrackets(full.to_string()));
                }
                if !current.chars().all(|c| c.is_ascii_digit()) || current.is_empty() {
                    return Err(IdError::InvalidSegment(full.to_string(), current.clone()));
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if depth != 0 {
        return Err(IdError::UnbalancedBrackets(full.to_string()));
    }
    if !current.is_empty() {
        for seg in current.split('.') {
            validate_segment(seg, full)?;
        }
    }
    Ok(())
}

macro_rules! canonical_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validates and wraps a fully-qualified canonical identifier (including prefix).
            pub fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
                let raw = raw.into();
                let rest = raw
                    .strip_prefix(concat!($prefix, ":"))
                    .ok_or_else(|| IdError::MissingPrefix($prefix, raw.clone()))?;
                validate_name(rest, &raw)?;
                Ok(Self(raw))
            }

            /// Builds a canonical identifier from an already-validated name, adding the prefix.
            pub fn from_name(name: impl AsRef<str>) -> Result<Self, IdError> {
                Self::parse(format!(concat!($prefix, ":{}"), name.as_ref()))
            }

            /// The name portion, without the `Prefix:` tag.
            pub fn name(&self) -> &str {
                &self.0[concat!($prefix, ":").len()..]
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }
    };
}

canonical_id!(InputId, "Input");
canonical_id!(ProducerId, "Producer");
canonical_id!(ArtifactId, "Artifact");

impl ArtifactId {
    /// Appends loop-dimension indices, e.g. turns `Artifact:P.Out` + `[0, 2]`
    /// into `Artifact:P.Out[0][2]`.
    pub fn with_indices(base: &str, indices: &[usize]) -> Result<Self, IdError> {
        let mut s = base.to_string();
        for i in indices {
            s.push('[');
            s.push_str(&i.to_string());
            s.push(']');
        }
        Self::from_name(s.strip_prefix("Artifact:").unwrap_or(&s))
    }

    /// Appends a dotted virtual sub-path before any trailing bracket indices,
    /// e.g. `Artifact:P.Out[0]` + `"segments"` -> `Artifact:P.Out.segments[0]`.
    pub fn with_virtual_subpath(&self, subpath: &str) -> Result<Self, IdError> {
        let name = self.name();
        let bracket_start = name.find('[').unwrap_or(name.len());
        let (head, tail) = name.split_at(bracket_start);
        Self::from_name(format!("{head}.{subpath}{tail}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_ids() {
        assert!(InputId::parse("Input:Theme").is_ok());
        assert!(ProducerId::parse("Producer:Scene.Render").is_ok());
        assert!(ArtifactId::parse("Artifact:Scene.Render.Image[0][3]").is_ok());
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(matches!(
            InputId::parse("Theme"),
            Err(IdError::MissingPrefix("Input", _))
        ));
    }

    #[test]
    fn rejects_unbalanced_brackets() {
        assert!(ArtifactId::parse("Artifact:P.Out[0").is_err());
        assert!(ArtifactId::parse("Artifact:P.Out0]").is_err());
    }

    #[test]
    fn rejects_non_numeric_index() {
        assert!(ArtifactId::parse("Artifact:P.Out[x]").is_err());
    }

    #[test]
    fn with_indices_round_trips() {
        let id = ArtifactId::with_indices("P.Out", &[1, 2]).unwrap();
        assert_eq!(id.as_str(), "Artifact:P.Out[1][2]");
    }

    #[test]
    fn with_virtual_subpath_inserts_before_brackets() {
        let id = ArtifactId::from_name("P.Out[0]").unwrap();
        let sub = id.with_virtual_subpath("segments").unwrap();
        assert_eq!(sub.as_str(), "Artifact:P.Out.segments[0]");
    }

    proptest::proptest! {
        #[test]
        fn valid_segment_names_always_parse(name in "[a-zA-Z][a-zA-Z0-9_-]{0,12}") {
            proptest::prop_assert!(InputId::from_name(&name).is_ok());
        }
    }
}
