//! Path pattern parsing.
//!
//! # Syntax
//! - Patterns start with `/`; `/` alone is the root pattern
//! - `:name` segments are parameters, anything else is a literal
//! - Literals are RFC 3986 path characters (`pchar`) without `:` and `*`;
//!   other bytes must be percent-encoded, exactly as a client sends them
//! - Empty segments (`//`, trailing `/`) are rejected
//!
//! # Design Decisions
//! - Parameter names are kept for extraction but ignored by [`PathPattern::shape`]
//! - Parsing is the only place a pattern is validated; compiled tables trust it

use std::fmt;

/// Error produced when a path pattern is not well-formed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    #[error("pattern {0:?} contains an empty segment")]
    EmptySegment(String),

    #[error("pattern {pattern:?} has an invalid parameter name {name:?}")]
    InvalidParamName { pattern: String, name: String },

    #[error("pattern {pattern:?} repeats parameter {name:?}")]
    DuplicateParam { pattern: String, name: String },

    #[error("pattern {pattern:?} has an invalid literal segment {segment:?}")]
    InvalidLiteral { pattern: String, segment: String },
}

/// One segment of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// Segment kind with parameter names erased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeSegment {
    Literal(String),
    Param,
}

/// A parsed `:param` path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern such as `/accounts/:id/transfers`.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let rest = raw
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(raw.to_string()))?;

        let mut segments = Vec::new();
        if !rest.is_empty() {
            for part in rest.split('/') {
                if part.is_empty() {
                    return Err(PatternError::EmptySegment(raw.to_string()));
                }
                segments.push(parse_segment(raw, part)?);
            }
        }

        let mut seen: Vec<&str> = Vec::new();
        for segment in &segments {
            if let Segment::Param(name) = segment {
                if seen.contains(&name.as_str()) {
                    return Err(PatternError::DuplicateParam {
                        pattern: raw.to_string(),
                        name: name.clone(),
                    });
                }
                seen.push(name);
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The pattern with parameter names collapsed, used for conflict detection.
    pub fn shape(&self) -> Vec<ShapeSegment> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => ShapeSegment::Literal(l.clone()),
                Segment::Param(_) => ShapeSegment::Param,
            })
            .collect()
    }

    /// Parameter names in positional order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(raw: &str, part: &str) -> Result<Segment, PatternError> {
    if let Some(name) = part.strip_prefix(':') {
        let mut chars = name.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(PatternError::InvalidParamName {
                pattern: raw.to_string(),
                name: name.to_string(),
            });
        }
        return Ok(Segment::Param(name.to_string()));
    }

    if !is_literal(part) {
        return Err(PatternError::InvalidLiteral {
            pattern: raw.to_string(),
            segment: part.to_string(),
        });
    }
    Ok(Segment::Literal(part.to_string()))
}

/// `pchar` minus `:` (parameter marker) and `*` (reserved for wildcards).
fn is_literal(segment: &str) -> bool {
    let mut bytes = segment.bytes();
    while let Some(b) = bytes.next() {
        let valid = match b {
            b'%' => {
                bytes.next().is_some_and(|h| h.is_ascii_hexdigit())
                    && bytes.next().is_some_and(|l| l.is_ascii_hexdigit())
            }
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => true,
            b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'+' | b',' | b';' | b'=' | b'@' => true,
            _ => false,
        };
        if !valid {
            return false;
        }
    }
    true
}

/// Split a request path into segments.
///
/// Returns `None` for paths that can never match a pattern (no leading slash,
/// empty segments).
pub fn split_request_path(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix('/')?;
    if rest.is_empty() {
        return Some(Vec::new());
    }
    let parts: Vec<&str> = rest.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}
