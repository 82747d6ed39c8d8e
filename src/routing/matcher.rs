//! Route template matching.
//!
//! # Responsibilities
//! - Compile route templates (`/users/:userid`) into segment lists
//! - Match concrete request paths against compiled templates
//! - Reject malformed templates at configuration time
//!
//! # Design Decisions
//! - Templates are parsed once into literal/parameter segments
//! - No regex: separators are never pattern metacharacters
//! - Matching is anchored at both ends (no partial matches)
//! - Path matching is case-sensitive
//! - Parameter values are never extracted, only tested

use std::fmt;
use thiserror::Error;

/// A route template that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedTemplate {
    /// The template was the empty string.
    #[error("route template is empty")]
    Empty,

    /// Templates are absolute paths.
    #[error("route template `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    /// A `:` not followed by a name.
    #[error("route template `{template}` has an empty parameter name at byte {position}")]
    EmptyParameterName { template: String, position: usize },

    /// Parameter name with characters outside `[A-Za-z0-9_-]`.
    #[error("route template `{template}` has an invalid parameter name `{name}`")]
    InvalidParameterName { template: String, name: String },
}

/// One `/`-delimited piece of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Must equal the path segment exactly.
    Literal(String),
    /// Matches any path segment that starts with `prefix` and has at least
    /// one more character.
    Param { prefix: String, name: String },
}

impl Segment {
    fn matches(&self, candidate: &str) -> bool {
        match self {
            Segment::Literal(text) => text == candidate,
            Segment::Param { prefix, .. } => candidate
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| !rest.is_empty()),
        }
    }
}

/// Trait for anything that can test a request path.
pub trait PathMatch {
    /// Returns true if the whole path matches.
    fn test(&self, path: &str) -> bool;
}

/// A compiled route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    template: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a template such as `/auth/:oobcode/reset-password`.
    pub fn compile(template: &str) -> Result<Self, MalformedTemplate> {
        if template.is_empty() {
            return Err(MalformedTemplate::Empty);
        }
        let body = template
            .strip_prefix('/')
            .ok_or_else(|| MalformedTemplate::MissingLeadingSlash(template.to_string()))?;

        let mut segments = Vec::new();
        let mut offset = 1;
        for raw in body.split('/') {
            segments.push(parse_segment(template, raw, offset)?);
            offset += raw.len() + 1;
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Names of the parameter segments, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl PathMatch for RoutePattern {
    fn test(&self, path: &str) -> bool {
        let Some(body) = path.strip_prefix('/') else {
            return false;
        };

        let mut parts = body.split('/');
        for segment in &self.segments {
            match parts.next() {
                Some(part) if segment.matches(part) => {}
                _ => return false,
            }
        }
        // Anything left over means the path is longer than the template.
        parts.next().is_none()
    }
}

impl<T: PathMatch> PathMatch for [T] {
    fn test(&self, path: &str) -> bool {
        self.iter().any(|m| m.test(path))
    }
}

impl<T: PathMatch> PathMatch for Vec<T> {
    fn test(&self, path: &str) -> bool {
        self.as_slice().test(path)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Returns true if `path` matches a single pattern or any of a collection.
pub fn any_match<M: PathMatch + ?Sized>(path: &str, routes: &M) -> bool {
    routes.test(path)
}

/// Compile an ordered list of templates, failing on the first bad one.
pub fn compile_all<S: AsRef<str>>(templates: &[S]) -> Result<Vec<RoutePattern>, MalformedTemplate> {
    templates
        .iter()
        .map(|t| RoutePattern::compile(t.as_ref()))
        .collect()
}

fn parse_segment(template: &str, raw: &str, offset: usize) -> Result<Segment, MalformedTemplate> {
    let Some(colon) = raw.find(':') else {
        return Ok(Segment::Literal(raw.to_string()));
    };

    let name = &raw[colon + 1..];
    if name.is_empty() {
        return Err(MalformedTemplate::EmptyParameterName {
            template: template.to_string(),
            position: offset + colon,
        });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(MalformedTemplate::InvalidParameterName {
            template: template.to_string(),
            name: name.to_string(),
        });
    }

    Ok(Segment::Param {
        prefix: raw[..colon].to_string(),
        name: name.to_string(),
    })
}
