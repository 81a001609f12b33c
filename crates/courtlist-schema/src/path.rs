//! # Field Paths
//!
//! A [`FieldPath`] addresses zero or more nodes in a JSON document relative
//! to an anchor node. The same type serves two roles:
//!
//! - **Patterns** as written in rule sets: `courtLists[*].courtHouse.name`,
//!   where `[*]` fans out over every element of an array.
//! - **Locations** produced by resolution: `courtLists[0].courtHouse.name`,
//!   built only from keys and concrete indices.
//!
//! Resolution, lookup and removal all live here so that the validator and
//! the fault-injection helpers in tests walk documents the same way.
//!
//! ## Grammar
//!
//! ```text
//! path    := "" | "$" | step ( "." key | "[" index "]" )*
//! step    := key | "[" index "]"
//! index   := "*" | digits
//! ```
//!
//! Keys may contain any character except `.`, `[` and `]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// An object member.
    Key(String),
    /// Every element of an array.
    Each,
    /// One element of an array.
    Index(usize),
}

/// A path through a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<Segment>,
}

/// A path string that does not follow the grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid field path \"{path}\": {reason}")]
pub struct PathParseError {
    /// The rejected input.
    pub path: String,
    /// What is wrong with it.
    pub reason: String,
}

/// JSON value kinds, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    /// The kind of `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

impl std::fmt::Display for JsonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Null => "null",
            Self::Bool => "a boolean",
            Self::Number => "a number",
            Self::String => "a string",
            Self::Array => "an array",
            Self::Object => "an object",
        })
    }
}

/// Why a path could not be followed to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReason {
    /// The member or element does not exist.
    Absent,
    /// The node exists but is `null`.
    Null,
    /// The node exists but cannot contain the next segment.
    WrongKind {
        /// What the next segment needed.
        expected: JsonKind,
        /// What was there instead.
        found: JsonKind,
    },
}

impl std::fmt::Display for MissingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => f.write_str("is missing"),
            Self::Null => f.write_str("is null"),
            Self::WrongKind { expected, found } => write!(f, "expected {expected}, found {found}"),
        }
    }
}

/// One outcome of resolving a path.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    /// The path was followed to the end. The value may itself be `null`.
    Found {
        location: FieldPath,
        value: &'a Value,
    },
    /// The walk stopped early. `location` is the shallowest node that is
    /// absent or unusable; nothing below it is reported.
    Missing {
        location: FieldPath,
        reason: MissingReason,
    },
}

impl FieldPath {
    /// The empty path, addressing the anchor itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path from its textual form.
    pub fn parse(input: &str) -> Result<Self, PathParseError> {
        let err = |reason: &str| PathParseError {
            path: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let mut rest = match trimmed.strip_prefix('$') {
            Some(after) => after.strip_prefix('.').unwrap_or(after),
            None => trimmed,
        };

        let mut segments = Vec::new();
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let close = after.find(']').ok_or_else(|| err("unclosed '['"))?;
                let inner = &after[..close];
                let segment = if inner == "*" {
                    Segment::Each
                } else {
                    let index = inner
                        .parse::<usize>()
                        .map_err(|_| err("array index must be '*' or a non-negative integer"))?;
                    Segment::Index(index)
                };
                segments.push(segment);
                rest = &after[close + 1..];
                continue;
            }

            let body = if segments.is_empty() {
                rest
            } else {
                rest.strip_prefix('.')
                    .ok_or_else(|| err("expected '.' or '[' between segments"))?
            };
            let end = body.find(|c| c == '.' || c == '[').unwrap_or(body.len());
            let key = &body[..end];
            if key.is_empty() {
                return Err(err("empty key"));
            }
            if key.contains(']') {
                return Err(err("unbalanced ']'"));
            }
            segments.push(Segment::Key(key.to_string()));
            rest = &body[end..];
        }

        Ok(Self { segments })
    }

    /// The segments of this path, outermost first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether this is the empty path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the path names exactly one location (no `[*]`).
    pub fn is_concrete(&self) -> bool {
        !self.segments.contains(&Segment::Each)
    }

    /// This path extended by one object key.
    pub fn child_key(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Key(key.to_string()));
        next
    }

    /// This path extended by one array index.
    pub fn child_index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Index(index));
        next
    }

    /// This path followed by `other`.
    pub fn join(&self, other: &FieldPath) -> Self {
        let mut next = self.clone();
        next.segments.extend(other.segments.iter().cloned());
        next
    }

    /// Split into the path of the holding node and the final segment.
    pub fn split_last(&self) -> Option<(FieldPath, &Segment)> {
        let (last, parent) = self.segments.split_last()?;
        Some((
            FieldPath {
                segments: parent.to_vec(),
            },
            last,
        ))
    }

    /// Whether `ancestor` is a proper prefix of this path.
    pub fn is_strictly_below(&self, ancestor: &FieldPath) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments.starts_with(&ancestor.segments)
    }

    /// Resolve against a document, starting from its root.
    pub fn resolve<'a>(&self, document: &'a Value) -> Vec<Resolved<'a>> {
        self.resolve_from(document, FieldPath::root())
    }

    /// Resolve against `node`, whose own location in the document is `base`.
    ///
    /// `[*]` segments fan out, so one path may yield many outcomes, or none
    /// for an empty array.
    pub fn resolve_from<'a>(&self, node: &'a Value, base: FieldPath) -> Vec<Resolved<'a>> {
        let mut out = Vec::new();
        walk(&self.segments, node, base, &mut out);
        out
    }

    /// Concrete locations of every node the path reaches.
    pub fn locate(&self, document: &Value) -> Vec<FieldPath> {
        self.resolve(document)
            .into_iter()
            .filter_map(|r| match r {
                Resolved::Found { location, .. } => Some(location),
                Resolved::Missing { .. } => None,
            })
            .collect()
    }

    /// The single node at a concrete path, if present.
    pub fn get<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let mut node = document;
        for segment in &self.segments {
            node = match (segment, node) {
                (Segment::Key(k), Value::Object(map)) => map.get(k)?,
                (Segment::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Remove every node the path reaches, returning how many were removed.
    ///
    /// A trailing `[*]` empties the array rather than removing it. Removing
    /// the root is a no-op.
    pub fn remove(&self, document: &mut Value) -> usize {
        remove_in(&self.segments, document)
    }

    /// Build a location from a JSON Pointer, as reported by JSON Schema
    /// validation. Numeric tokens become indices.
    pub fn from_json_pointer(pointer: &str) -> Self {
        let segments = pointer
            .split('/')
            .skip(1)
            .map(|token| {
                let token = token.replace("~1", "/").replace("~0", "~");
                match token.parse::<usize>() {
                    Ok(index) => Segment::Index(index),
                    Err(_) => Segment::Key(token),
                }
            })
            .collect();
        Self { segments }
    }
}

fn walk<'a>(segments: &[Segment], node: &'a Value, location: FieldPath, out: &mut Vec<Resolved<'a>>) {
    let Some((head, tail)) = segments.split_first() else {
        out.push(Resolved::Found {
            location,
            value: node,
        });
        return;
    };

    match (head, node) {
        (Segment::Key(key), Value::Object(map)) => match map.get(key) {
            Some(child) => walk(tail, child, location.child_key(key), out),
            None => out.push(Resolved::Missing {
                location: location.child_key(key),
                reason: MissingReason::Absent,
            }),
        },
        (Segment::Each, Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                walk(tail, item, location.child_index(index), out);
            }
        }
        (Segment::Index(index), Value::Array(items)) => match items.get(*index) {
            Some(item) => walk(tail, item, location.child_index(*index), out),
            None => out.push(Resolved::Missing {
                location: location.child_index(*index),
                reason: MissingReason::Absent,
            }),
        },
        (segment, other) => {
            let expected = match segment {
                Segment::Key(_) => JsonKind::Object,
                Segment::Each | Segment::Index(_) => JsonKind::Array,
            };
            let reason = match JsonKind::of(other) {
                JsonKind::Null => MissingReason::Null,
                found => MissingReason::WrongKind { expected, found },
            };
            out.push(Resolved::Missing { location, reason });
        }
    }
}

fn remove_in(segments: &[Segment], node: &mut Value) -> usize {
    match segments {
        [] => 0,
        [last] => match (last, node) {
            (Segment::Key(key), Value::Object(map)) => usize::from(map.remove(key).is_some()),
            (Segment::Index(index), Value::Array(items)) if *index < items.len() => {
                items.remove(*index);
                1
            }
            (Segment::Each, Value::Array(items)) => {
                let removed = items.len();
                items.clear();
                removed
            }
            _ => 0,
        },
        [head, tail @ ..] => match (head, node) {
            (Segment::Key(key), Value::Object(map)) => {
                map.get_mut(key).map_or(0, |child| remove_in(tail, child))
            }
            (Segment::Index(index), Value::Array(items)) => {
                items.get_mut(*index).map_or(0, |child| remove_in(tail, child))
            }
            (Segment::Each, Value::Array(items)) => {
                items.iter_mut().map(|child| remove_in(tail, child)).sum()
            }
            _ => 0,
        },
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Each => f.write_str("[*]")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for FieldPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.to_string()
    }
}
