//! Member paths: the dotted chains behind `.Health`, `$.Target.Position`.

use serde::{Deserialize, Serialize};

/// An ordered, non-empty sequence of member-name segments.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberPath(Vec<String>);

impl MemberPath {
    /// Returns `None` for an empty segment list.
    pub fn new(segments: Vec<String>) -> Option<MemberPath> {
        if segments.is_empty() {
            None
        } else {
            Some(MemberPath(segments))
        }
    }

    /// Parses the source text of a member-access token.
    ///
    /// Accepts an optional leading `$` (blackboard access) and leading `.`,
    /// then splits on `.`. Returns `None` when no segments remain.
    pub fn parse(text: &str) -> Option<MemberPath> {
        let text = text.strip_prefix('$').unwrap_or(text);
        let text = text.strip_prefix('.').unwrap_or(text);
        let segments: Vec<String> = text
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        MemberPath::new(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The final segment. Never panics: paths are non-empty by construction.
    pub fn last(&self) -> &str {
        self.0.last().expect("member paths are non-empty")
    }

    /// All segments but the last.
    pub fn prefix(&self) -> &[String] {
        &self.0[..self.0.len() - 1]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl std::fmt::Display for MemberPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ".{}", self.0.join("."))
    }
}
