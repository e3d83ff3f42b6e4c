use std::fmt;

use serde::{Serialize, Serializer};

/// One step of a tree path.
///
/// `Key("*")` never exists: the wildcard always uses its own variant so that
/// schema paths and generalized specification paths compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

impl Segment {
    pub fn key(key: &str) -> Self {
        if key == "*" {
            Segment::Wildcard
        } else {
            Segment::Key(key.to_string())
        }
    }

    fn generalize(&self) -> Self {
        match self {
            Segment::Index(_) | Segment::Wildcard => Segment::Wildcard,
            Segment::Key(key) if is_numeric(key) => Segment::Wildcard,
            Segment::Key(key) => Segment::Key(key.clone()),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{index}"),
            Segment::Wildcard => f.write_str("*"),
        }
    }
}

/// Ordered segment list addressing a node in a specification or schema tree.
///
/// Renders as `/a/b/0`; the root renders as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreePath {
    segments: Vec<Segment>,
}

impl TreePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-separated path, dropping empty segments.
    pub fn parse(raw: &str) -> Self {
        Self {
            segments: raw
                .split('/')
                .filter(|part| !part.is_empty())
                .map(Segment::key)
                .collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn child_key(&self, key: &str) -> Self {
        self.child(Segment::key(key))
    }

    pub fn child_index(&self, index: usize) -> Self {
        self.child(Segment::Index(index))
    }

    pub fn join(&self, other: &TreePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Fold every array index and numeric key into the wildcard segment.
    pub fn generalize(&self) -> Self {
        Self {
            segments: self.segments.iter().map(Segment::generalize).collect(),
        }
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for TreePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn is_numeric(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|byte| byte.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_slashes() {
        assert_eq!(TreePath::parse("").to_string(), "/");
        assert_eq!(TreePath::parse("/").to_string(), "/");
        assert_eq!(TreePath::parse("//specification/*").to_string(), "/specification/*");
        assert_eq!(
            TreePath::parse("/specification/*"),
            TreePath::root().child_key("specification").child(Segment::Wildcard)
        );
    }

    #[test]
    fn generalize_folds_indices_and_is_idempotent() {
        let path = TreePath::root()
            .child_key("specification")
            .child_index(3)
            .child_key("test_expansion")
            .child_key("12");
        let generic = path.generalize();

        assert_eq!(generic.to_string(), "/specification/*/test_expansion/*");
        assert_eq!(generic.generalize(), generic);
        assert_eq!(generic, TreePath::parse("/specification/*/test_expansion/*"));
    }

    #[test]
    fn keys_with_separators_stay_single_segments() {
        let path = TreePath::root().child_key("a/b");
        assert_eq!(path.segments().len(), 1);
        assert_ne!(path, TreePath::parse("/a/b"));
    }
}
