//! Leaf discovery and Cartesian expansion of dimensioned patterns.

use serde_json::{Map, Value};
use testgen_core::{SpecError, TreePath, Violation, entries, is_wildcard};

use testgen_schema::CompiledSchema;

/// One concrete point of a pattern's product, in field declaration order.
pub type Selection = Map<String, Value>;

/// Field of a pattern with the values it expands to.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub key: String,
    pub values: Vec<Value>,
}

/// A leaf pattern found in the specification.
#[derive(Debug, Clone)]
pub struct LeafPattern<'a> {
    /// Concrete path of the pattern in the specification.
    pub path: TreePath,
    /// Generalized path, the key of the leaf rule.
    pub leaf_path: TreePath,
    /// Named mappings enclosing the pattern, outermost first.
    pub ancestors: Vec<&'a Map<String, Value>>,
    pub dimensions: Vec<Dimension>,
}

impl LeafPattern<'_> {
    pub fn selections(&self) -> Selections<'_> {
        Selections::new(&self.dimensions)
    }
}

/// Finds leaf patterns and expands their fields against the schema's domains.
#[derive(Debug, Clone, Copy)]
pub struct PatternExpander<'s> {
    schema: &'s CompiledSchema,
}

impl<'s> PatternExpander<'s> {
    pub fn new(schema: &'s CompiledSchema) -> Self {
        Self { schema }
    }

    /// Every leaf pattern of `spec`, in document order.
    pub fn leaf_patterns<'a>(&self, spec: &'a Value) -> Result<Vec<LeafPattern<'a>>, SpecError> {
        let mut found = Vec::new();
        self.traverse(spec, &TreePath::root(), &[], &mut found)?;
        Ok(found)
    }

    fn traverse<'a>(
        &self,
        value: &'a Value,
        path: &TreePath,
        ancestors: &[&'a Map<String, Value>],
        found: &mut Vec<LeafPattern<'a>>,
    ) -> Result<(), SpecError> {
        let generic = path.generalize();
        if self.schema.is_leaf(&generic) {
            let pattern = value.as_object().ok_or_else(|| {
                SpecError::new(path.to_string(), Violation::PatternNotDict(path.to_string()))
            })?;
            found.push(LeafPattern {
                path: path.clone(),
                dimensions: self.dimensions(pattern, &generic),
                leaf_path: generic,
                ancestors: ancestors.to_vec(),
            });
            return Ok(());
        }

        // The document root never names its descendants.
        let mut chain = ancestors.to_vec();
        if !path.is_root()
            && let Some(map) = value.as_object()
            && map.contains_key("name")
        {
            chain.push(map);
        }

        for (segment, child) in entries(value) {
            self.traverse(child, &path.child(segment), &chain, found)?;
        }
        Ok(())
    }

    /// Expand each field of `pattern`: a wildcard with a known domain becomes
    /// the domain, a list becomes its elements, anything else stays single.
    pub fn dimensions(&self, pattern: &Map<String, Value>, leaf_path: &TreePath) -> Vec<Dimension> {
        pattern
            .iter()
            .map(|(key, value)| {
                let domain = if is_wildcard(value) {
                    self.schema.domain(&leaf_path.child_key(key))
                } else {
                    None
                };
                let values = match (domain, value) {
                    (Some(domain), _) => domain.to_vec(),
                    (None, Value::Array(items)) => items.clone(),
                    (None, single) => vec![single.clone()],
                };
                Dimension {
                    key: key.clone(),
                    values,
                }
            })
            .collect()
    }
}

/// Odometer over a list of dimensions; the last dimension varies fastest.
///
/// Yields nothing when any dimension is empty and a single empty selection
/// when there are no dimensions.
#[derive(Debug, Clone)]
pub struct Selections<'d> {
    dimensions: &'d [Dimension],
    cursor: Option<Vec<usize>>,
}

impl<'d> Selections<'d> {
    pub fn new(dimensions: &'d [Dimension]) -> Self {
        let cursor = if dimensions.iter().any(|dimension| dimension.values.is_empty()) {
            None
        } else {
            Some(vec![0; dimensions.len()])
        };
        Self { dimensions, cursor }
    }
}

impl Iterator for Selections<'_> {
    type Item = Selection;

    fn next(&mut self) -> Option<Selection> {
        let cursor = self.cursor.as_mut()?;
        let selection = self
            .dimensions
            .iter()
            .zip(cursor.iter())
            .map(|(dimension, &at)| (dimension.key.clone(), dimension.values[at].clone()))
            .collect();

        let mut exhausted = true;
        for (position, dimension) in cursor.iter_mut().zip(self.dimensions).rev() {
            *position += 1;
            if *position < dimension.values.len() {
                exhausted = false;
                break;
            }
            *position = 0;
        }
        if exhausted {
            self.cursor = None;
        }

        Some(selection)
    }
}
