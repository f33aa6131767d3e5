//! Organization hierarchy seam used for routing and authorization fallback.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

/// Read-only view of the organization directory.
///
/// `ancestors` returns the chain above `id`, nearest ancestor first. Unknown
/// identifiers yield an empty chain.
pub trait HierarchyLookup: Send + Sync {
    fn ancestors(&self, id: &str) -> Vec<String>;
}

/// Directory with no structure; every identifier is a root.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHierarchy;

impl HierarchyLookup for NoHierarchy {
    fn ancestors(&self, _id: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Fixed ancestor chains keyed by identifier.
#[derive(Clone, Debug, Default)]
pub struct StaticHierarchy {
    chains: HashMap<String, Vec<String>>,
}

#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize hierarchy: {0}")]
    Deserialize(String),
}

impl StaticHierarchy {
    pub fn new(chains: HashMap<String, Vec<String>>) -> Self {
        Self { chains }
    }

    /// Registers `parent` as the direct parent of `child`.
    ///
    /// The child's chain becomes `parent` followed by the parent's own chain
    /// as known at insertion time, so parents should be inserted first.
    pub fn with_parent(mut self, child: impl Into<String>, parent: impl Into<String>) -> Self {
        let parent = parent.into();
        let mut chain = vec![parent.clone()];
        chain.extend(self.chains.get(&parent).cloned().unwrap_or_default());
        self.chains.insert(child.into(), chain);
        self
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, HierarchyError> {
        let mut buf = String::new();
        File::open(path.as_ref())?.read_to_string(&mut buf)?;
        Self::parse_str(&buf)
    }

    /// Accepts a JSON or YAML map of `id -> [ancestor, ...]`.
    pub fn parse_str(raw: &str) -> Result<Self, HierarchyError> {
        let chains: HashMap<String, Vec<String>> = match serde_json::from_str(raw) {
            Ok(chains) => chains,
            Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
                HierarchyError::Deserialize(format!(
                    "json error: {}; yaml error: {}",
                    json_err, yaml_err
                ))
            })?,
        };
        Ok(Self::new(chains))
    }
}

impl HierarchyLookup for StaticHierarchy {
    fn ancestors(&self, id: &str) -> Vec<String> {
        self.chains.get(id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_parent_builds_nearest_first_chain() {
        let hierarchy = StaticHierarchy::default()
            .with_parent("region", "country")
            .with_parent("clinic", "region");
        assert_eq!(
            hierarchy.ancestors("clinic"),
            vec!["region".to_string(), "country".to_string()]
        );
        assert!(hierarchy.ancestors("country").is_empty());
    }

    #[test]
    fn parse_accepts_yaml_and_json() {
        let yaml = "clinic:\n  - region\n  - country\n";
        let json = r#"{"clinic": ["region", "country"]}"#;
        let from_yaml = StaticHierarchy::parse_str(yaml).unwrap();
        let from_json = StaticHierarchy::parse_str(json).unwrap();
        assert_eq!(from_yaml.ancestors("clinic"), from_json.ancestors("clinic"));
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = StaticHierarchy::parse_str("- just\n- a list\n").unwrap_err();
        assert!(matches!(err, HierarchyError::Deserialize(_)));
    }
}
