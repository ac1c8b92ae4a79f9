//! Decision tree structures for the traffic classifier
//!
//! Trees are integer-only: thresholds and leaves are fixed-point values at
//! the estimator's scale, and features are scaled the same way before
//! traversal.

use serde::{Deserialize, Serialize};

use super::model::ModelError;

/// A decision tree node (internal or leaf)
///
/// For internal nodes `feature_idx >= 0` indexes the encoded feature vector
/// and `left`/`right` point to child nodes. Leaves carry `feature_idx == -1`
/// and a `leaf` value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    /// Node ID (for reference, not used in traversal)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    #[serde(rename = "feature_idx", alias = "feature")]
    pub feature_idx: i32,

    /// Split threshold (fixed-point)
    pub threshold: i64,

    /// Leaf value (fixed-point)
    pub leaf: Option<i64>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: i64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: i64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single decision tree with integer-only nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,

    /// Tree weight for ensemble aggregation (fixed-point)
    pub weight: i64,
}

impl Tree {
    pub fn new(nodes: Vec<Node>, weight: i64) -> Self {
        Self { nodes, weight }
    }

    /// Walk the tree for one encoded feature vector and return the leaf value.
    ///
    /// Goes left when `feature <= threshold`.
    pub fn evaluate(&self, features: &[i64]) -> Result<i64, ModelError> {
        let mut idx = 0usize;

        loop {
            let node = self.nodes.get(idx).ok_or_else(|| {
                ModelError::Traversal(format!("node index {idx} out of bounds"))
            })?;

            if let Some(value) = node.leaf {
                return Ok(value);
            }

            let feature_value = usize::try_from(node.feature_idx)
                .ok()
                .and_then(|i| features.get(i))
                .ok_or_else(|| {
                    ModelError::Traversal(format!(
                        "node {} reads feature {} but only {} features were supplied",
                        idx,
                        node.feature_idx,
                        features.len()
                    ))
                })?;

            let next = if *feature_value <= node.threshold {
                node.left
            } else {
                node.right
            };
            idx = usize::try_from(next).map_err(|_| {
                ModelError::Traversal(format!("node {idx} has no child {next}"))
            })?;
        }
    }

    /// Validate tree structure against the number of encoded features.
    ///
    /// Children must point forward so every traversal terminates.
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        let len = self.nodes.len() as i64;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.leaf.is_none() {
                    return Err(format!("Leaf node {i} has no leaf value"));
                }
                continue;
            }

            for (side, child) in [("left", node.left), ("right", node.right)] {
                let child = i64::from(child);
                if child <= i as i64 || child >= len {
                    return Err(format!("Node {i} has invalid {side} child: {child}"));
                }
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "Internal node {} has invalid feature index: {} (features: {})",
                    i, node.feature_idx, feature_count
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Tree {
        Tree::new(
            vec![
                Node::internal(0, 0, 50, 1, 2),
                Node::leaf(1, 100),
                Node::leaf(2, 200),
            ],
            1_000_000,
        )
    }

    #[test]
    fn test_node_creation() {
        let internal = Node::internal(0, 3, 12345, 1, 2);
        assert_eq!(internal.feature_idx, 3);
        assert!(!internal.is_leaf());

        let leaf = Node::leaf(1, -234);
        assert_eq!(leaf.feature_idx, -1);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.leaf, Some(-234));
    }

    #[test]
    fn test_tree_evaluation() {
        let tree = stump();
        assert_eq!(tree.evaluate(&[30]).unwrap(), 100);
        assert_eq!(tree.evaluate(&[50]).unwrap(), 100); // equal goes left
        assert_eq!(tree.evaluate(&[60]).unwrap(), 200);
    }

    #[test]
    fn test_missing_feature_is_an_error() {
        let tree = stump();
        assert!(matches!(tree.evaluate(&[]), Err(ModelError::Traversal(_))));
    }

    #[test]
    fn test_tree_validation() {
        assert!(stump().validate(1).is_ok());

        let out_of_bounds = Tree::new(
            vec![
                Node::internal(0, 0, 50, 5, 2),
                Node::leaf(1, 100),
                Node::leaf(2, 200),
            ],
            1_000_000,
        );
        assert!(out_of_bounds.validate(1).is_err());

        // feature index beyond the encoded width
        assert!(stump().validate(0).is_err());
    }

    #[test]
    fn test_backward_child_rejected() {
        let cyclic = Tree::new(
            vec![
                Node::internal(0, 0, 50, 1, 2),
                Node::internal(1, 0, 10, 0, 2),
                Node::leaf(2, 200),
            ],
            1_000_000,
        );
        assert!(cyclic.validate(1).is_err());
    }
}
