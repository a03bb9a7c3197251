//! Tree adapter: Decision-tree and random-forest classifiers.
//!
//! Models are exported from the training pipeline as JSON. Each tree is a
//! binary CART tree: samples with `feature <= threshold` go left.
//!
//! A random forest predicts by majority vote over its trees. Ties go to the
//! lowest class code, so the result never depends on iteration order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ports::Classifier;

/// Internal split node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Index into the feature vector
    pub feature: usize,
    /// Split threshold
    pub threshold: f64,
    /// Subtree for `x[feature] <= threshold`
    pub left: Box<TreeNode>,
    /// Subtree for `x[feature] > threshold`
    pub right: Box<TreeNode>,
}

/// A node in a decision tree (either a split or a leaf).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split(Split),
    Leaf {
        /// Predicted class code
        class: u32,
    },
}

impl TreeNode {
    /// Leaf nodes have depth 0, splits 1 + max(left, right).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf { .. } => 0,
            Self::Split(split) => 1 + split.left.depth().max(split.right.depth()),
        }
    }

    /// Walk the tree for one sample.
    ///
    /// A missing or NaN feature compares false and goes right.
    #[must_use]
    pub fn predict(&self, features: &[f64]) -> u32 {
        let mut node = self;
        loop {
            match node {
                Self::Leaf { class } => return *class,
                Self::Split(split) => {
                    let value = features.get(split.feature).copied().unwrap_or(f64::NAN);
                    node = if value <= split.threshold {
                        &split.left
                    } else {
                        &split.right
                    };
                }
            }
        }
    }

    fn collect_classes(&self, out: &mut BTreeSet<u32>) {
        match self {
            Self::Leaf { class } => {
                out.insert(*class);
            }
            Self::Split(split) => {
                split.left.collect_classes(out);
                split.right.collect_classes(out);
            }
        }
    }

    fn max_feature(&self) -> Option<usize> {
        match self {
            Self::Leaf { .. } => None,
            Self::Split(split) => [
                Some(split.feature),
                split.left.max_feature(),
                split.right.max_feature(),
            ]
            .into_iter()
            .flatten()
            .max(),
        }
    }

    fn has_finite_thresholds(&self) -> bool {
        match self {
            Self::Leaf { .. } => true,
            Self::Split(split) => {
                split.threshold.is_finite()
                    && split.left.has_finite_thresholds()
                    && split.right.has_finite_thresholds()
            }
        }
    }

    /// Check structural sanity against the expected feature count.
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if let Some(max) = self.max_feature() {
            if max >= n_features {
                return Err(format!(
                    "split on feature {max} but model declares {n_features} features"
                ));
            }
        }
        if !self.has_finite_thresholds() {
            return Err("non-finite split threshold".into());
        }
        Ok(())
    }
}

/// Serialized model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    DecisionTree {
        feature_names: Vec<String>,
        tree: TreeNode,
    },
    RandomForest {
        feature_names: Vec<String>,
        trees: Vec<TreeNode>,
    },
}

impl ModelArtifact {
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        match self {
            Self::DecisionTree { feature_names, .. } | Self::RandomForest { feature_names, .. } => {
                feature_names
            }
        }
    }

    /// Turn the artifact into a classifier, checking its structure.
    ///
    /// # Errors
    /// Returns a description of the first structural problem.
    pub fn into_classifier(self) -> Result<Box<dyn Classifier>, String> {
        match self {
            Self::DecisionTree {
                feature_names,
                tree,
            } => Ok(Box::new(DecisionTree::new(feature_names.len(), tree)?)),
            Self::RandomForest {
                feature_names,
                trees,
            } => Ok(Box::new(RandomForest::new(feature_names.len(), trees)?)),
        }
    }
}

/// Single CART decision tree.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    n_features: usize,
    root: TreeNode,
}

impl DecisionTree {
    /// # Errors
    /// Returns error if a split references a feature past `n_features`.
    pub fn new(n_features: usize, root: TreeNode) -> Result<Self, String> {
        root.validate(n_features)?;
        Ok(Self { n_features, root })
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

impl Classifier for DecisionTree {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn output_codes(&self) -> BTreeSet<u32> {
        let mut out = BTreeSet::new();
        self.root.collect_classes(&mut out);
        out
    }

    fn predict(&self, features: &[f64]) -> u32 {
        self.root.predict(features)
    }
}

/// Ensemble of decision trees with majority voting.
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<TreeNode>,
}

impl RandomForest {
    /// # Errors
    /// Returns error if the forest is empty or any tree is malformed.
    pub fn new(n_features: usize, trees: Vec<TreeNode>) -> Result<Self, String> {
        if trees.is_empty() {
            return Err("random forest has no trees".into());
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(n_features).map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(Self { n_features, trees })
    }

    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Vote counts per class for one sample.
    #[must_use]
    pub fn votes(&self, features: &[f64]) -> BTreeMap<u32, usize> {
        let mut votes = BTreeMap::new();
        for tree in &self.trees {
            *votes.entry(tree.predict(features)).or_insert(0) += 1;
        }
        votes
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn output_codes(&self) -> BTreeSet<u32> {
        let mut out = BTreeSet::new();
        for tree in &self.trees {
            tree.collect_classes(&mut out);
        }
        out
    }

    fn predict(&self, features: &[f64]) -> u32 {
        // BTreeMap iterates in ascending class order; only a strictly larger
        // count replaces the current winner.
        let mut best = (0u32, 0usize);
        for (class, count) in self.votes(features) {
            if count > best.1 {
                best = (class, count);
            }
        }
        best.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(class: u32) -> Box<TreeNode> {
        Box::new(TreeNode::Leaf { class })
    }

    fn split(feature: usize, threshold: f64, left: Box<TreeNode>, right: Box<TreeNode>) -> TreeNode {
        TreeNode::Split(Split {
            feature,
            threshold,
            left,
            right,
        })
    }

    #[test]
    fn test_tree_walk() {
        // x0 <= 1.5 ? (x1 <= 10 ? 0 : 1) : 2
        let tree = DecisionTree::new(
            2,
            split(0, 1.5, Box::new(split(1, 10.0, leaf(0), leaf(1))), leaf(2)),
        )
        .expect("valid tree");

        assert_eq!(tree.predict(&[1.0, 5.0]), 0);
        assert_eq!(tree.predict(&[1.5, 10.0]), 0); // threshold is inclusive on the left
        assert_eq!(tree.predict(&[1.0, 11.0]), 1);
        assert_eq!(tree.predict(&[2.0, 0.0]), 2);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.output_codes(), BTreeSet::from([0, 1, 2]));
    }

    #[test]
    fn test_nan_goes_right() {
        let tree = DecisionTree::new(1, split(0, 0.0, leaf(0), leaf(1))).expect("valid tree");
        assert_eq!(tree.predict(&[f64::NAN]), 1);
    }

    #[test]
    fn test_out_of_range_feature_rejected() {
        let err = DecisionTree::new(2, split(5, 0.0, leaf(0), leaf(1))).unwrap_err();
        assert!(err.contains("feature 5"));
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        assert!(DecisionTree::new(1, split(0, f64::INFINITY, leaf(0), leaf(1))).is_err());
    }

    #[test]
    fn test_forest_majority_vote() {
        let forest = RandomForest::new(
            1,
            vec![
                split(0, 0.5, leaf(0), leaf(2)),
                split(0, 0.5, leaf(1), leaf(2)),
                split(0, 0.5, leaf(1), leaf(0)),
            ],
        )
        .expect("valid forest");

        assert_eq!(forest.predict(&[0.0]), 1); // votes: 0, 1, 1
        assert_eq!(forest.predict(&[1.0]), 2); // votes: 2, 2, 0
        assert_eq!(forest.n_estimators(), 3);
    }

    #[test]
    fn test_forest_tie_breaks_to_lowest_code() {
        let forest = RandomForest::new(
            1,
            vec![*leaf(2), *leaf(1), *leaf(2), *leaf(1)],
        )
        .expect("valid forest");

        for _ in 0..10 {
            assert_eq!(forest.predict(&[0.0]), 1);
        }
    }

    #[test]
    fn test_empty_forest_rejected() {
        assert!(RandomForest::new(3, Vec::new()).is_err());
    }

    #[test]
    fn test_artifact_json_format() {
        let json = r#"{
            "kind": "decision_tree",
            "feature_names": ["a", "b"],
            "tree": {"split": {"feature": 1, "threshold": 3.5,
                     "left": {"leaf": {"class": 0}},
                     "right": {"leaf": {"class": 1}}}}
        }"#;
        let artifact: ModelArtifact = serde_json::from_str(json).expect("parse");
        assert_eq!(artifact.feature_names(), ["a", "b"]);

        let model = artifact.into_classifier().expect("valid");
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.predict(&[0.0, 4.0]), 1);
    }
}
