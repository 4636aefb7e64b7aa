use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::treeshap;
use super::{ensure_feature_count, ModelError, RiskModel};
use crate::assessment::encoding::Feature;

const DEFAULT_KIND: &str = "RandomForestClassifier";

/// Node of a binary decision tree. Samples with `x[feature] <= threshold`
/// follow `left`; every node records how many training samples reached it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

impl TreeNode {
    pub fn cover(&self) -> f64 {
        match self {
            TreeNode::Split { cover, .. } | TreeNode::Leaf { cover, .. } => *cover,
        }
    }
}

/// Flat node arena rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub(crate) fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Mean leaf value weighted by how often training samples reach each leaf.
    pub(crate) fn expected_value(&self) -> f64 {
        self.expected_value_from(0)
    }

    fn expected_value_from(&self, index: usize) -> f64 {
        match &self.nodes[index] {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split { left, right, .. } => {
                let left_cover = self.nodes[*left].cover();
                let right_cover = self.nodes[*right].cover();
                (left_cover * self.expected_value_from(*left)
                    + right_cover * self.expected_value_from(*right))
                    / (left_cover + right_cover)
            }
        }
    }

    fn validate(&self, tree_index: usize, column_count: usize) -> Result<(), ModelError> {
        let invalid = |node: usize, detail: String| {
            ModelError::Invalid(format!("tree {tree_index} node {node}: {detail}"))
        };

        if self.nodes.is_empty() {
            return Err(ModelError::Invalid(format!("tree {tree_index} has no nodes")));
        }

        let mut parents = vec![0usize; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            let cover = node.cover();
            if !cover.is_finite() || cover <= 0.0 {
                return Err(invalid(index, format!("cover {cover} must be positive")));
            }

            match node {
                TreeNode::Leaf { value, .. } => {
                    if !(0.0..=1.0).contains(value) {
                        return Err(invalid(index, format!("leaf value {value} outside [0, 1]")));
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= column_count {
                        return Err(invalid(
                            index,
                            format!("feature column {feature} out of range"),
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(index, "threshold must be finite".to_string()));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(invalid(index, format!("child {child} out of order")));
                        }
                        parents[child] += 1;
                    }
                    if left == right {
                        return Err(invalid(index, "children must differ".to_string()));
                    }
                }
            }
        }

        if let Some(orphan) = parents
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, count)| **count != 1)
            .map(|(index, _)| index)
        {
            return Err(invalid(orphan, "node must have exactly one parent".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ForestDefinition {
    version: String,
    #[serde(default)]
    kind: Option<String>,
    feature_names: Vec<String>,
    trees: Vec<DecisionTree>,
}

/// Ensemble of decision trees whose leaves hold the probability of dropout.
/// The ensemble output is the mean over its trees.
#[derive(Debug, Clone)]
pub struct DecisionForest {
    version: String,
    kind: String,
    columns: Vec<Feature>,
    trees: Vec<DecisionTree>,
}

impl DecisionForest {
    pub fn new(
        version: impl Into<String>,
        columns: Vec<Feature>,
        trees: Vec<DecisionTree>,
    ) -> Result<Self, ModelError> {
        let forest = Self {
            version: version.into(),
            kind: DEFAULT_KIND.to_string(),
            columns,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let definition: ForestDefinition = serde_json::from_str(raw)?;

        let columns = definition
            .feature_names
            .iter()
            .map(|name| Feature::from_name(name).ok_or_else(|| ModelError::UnknownFeature(name.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        let forest = Self {
            version: definition.version,
            kind: definition.kind.unwrap_or_else(|| DEFAULT_KIND.to_string()),
            columns,
            trees: definition.trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn columns(&self) -> &[Feature] {
        &self.columns
    }

    /// Average cover-weighted prediction; the baseline exact attributions explain against.
    pub fn expected_value(&self) -> f64 {
        let total: f64 = self.trees.iter().map(DecisionTree::expected_value).sum();
        total / self.trees.len() as f64
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.version.trim().is_empty() {
            return Err(ModelError::Invalid("version must not be empty".to_string()));
        }
        if self.columns.is_empty() {
            return Err(ModelError::Invalid("model declares no features".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = self.columns.iter().find(|feature| !seen.insert(**feature)) {
            return Err(ModelError::Invalid(format!(
                "feature '{}' declared twice",
                duplicate.name()
            )));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".to_string()));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(index, self.columns.len())?;
        }
        Ok(())
    }

    /// Reorders a schema-ordered vector into the model's column order.
    fn project(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        ensure_feature_count(features)?;
        Ok(self
            .columns
            .iter()
            .map(|feature| features[feature.index()])
            .collect())
    }
}

impl RiskModel for DecisionForest {
    fn version(&self) -> &str {
        &self.version
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn feature_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|feature| feature.name()).collect()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError> {
        let row = self.project(features)?;
        let total: f64 = self.trees.iter().map(|tree| tree.predict(&row)).sum();
        let probability = total / self.trees.len() as f64;
        if probability.is_finite() {
            Ok(probability.clamp(0.0, 1.0))
        } else {
            Err(ModelError::NonFiniteOutput)
        }
    }

    fn contributions(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        let row = self.project(features)?;
        let mut column_phi = vec![0.0; self.columns.len()];
        for tree in &self.trees {
            treeshap::accumulate(tree, &row, &mut column_phi);
        }

        let scale = self.trees.len() as f64;
        let mut phi = vec![0.0; features.len()];
        for (feature, value) in self.columns.iter().zip(column_phi) {
            let value = value / scale;
            if !value.is_finite() {
                return Err(ModelError::NonFiniteOutput);
            }
            phi[feature.index()] = value;
        }
        Ok(phi)
    }

    fn supports_contributions(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::encoding::FEATURE_COUNT;

    const STUMP: &str = r#"{
        "version": "stump-1",
        "feature_names": ["AvgAttendance_LatestTerm"],
        "trees": [{
            "nodes": [
                {"kind": "split", "feature": 0, "threshold": 60.0, "left": 1, "right": 2, "cover": 100.0},
                {"kind": "leaf", "value": 0.9, "cover": 60.0},
                {"kind": "leaf", "value": 0.3, "cover": 40.0}
            ]
        }]
    }"#;

    fn with_attendance(attendance: f64) -> Vec<f64> {
        let mut row = vec![0.0; FEATURE_COUNT];
        row[Feature::AvgAttendanceLatestTerm.index()] = attendance;
        row
    }

    #[test]
    fn threshold_is_inclusive_on_the_left() {
        let forest = DecisionForest::from_json(STUMP).expect("valid stump");

        assert_eq!(forest.predict_proba(&with_attendance(60.0)).expect("predicts"), 0.9);
        assert_eq!(forest.predict_proba(&with_attendance(60.5)).expect("predicts"), 0.3);
        assert_eq!(forest.kind(), DEFAULT_KIND);
        assert_eq!(forest.feature_names(), vec!["AvgAttendance_LatestTerm"]);
    }

    #[test]
    fn unknown_feature_names_are_rejected() {
        let raw = STUMP.replace("AvgAttendance_LatestTerm", "ShoeSize");
        assert!(matches!(
            DecisionForest::from_json(&raw),
            Err(ModelError::UnknownFeature(name)) if name == "ShoeSize"
        ));
    }

    #[test]
    fn malformed_node_graphs_are_rejected() {
        let backwards = STUMP.replace(r#""left": 1"#, r#""left": 0"#);
        assert!(matches!(
            DecisionForest::from_json(&backwards),
            Err(ModelError::Invalid(_))
        ));

        let bad_leaf = STUMP.replace(r#""value": 0.9"#, r#""value": 1.5"#);
        assert!(matches!(
            DecisionForest::from_json(&bad_leaf),
            Err(ModelError::Invalid(_))
        ));

        let bad_column = STUMP.replace(r#""feature": 0"#, r#""feature": 4"#);
        assert!(matches!(
            DecisionForest::from_json(&bad_column),
            Err(ModelError::Invalid(_))
        ));

        assert!(matches!(
            DecisionForest::from_json("{not json"),
            Err(ModelError::Parse(_))
        ));
    }

    #[test]
    fn expected_value_weights_leaves_by_cover() {
        let forest = DecisionForest::from_json(STUMP).expect("valid stump");
        assert!((forest.expected_value() - 0.66).abs() < 1e-12);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let error = DecisionForest::from_path("/definitely/not/here.json").expect_err("missing");
        assert!(error.to_string().contains("/definitely/not/here.json"));
    }
}
