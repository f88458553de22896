//! Random forest adapter: Implementation of `Classifier` over an exported tree ensemble.
//!
//! The model is exported from the training pipeline as plain JSON arrays, one
//! set per tree, in the usual CART layout:
//!
//! - `children_left[i]` / `children_right[i]`: child node ids, `-1` for leaves
//! - `feature[i]` / `threshold[i]`: split column and cut point of internal nodes
//! - `value[i]`: per-class weight at the node
//!
//! Evaluation follows the CART convention: go left when `x[feature] <= threshold`.
//! Leaf distributions are normalised per tree and averaged over the forest; the
//! prediction is the class with the highest mean probability (lowest index on ties).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::adapters::ArtifactError;
use crate::ports::{Classifier, ClassifierError};

/// Marker for "no child" in the exported arrays.
const LEAF: i64 = -1;

/// One exported decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl ExportedTree {
    fn node_count(&self) -> usize {
        self.children_left.len()
    }
}

/// Forest parameters exported by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedForest {
    pub feature_names: Vec<String>,
    /// Class code for each position of a node's `value` vector
    pub classes: Vec<i64>,
    pub trees: Vec<ExportedTree>,
}

/// Random forest classifier loaded from `model.json`.
///
/// Structure is validated once at load time, so evaluation never indexes out of
/// bounds and always terminates.
#[derive(Debug, Clone)]
pub struct RandomForestModel {
    forest: ExportedForest,
}

impl RandomForestModel {
    /// Load and validate a forest from a JSON file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or is structurally invalid.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let forest: ExportedForest = serde_json::from_str(&content)
            .map_err(|e| ArtifactError::Parse(format!("{}: {e}", path.display())))?;

        let model = Self::from_export(forest)?;

        tracing::info!(
            "Loaded model from {:?} (n_trees={}, n_features={}, n_classes={})",
            path,
            model.forest.trees.len(),
            model.n_features(),
            model.forest.classes.len()
        );

        Ok(model)
    }

    /// Validate an in-memory export.
    ///
    /// # Errors
    /// Returns `ArtifactError::InvalidModel` describing the first structural problem.
    pub fn from_export(forest: ExportedForest) -> Result<Self, ArtifactError> {
        if forest.feature_names.is_empty() {
            return Err(ArtifactError::InvalidModel("no feature names".into()));
        }
        if forest.classes.is_empty() {
            return Err(ArtifactError::InvalidModel("no classes".into()));
        }
        if forest.trees.is_empty() {
            return Err(ArtifactError::InvalidModel("forest has no trees".into()));
        }

        let n_features = forest.feature_names.len();
        let n_classes = forest.classes.len();
        for (t, tree) in forest.trees.iter().enumerate() {
            validate_tree(tree, n_features, n_classes)
                .map_err(|reason| ArtifactError::InvalidModel(format!("tree {t}: {reason}")))?;
        }

        Ok(Self { forest })
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.forest.feature_names.len()
    }

    #[must_use]
    pub fn classes(&self) -> &[i64] {
        &self.forest.classes
    }

    /// Mean class probabilities over all trees, aligned with `classes()`.
    ///
    /// # Errors
    /// Returns error if the row has the wrong width or a non-finite value.
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        if features.len() != self.n_features() {
            return Err(ClassifierError::FeatureCount {
                expected: self.n_features(),
                got: features.len(),
            });
        }
        if let Some(index) = features.iter().position(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFinite { index });
        }

        let mut proba = vec![0.0; self.forest.classes.len()];
        for tree in &self.forest.trees {
            let leaf = &tree.value[leaf_index(tree, features)];
            let total: f64 = leaf.iter().sum();
            for (p, weight) in proba.iter_mut().zip(leaf) {
                *p += weight / total;
            }
        }

        let n_trees = self.forest.trees.len() as f64;
        for p in &mut proba {
            *p /= n_trees;
        }
        Ok(proba)
    }
}

impl Classifier for RandomForestModel {
    fn predict_row(&self, features: &[f64]) -> Result<i64, ClassifierError> {
        let proba = self.predict_proba(features)?;

        // First maximum wins, matching argmax.
        let mut best = 0;
        for (i, p) in proba.iter().enumerate().skip(1) {
            if *p > proba[best] {
                best = i;
            }
        }

        self.forest
            .classes
            .get(best)
            .copied()
            .ok_or_else(|| ClassifierError::Model("empty class distribution".into()))
    }

    fn feature_names(&self) -> Option<&[String]> {
        Some(&self.forest.feature_names)
    }
}

/// Walk from the root to the leaf selected by `features`.
fn leaf_index(tree: &ExportedTree, features: &[f64]) -> usize {
    let mut node = 0usize;
    while tree.children_left[node] != LEAF {
        let column = tree.feature[node] as usize;
        node = if features[column] <= tree.threshold[node] {
            tree.children_left[node] as usize
        } else {
            tree.children_right[node] as usize
        };
    }
    node
}

fn validate_tree(tree: &ExportedTree, n_features: usize, n_classes: usize) -> Result<(), String> {
    let n = tree.node_count();
    if n == 0 {
        return Err("no nodes".into());
    }
    if tree.children_right.len() != n
        || tree.feature.len() != n
        || tree.threshold.len() != n
        || tree.value.len() != n
    {
        return Err("node array lengths differ".into());
    }

    for node in 0..n {
        let left = tree.children_left[node];
        let right = tree.children_right[node];

        if left == LEAF || right == LEAF {
            if left != right {
                return Err(format!("node {node} has exactly one child"));
            }
            let weights = &tree.value[node];
            if weights.len() != n_classes {
                return Err(format!(
                    "leaf {node} has {} class weights, expected {n_classes}",
                    weights.len()
                ));
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(format!("leaf {node} has a negative or non-finite weight"));
            }
            if weights.iter().sum::<f64>() <= 0.0 {
                return Err(format!("leaf {node} has zero total weight"));
            }
            continue;
        }

        // Children always come after their parent, which rules out cycles.
        for child in [left, right] {
            if child <= node as i64 || child >= n as i64 {
                return Err(format!("node {node} has invalid child {child}"));
            }
        }
        let column = tree.feature[node];
        if column < 0 || column >= n_features as i64 {
            return Err(format!("node {node} splits on unknown feature {column}"));
        }
        if tree.threshold[node].is_nan() {
            return Err(format!("node {node} has a NaN threshold"));
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Stump splitting column `feature` at `threshold`: left leaf votes `left`, right leaf `right`.
    fn stump(feature: i64, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> ExportedTree {
        ExportedTree {
            children_left: vec![1, LEAF, LEAF],
            children_right: vec![2, LEAF, LEAF],
            feature: vec![feature, -2, -2],
            threshold: vec![threshold, -2.0, -2.0],
            value: vec![vec![1.0, 1.0, 1.0], left, right],
        }
    }

    fn forest(trees: Vec<ExportedTree>) -> ExportedForest {
        ExportedForest {
            feature_names: vec!["a".into(), "b".into()],
            classes: vec![0, 1, 2],
            trees,
        }
    }

    /// Small forest over the eleven encoded columns, used by artifact tests.
    pub(crate) fn demo_forest() -> ExportedForest {
        ExportedForest {
            feature_names: crate::domain::FEATURE_ORDER
                .iter()
                .map(|s| s.to_string())
                .collect(),
            classes: vec![0, 1, 2],
            trees: vec![
                // phValue <= 7.0
                stump(6, 7.0, vec![8.0, 1.0, 1.0], vec![1.0, 1.0, 8.0]),
                // residueCount <= 300
                stump(10, 300.0, vec![5.0, 3.0, 2.0], vec![1.0, 6.0, 3.0]),
            ],
        }
    }

    #[test]
    fn test_single_stump_routes_on_threshold() {
        let model = RandomForestModel::from_export(forest(vec![stump(
            1,
            0.5,
            vec![10.0, 0.0, 0.0],
            vec![0.0, 0.0, 4.0],
        )]))
        .expect("valid forest");

        assert_eq!(model.predict_row(&[9.0, 0.5]).expect("predict"), 0);
        assert_eq!(model.predict_row(&[9.0, 0.6]).expect("predict"), 2);
    }

    #[test]
    fn test_probabilities_are_averaged_over_trees() {
        let model = RandomForestModel::from_export(forest(vec![
            stump(0, 1.0, vec![3.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]),
            stump(0, 1.0, vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]),
        ]))
        .expect("valid forest");

        let proba = model.predict_proba(&[0.0, 0.0]).expect("proba");
        assert!((proba[0] - 0.375).abs() < 1e-12);
        assert!((proba[1] - 0.625).abs() < 1e-12);
        assert!(proba[2].abs() < 1e-12);
        assert_eq!(model.predict_row(&[0.0, 0.0]).expect("predict"), 1);
    }

    #[test]
    fn test_ties_pick_first_class() {
        let model = RandomForestModel::from_export(forest(vec![stump(
            0,
            1.0,
            vec![0.0, 2.0, 2.0],
            vec![1.0, 1.0, 1.0],
        )]))
        .expect("valid forest");

        assert_eq!(model.predict_row(&[0.0, 0.0]).expect("predict"), 1);
        assert_eq!(model.predict_row(&[5.0, 0.0]).expect("predict"), 0);
    }

    #[test]
    fn test_class_codes_come_from_export() {
        let mut export = forest(vec![stump(0, 1.0, vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0])]);
        export.classes = vec![2, 0, 1];
        let model = RandomForestModel::from_export(export).expect("valid forest");

        assert_eq!(model.predict_row(&[0.0, 0.0]).expect("predict"), 2);
        assert_eq!(model.predict_row(&[2.0, 0.0]).expect("predict"), 1);
    }

    #[test]
    fn test_rejects_wrong_row_width_and_nan() {
        let model = RandomForestModel::from_export(demo_forest()).expect("valid forest");

        assert_eq!(
            model.predict_row(&[1.0, 2.0]),
            Err(ClassifierError::FeatureCount {
                expected: 11,
                got: 2
            })
        );

        let mut row = vec![0.0; 11];
        row[3] = f64::NAN;
        assert_eq!(
            model.predict_row(&row),
            Err(ClassifierError::NonFinite { index: 3 })
        );
    }

    #[test]
    fn test_structural_validation() {
        let mut cyclic = stump(0, 1.0, vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]);
        cyclic.children_left[0] = 0;
        assert!(RandomForestModel::from_export(forest(vec![cyclic])).is_err());

        let mut bad_feature = stump(0, 1.0, vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]);
        bad_feature.feature[0] = 5;
        assert!(RandomForestModel::from_export(forest(vec![bad_feature])).is_err());

        let short_leaf = stump(0, 1.0, vec![1.0, 0.0], vec![0.0, 1.0, 0.0]);
        assert!(RandomForestModel::from_export(forest(vec![short_leaf])).is_err());

        let empty_leaf = stump(0, 1.0, vec![0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]);
        assert!(RandomForestModel::from_export(forest(vec![empty_leaf])).is_err());

        assert!(RandomForestModel::from_export(forest(Vec::new())).is_err());
    }

    #[test]
    fn test_declares_feature_names() {
        let model = RandomForestModel::from_export(demo_forest()).expect("valid forest");
        let names = model.feature_names().expect("names");
        assert_eq!(names.len(), 11);
        assert_eq!(names[9], "sequence_length");
    }
}
