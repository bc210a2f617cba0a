//! Inference over a pre-trained random-forest syndrome classifier.
//!
//! The model is trained offline and exported as a single JSON artifact carrying the feature
//! order, the label encoders of the categorical features, the target classes and every tree
//! in array form (`children_left`, `children_right`, `feature`, `threshold`, `value`).
//!
//! A node `n` is a leaf when `children_left[n] == -1`. Internal nodes send a sample left
//! when `x[feature[n]] <= threshold[n]`. The forest probability is the mean of the
//! normalised leaf class weights over all trees.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Structural-finding fields of the prediction form, each answered with [`BINARY_OPTIONS`].
pub const FORM_CATEGORICAL_FEATURES: &[&str] = &[
    "Holoprosensefali",
    "Yarık damak/dudak",
    "Polidaktili",
    "Polikistik böbrek",
    "Kardiyak defekt",
    "Omfalosel",
    "Mikrosefali",
    "Cystic hygroma",
    "Tek umbilikal arter",
    "IUGR",
];

/// Fetal sex field of the prediction form, answered with [`SEX_OPTIONS`].
pub const SEX_FEATURE: &str = "Cinsiyet";

/// Numeric fields of the prediction form.
pub const FORM_NUMERIC_FEATURES: &[&str] = &[
    "β-hCG",
    "PAPP-A",
    "NT (Ense kalınlığı)",
    "FL (Femur uzunluğu)",
    "Anne yaşı",
    "CRL",
];

pub const BINARY_OPTIONS: &[&str] = &["Var", "Yok"];
pub const SEX_OPTIONS: &[&str] = &["Kız", "Erkek"];

/// A single form answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

/// Form answers keyed by feature name.
pub type ModelInput = BTreeMap<String, FeatureValue>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    pub class: String,
    pub probability: f64,
}

impl ClassProbability {
    /// Probability as a percentage rounded to two decimals.
    pub fn percent(&self) -> f64 {
        (self.probability * 10_000.0).round() / 100.0
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Class weights per node, `value[node][class]`.
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn validate(&self, index: usize, n_features: usize, n_classes: usize) -> CoreResult<()> {
        let n = self.children_left.len();
        let invalid = |msg: String| CoreError::InvalidModel(format!("tree {index}: {msg}"));

        if n == 0 {
            return Err(invalid("has no nodes".into()));
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err(invalid("node arrays have different lengths".into()));
        }

        for node in 0..n {
            let left = self.children_left[node];
            let right = self.children_right[node];
            if left == -1 {
                let weights = &self.value[node];
                if weights.len() != n_classes {
                    return Err(invalid(format!(
                        "leaf {node} has {} class weights, expected {n_classes}",
                        weights.len()
                    )));
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(invalid(format!("leaf {node} has an invalid class weight")));
                }
                continue;
            }

            // Children must point forward so traversal always terminates.
            let in_range = |child: i64| child > node as i64 && (child as usize) < n;
            if !in_range(left) || !in_range(right) {
                return Err(invalid(format!("node {node} has out-of-range children")));
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(invalid(format!("node {node} splits on unknown feature")));
            }
        }

        Ok(())
    }

    fn leaf_distribution(&self, x: &[f64]) -> Vec<f64> {
        let mut node = 0usize;
        while self.children_left[node] != -1 {
            let feature = self.feature[node] as usize;
            node = if x[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        let weights = &self.value[node];
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            weights.iter().map(|w| w / total).collect()
        } else {
            vec![1.0 / weights.len() as f64; weights.len()]
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ForestModel {
    pub feature_order: Vec<String>,
    /// Ordered category labels; a label encodes to its index.
    #[serde(default)]
    pub encoders: BTreeMap<String, Vec<String>>,
    pub classes: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    pub fn load(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(CoreError::FileRead)?;
        let model = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            trees = model.trees.len(),
            classes = model.classes.len(),
            "loaded classifier artifact"
        );
        Ok(model)
    }

    pub fn from_json(raw: &str) -> CoreResult<Self> {
        let model: Self = serde_json::from_str(raw).map_err(CoreError::JsonDeserialization)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.classes.is_empty() {
            return Err(CoreError::InvalidModel("no target classes".into()));
        }
        if self.trees.is_empty() {
            return Err(CoreError::InvalidModel("no trees".into()));
        }
        if self.feature_order.is_empty() {
            return Err(CoreError::InvalidModel("empty feature order".into()));
        }
        if let Some(name) = self
            .encoders
            .keys()
            .find(|name| !self.feature_order.contains(name))
        {
            return Err(CoreError::InvalidModel(format!(
                "encoder for unknown feature '{name}'"
            )));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(index, self.feature_order.len(), self.classes.len())?;
        }
        Ok(())
    }

    /// Orders and encodes form answers into the model's feature vector.
    pub fn encode(&self, input: &ModelInput) -> CoreResult<Vec<f64>> {
        self.feature_order
            .iter()
            .map(|name| {
                let value = input
                    .get(name)
                    .ok_or_else(|| CoreError::Model(format!("missing feature '{name}'")))?;

                match (self.encoders.get(name), value) {
                    (Some(labels), FeatureValue::Category(label)) => labels
                        .iter()
                        .position(|l| l == label)
                        .map(|i| i as f64)
                        .ok_or_else(|| {
                            CoreError::Model(format!("unknown value '{label}' for '{name}'"))
                        }),
                    (Some(_), FeatureValue::Number(_)) => Err(CoreError::Model(format!(
                        "feature '{name}' expects a category"
                    ))),
                    (None, FeatureValue::Number(v)) if v.is_finite() => Ok(*v),
                    (None, FeatureValue::Number(_)) => Err(CoreError::Model(format!(
                        "feature '{name}' is not a finite number"
                    ))),
                    (None, FeatureValue::Category(_)) => Err(CoreError::Model(format!(
                        "feature '{name}' expects a number"
                    ))),
                }
            })
            .collect()
    }

    /// Class probabilities, highest first.
    pub fn predict_proba(&self, input: &ModelInput) -> CoreResult<Vec<ClassProbability>> {
        let x = self.encode(input)?;

        let mut sums = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (sum, p) in sums.iter_mut().zip(tree.leaf_distribution(&x)) {
                *sum += p;
            }
        }

        let n_trees = self.trees.len() as f64;
        let mut probabilities: Vec<ClassProbability> = self
            .classes
            .iter()
            .zip(sums)
            .map(|(class, sum)| ClassProbability {
                class: class.clone(),
                probability: sum / n_trees,
            })
            .collect();
        probabilities.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        Ok(probabilities)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two features (`Omfalosel` category, `NT` number), three classes, two stumps.
    pub(crate) const TINY_MODEL: &str = r#"{
        "feature_order": ["Omfalosel", "NT"],
        "encoders": { "Omfalosel": ["Var", "Yok"] },
        "classes": ["Down", "Edwards", "Normal"],
        "trees": [
            {
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [0, -2, -2],
                "threshold": [0.5, -2.0, -2.0],
                "value": [[0, 0, 0], [1, 3, 0], [2, 0, 2]]
            },
            {
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [1, -2, -2],
                "threshold": [3.0, -2.0, -2.0],
                "value": [[0, 0, 0], [0, 0, 4], [3, 1, 0]]
            }
        ]
    }"#;

    pub(crate) fn input(omfalosel: &str, nt: f64) -> ModelInput {
        ModelInput::from([
            ("Omfalosel".to_string(), FeatureValue::Category(omfalosel.into())),
            ("NT".to_string(), FeatureValue::Number(nt)),
        ])
    }

    #[test]
    fn predict_proba_averages_trees_and_sorts() {
        let model = ForestModel::from_json(TINY_MODEL).expect("model should load");

        // tree 1 ("Var" -> 0 <= 0.5): [0.25, 0.75, 0]; tree 2 (4.0 > 3.0): [0.75, 0.25, 0]
        let probs = model.predict_proba(&input("Var", 4.0)).unwrap();

        assert_eq!(probs.len(), 3);
        assert_eq!(probs[0].class, "Down");
        assert!((probs[0].probability - 0.5).abs() < 1e-12);
        assert_eq!(probs[1].class, "Edwards");
        assert!((probs[1].probability - 0.5).abs() < 1e-12);
        assert_eq!(probs[2].class, "Normal");
        let total: f64 = probs.iter().map(|p| p.probability).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn predict_proba_routes_on_threshold_inclusively() {
        let model = ForestModel::from_json(TINY_MODEL).unwrap();

        // tree 1 ("Yok" -> 1 > 0.5): [0.5, 0, 0.5]; tree 2 (3.0 <= 3.0): [0, 0, 1]
        let probs = model.predict_proba(&input("Yok", 3.0)).unwrap();

        assert_eq!(probs[0].class, "Normal");
        assert!((probs[0].probability - 0.75).abs() < 1e-12);
        assert_eq!(probs[0].percent(), 75.0);
    }

    #[test]
    fn encode_rejects_unknown_category_and_missing_feature() {
        let model = ForestModel::from_json(TINY_MODEL).unwrap();

        let err = model.encode(&input("Belki", 1.0)).unwrap_err();
        assert!(matches!(err, CoreError::Model(_)));

        let mut partial = input("Var", 1.0);
        partial.remove("NT");
        let err = model.encode(&partial).unwrap_err();
        assert!(err.to_string().contains("missing feature 'NT'"));

        let mut swapped = input("Var", 1.0);
        swapped.insert("NT".into(), FeatureValue::Category("2.0".into()));
        assert!(matches!(model.encode(&swapped), Err(CoreError::Model(_))));
    }

    #[test]
    fn from_json_rejects_inconsistent_trees() {
        let broken = TINY_MODEL.replace("[1, 3, 0]", "[1, 3]");
        let err = ForestModel::from_json(&broken).unwrap_err();
        assert!(matches!(err, CoreError::InvalidModel(_)));

        let cyclic = TINY_MODEL.replacen("\"children_left\": [1, -1, -1]", "\"children_left\": [0, -1, -1]", 1);
        assert!(matches!(
            ForestModel::from_json(&cyclic),
            Err(CoreError::InvalidModel(_))
        ));
    }

    #[test]
    fn form_input_deserializes_numbers_and_categories() {
        let parsed: ModelInput =
            serde_json::from_str(r#"{"Omfalosel": "Var", "NT": 2.5}"#).unwrap();
        assert_eq!(parsed, input("Var", 2.5));
    }

    #[test]
    fn percent_rounds_to_two_decimals() {
        let p = ClassProbability {
            class: "Down".into(),
            probability: 0.123456,
        };
        assert_eq!(p.percent(), 12.35);
    }
}
