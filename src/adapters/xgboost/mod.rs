//! XGBoost adapter: Gradient-boosted tree ensemble loaded from XGBoost's
//! native JSON model format.
//!
//! # Format
//!
//! The artifact is what `Booster.save_model("ckd_model.json")` writes. Only
//! the parts needed for inference are read:
//! - `learner.objective.name`: `multi:softprob` or `multi:softmax`
//! - `learner.learner_model_param`: `num_class`, `num_feature`, `base_score`
//! - `learner.feature_names` (optional)
//! - `learner.gradient_booster.model.trees` and `tree_info`
//!
//! Each tree is stored as parallel arrays indexed by node id. A node is a
//! leaf when `left_children[n] == -1`, in which case `split_conditions[n]`
//! holds the leaf weight. Otherwise a sample goes left when
//! `x[split_indices[n]] < split_conditions[n]`, and follows
//! `default_left[n]` when the value is missing.
//!
//! # Security
//!
//! The model directory is verified against its signed manifest before the
//! artifact is parsed (see [`manifest`]).

pub mod manifest;

use std::path::Path;

use serde::Deserialize;

use crate::domain::{PatientRecord, FEATURE_COUNT, FEATURE_NAMES};
use crate::ports::{ClassifierError, RiskClassifier};

pub use manifest::ModelTrust;

/// Default artifact name inside a model directory.
pub const MODEL_FILE: &str = "ckd_model.json";

/// Risk classes the model must produce (Low, Moderate, High).
const NUM_CLASSES: usize = 3;

const SUPPORTED_OBJECTIVES: [&str; 2] = ["multi:softprob", "multi:softmax"];

#[derive(Debug, Deserialize)]
struct XgbDocument {
    learner: XgbLearner,
}

#[derive(Debug, Deserialize)]
struct XgbLearner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: XgbBooster,
    learner_model_param: XgbModelParam,
    objective: XgbObjective,
}

#[derive(Debug, Deserialize)]
struct XgbBooster {
    name: String,
    model: XgbTreeModel,
}

#[derive(Debug, Deserialize)]
struct XgbTreeModel {
    trees: Vec<XgbTree>,
    tree_info: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct XgbTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<XgbFlag>,
    /// 0 for numeric splits, 1 for category-set splits.
    #[serde(default)]
    split_type: Vec<i64>,
}

/// `default_left` is written as 0/1 by older releases and as booleans by
/// newer ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum XgbFlag {
    Bool(bool),
    Int(i64),
}

impl XgbFlag {
    fn is_set(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
        }
    }
}

/// XGBoost writes these parameters as strings.
#[derive(Debug, Deserialize)]
struct XgbModelParam {
    base_score: String,
    num_class: String,
    num_feature: String,
}

#[derive(Debug, Deserialize)]
struct XgbObjective {
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        /// XGBoost stores split values and compares features in single precision.
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f64),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
    class: usize,
}

impl Tree {
    /// Walk from the root to a leaf and return its weight.
    ///
    /// Children always have a larger index than their parent (checked at
    /// load time), so the walk terminates.
    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = features[*feature];
                    idx = if x.is_nan() {
                        if *default_left {
                            *left
                        } else {
                            *right
                        }
                    } else if (x as f32) < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Gradient-boosted CKD risk classifier.
///
/// Immutable once loaded; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct GradientBoostedClassifier {
    trees: Vec<Tree>,
    base_margin: [f64; NUM_CLASSES],
    feature_names: Vec<String>,
}

impl GradientBoostedClassifier {
    /// Load and verify a model.
    ///
    /// `model_path` is either a directory containing [`MODEL_FILE`] or the
    /// model file itself. The containing directory must carry a manifest
    /// signed by `trust.verifying_key` unless unsigned models are allowed.
    ///
    /// # Errors
    /// Returns error if the signature check fails, the file cannot be read,
    /// or the artifact is not a compatible three-class model.
    pub fn load(model_path: &Path, trust: &ModelTrust) -> Result<Self, ClassifierError> {
        let (base_dir, file_name) = if model_path.is_file() {
            let file_name = model_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    ClassifierError::ModelLoad(format!("Invalid model path {:?}", model_path))
                })?;
            let base_dir = model_path.parent().unwrap_or_else(|| Path::new("."));
            (base_dir, file_name)
        } else {
            (model_path, MODEL_FILE)
        };

        manifest::verify_model_dir(base_dir, file_name, trust)?;

        let path = base_dir.join(file_name);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ClassifierError::ModelLoad(format!("Failed to read {:?}: {e}", path))
        })?;
        let model = Self::from_json(&content)?;

        tracing::info!(
            "Loaded model from {:?} (trees={}, n_features={})",
            path,
            model.trees.len(),
            model.feature_names.len()
        );
        Ok(model)
    }

    /// Parse and validate a model from its JSON text.
    ///
    /// # Errors
    /// Returns `ClassifierError::Format` or `ClassifierError::FeatureMismatch`
    /// if the artifact is incompatible.
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let doc: XgbDocument =
            serde_json::from_str(json).map_err(|e| ClassifierError::Format(e.to_string()))?;
        let learner = doc.learner;

        if !SUPPORTED_OBJECTIVES.contains(&learner.objective.name.as_str()) {
            return Err(ClassifierError::Format(format!(
                "Unsupported objective {:?} (expected one of {:?})",
                learner.objective.name, SUPPORTED_OBJECTIVES
            )));
        }
        if learner.gradient_booster.name != "gbtree" {
            return Err(ClassifierError::Format(format!(
                "Unsupported booster {:?} (expected gbtree)",
                learner.gradient_booster.name
            )));
        }

        let params = &learner.learner_model_param;
        let num_class = parse_param(&params.num_class, "num_class")?;
        if num_class != NUM_CLASSES {
            return Err(ClassifierError::Format(format!(
                "Model has {num_class} classes, expected {NUM_CLASSES}"
            )));
        }

        let num_feature = parse_param(&params.num_feature, "num_feature")?;
        if num_feature != FEATURE_COUNT {
            return Err(ClassifierError::FeatureMismatch {
                expected: format!("{FEATURE_COUNT} features"),
                actual: format!("{num_feature} features"),
            });
        }
        if !learner.feature_names.is_empty() && learner.feature_names != FEATURE_NAMES {
            return Err(ClassifierError::FeatureMismatch {
                expected: FEATURE_NAMES.join(","),
                actual: learner.feature_names.join(","),
            });
        }

        let base_margin = parse_base_score(&params.base_score)?;

        let model = learner.gradient_booster.model;
        if model.trees.is_empty() {
            return Err(ClassifierError::Format("Model contains no trees".into()));
        }
        if model.tree_info.len() != model.trees.len() {
            return Err(ClassifierError::Format(format!(
                "tree_info has {} entries for {} trees",
                model.tree_info.len(),
                model.trees.len()
            )));
        }

        let trees = model
            .trees
            .into_iter()
            .zip(model.tree_info)
            .enumerate()
            .map(|(i, (raw, class))| compile_tree(i, raw, class))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            base_margin,
            feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    /// Raw per-class margins (sum of leaf weights plus base margin).
    #[must_use]
    pub fn margins(&self, features: &[f64; FEATURE_COUNT]) -> [f64; NUM_CLASSES] {
        let mut margins = self.base_margin;
        for tree in &self.trees {
            margins[tree.class] += tree.leaf_value(features);
        }
        margins
    }

    #[must_use]
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

fn parse_param(value: &str, name: &str) -> Result<usize, ClassifierError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ClassifierError::Format(format!("Invalid {name}: {value:?}")))
}

/// Parse `base_score` as either "5E-1" or "[5E-1,5E-1,5E-1]".
fn parse_base_score(value: &str) -> Result<[f64; NUM_CLASSES], ClassifierError> {
    let inner = value.trim().trim_start_matches('[').trim_end_matches(']');
    let scores = inner
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ClassifierError::Format(format!("Invalid base_score: {value:?}")))?;

    match scores.as_slice() {
        [s] if s.is_finite() => Ok([*s; NUM_CLASSES]),
        [a, b, c] if [a, b, c].iter().all(|s| s.is_finite()) => Ok([*a, *b, *c]),
        _ => Err(ClassifierError::Format(format!(
            "base_score must have 1 or {NUM_CLASSES} finite values, got {value:?}"
        ))),
    }
}

fn compile_tree(index: usize, raw: XgbTree, class: i64) -> Result<Tree, ClassifierError> {
    let bad = |msg: String| ClassifierError::Format(format!("Tree {index}: {msg}"));

    let class = usize::try_from(class)
        .ok()
        .filter(|c| *c < NUM_CLASSES)
        .ok_or_else(|| bad(format!("tree_info class {class} out of range")))?;

    let n = raw.left_children.len();
    if n == 0 {
        return Err(bad("no nodes".into()));
    }
    if raw.right_children.len() != n
        || raw.split_indices.len() != n
        || raw.split_conditions.len() != n
        || raw.default_left.len() != n
    {
        return Err(bad("node array lengths differ".into()));
    }

    if let Some(i) = raw.split_type.iter().position(|t| *t != 0) {
        return Err(bad(format!("node {i} uses a categorical split")));
    }

    let mut nodes = Vec::with_capacity(n);
    for i in 0..n {
        let threshold = raw.split_conditions[i];
        if !threshold.is_finite() {
            return Err(bad(format!("node {i} has a non-finite value")));
        }

        if raw.left_children[i] == -1 {
            nodes.push(Node::Leaf(threshold));
            continue;
        }

        let child = |c: i64| {
            usize::try_from(c)
                .ok()
                .filter(|c| *c > i && *c < n)
                .ok_or_else(|| bad(format!("node {i} has invalid child {c}")))
        };
        let left = child(raw.left_children[i])?;
        let right = child(raw.right_children[i])?;

        let feature = usize::try_from(raw.split_indices[i])
            .ok()
            .filter(|f| *f < FEATURE_COUNT)
            .ok_or_else(|| {
                bad(format!(
                    "node {i} splits on feature {} (model has {FEATURE_COUNT})",
                    raw.split_indices[i]
                ))
            })?;

        nodes.push(Node::Split {
            feature,
            threshold: threshold as f32,
            left,
            right,
            default_left: raw.default_left[i].is_set(),
        });
    }

    Ok(Tree { nodes, class })
}

fn softmax(margins: &[f64; NUM_CLASSES]) -> [f64; NUM_CLASSES] {
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = margins.map(|m| (m - max).exp());
    let sum: f64 = exps.iter().sum();
    exps.map(|e| e / sum)
}

impl RiskClassifier for GradientBoostedClassifier {
    fn predict(&self, record: &PatientRecord) -> Result<i64, ClassifierError> {
        let margins = self.margins(&record.to_vec());
        if margins.iter().any(|m| !m.is_finite()) {
            return Err(ClassifierError::Prediction(
                "Model produced a non-finite margin".into(),
            ));
        }

        // First maximum wins on ties.
        let mut best = 0;
        for (class, margin) in margins.iter().enumerate().skip(1) {
            if *margin > margins[best] {
                best = class;
            }
        }
        Ok(best as i64)
    }

    fn predict_proba(&self, record: &PatientRecord) -> Result<Option<Vec<f64>>, ClassifierError> {
        let margins = self.margins(&record.to_vec());
        if margins.iter().any(|m| !m.is_finite()) {
            return Err(ClassifierError::Prediction(
                "Model produced a non-finite margin".into(),
            ));
        }
        Ok(Some(softmax(&margins).to_vec()))
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}
