// Dual-model trainer, evaluator and predictor for the country-level feature set.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::info;
use ndarray::{arr2, Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::error::{EmissionsError, Result};
use crate::io::EmissionRecord;
use crate::model::{self, cross_val_r2, mean_std, LinearModel, Regressor};
use crate::preprocess::{prepare, StandardScaler, FEATURE_NAMES};
use crate::trees::RandomForest;

/// Which fitted model answers a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Linear,
    #[default]
    RandomForest,
}

impl ModelType {
    /// `"linear"` selects the linear model; anything else, including nothing, the forest.
    pub fn resolve(name: Option<&str>) -> Self {
        name.and_then(|n| n.parse().ok()).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Linear => "linear",
            ModelType::RandomForest => "random_forest",
        }
    }
}

impl FromStr for ModelType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "linear" => Ok(ModelType::Linear),
            "random_forest" => Ok(ModelType::RandomForest),
            _ => Err(format!("Unknown model type: {}", s)),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics of one model variant from one training pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub r2_score: f64,
    pub rmse: f64,
    pub cv_scores_mean: f64,
    pub cv_scores_std: f64,
    pub feature_importance: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub linear_regression: EvaluationResult,
    pub random_forest: EvaluationResult,
}

/// Input of a single prediction, named the way the request body names them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureValues {
    pub gdp: f64,
    pub population: f64,
    pub energy_per_capita: f64,
}

impl FeatureValues {
    fn to_row(self) -> Array2<f64> {
        arr2(&[[self.gdp, self.population, self.energy_per_capita]])
    }
}

/// Scaler and both models from one pass. Immutable once built; retraining makes a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModels {
    pub scaler: StandardScaler,
    pub linear: LinearModel,
    pub forest: RandomForest,
}

fn importance_map(values: &[f64]) -> BTreeMap<String, f64> {
    FEATURE_NAMES
        .iter()
        .map(|s| s.to_string())
        .zip(values.iter().copied())
        .collect()
}

fn evaluate<M: Regressor>(
    fitted: &M,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    cv_scores: &[f64],
    importances: &[f64],
) -> EvaluationResult {
    let pred = fitted.predict(x_test);
    let (cv_mean, cv_std) = mean_std(cv_scores);
    EvaluationResult {
        r2_score: model::r2_score(y_test, &pred),
        rmse: model::rmse(y_test, &pred),
        cv_scores_mean: cv_mean,
        cv_scores_std: cv_std,
        feature_importance: importance_map(importances),
    }
}

/// Fits the scaler and both models on `records` and scores them. Nothing is shared with any
/// earlier pass, so a failure here leaves previously fitted models untouched.
pub fn train_and_evaluate(
    records: &[EmissionRecord],
    config: &TrainingConfig,
) -> Result<(TrainedModels, ModelEvaluation)> {
    let (raw_x, y) = prepare(records)?;
    if raw_x.nrows() < 2 {
        return Err(EmissionsError::InsufficientData { required: 2, actual: raw_x.nrows() });
    }

    let scaler = StandardScaler::fit(&raw_x, &FEATURE_NAMES)?;
    let x = scaler.transform(&raw_x)?;
    let split = model::train_test_split(&x, &y, config.test_fraction, config.seed)?;

    let linear = LinearModel::fit(&split.x_train, &split.y_train)?;
    let linear_cv = cross_val_r2(&x, &y, config.cv_folds, LinearModel::fit)?;

    let forest = RandomForest::fit(
        &split.x_train,
        &split.y_train,
        config.n_estimators,
        config.max_depth,
        config.seed,
    )?;
    let forest_cv = cross_val_r2(&x, &y, config.cv_folds, |xt, yt| {
        RandomForest::fit(xt, yt, config.n_estimators, config.max_depth, config.seed)
    })?;

    let evaluation = ModelEvaluation {
        linear_regression: evaluate(&linear, &split.x_test, &split.y_test, &linear_cv, linear.importances()),
        random_forest: evaluate(
            &forest,
            &split.x_test,
            &split.y_test,
            &forest_cv,
            &forest.feature_importances(),
        ),
    };
    info!(
        "Trained on {} rows: linear r2={:.4}, random forest r2={:.4}",
        x.nrows(),
        evaluation.linear_regression.r2_score,
        evaluation.random_forest.r2_score
    );

    Ok((TrainedModels { scaler, linear, forest }, evaluation))
}

impl TrainedModels {
    /// Scales with the stored scaler (never refit here) and applies the selected model.
    pub fn predict(&self, features: FeatureValues, model_type: ModelType) -> Result<f64> {
        let x = self.scaler.transform(&features.to_row())?;
        let value = match model_type {
            ModelType::Linear => self.linear.predict(&x)[0],
            ModelType::RandomForest => self.forest.predict(&x)[0],
        };
        Ok(value)
    }

    pub fn feature_importance(&self, model_type: ModelType) -> BTreeMap<String, f64> {
        match model_type {
            ModelType::Linear => importance_map(self.linear.importances()),
            ModelType::RandomForest => importance_map(&self.forest.feature_importances()),
        }
    }
}
