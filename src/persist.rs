// Durable model bundles. Each bundle carries the feature names it was fit on and a
// fingerprint of them; restoring refuses a bundle whose schema differs from the compiled one.
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EmissionsError, Result};
use crate::model::LinearModel;
use crate::preprocess::{StandardScaler, FEATURE_NAMES};
use crate::trainer::TrainedModels;
use crate::trees::RandomForest;

/// Stable digest of an ordered feature list (FNV-1a over the names joined with `|`).
pub fn schema_fingerprint(names: &[&str]) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in names.join("|").bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    format!("{:016x}", hash)
}

/// Fails with a schema error unless `stored` names and fingerprint describe `expected`.
pub fn check_schema(stored: &[String], fingerprint: &str, expected: &[&str]) -> Result<()> {
    let names_match = stored.len() == expected.len() && stored.iter().zip(expected).all(|(a, b)| a == b);
    if !names_match || fingerprint != schema_fingerprint(expected) {
        return Err(EmissionsError::Schema(format!(
            "bundle was fit on features {:?} (fingerprint {}), expected {:?} (fingerprint {})",
            stored,
            fingerprint,
            expected,
            schema_fingerprint(expected)
        )));
    }
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Everything needed to predict without retraining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub linear_model: LinearModel,
    pub rf_model: RandomForest,
    pub scaler: StandardScaler,
    pub features: Vec<String>,
    pub fingerprint: String,
    pub trained_at: DateTime<Utc>,
}

impl ModelBundle {
    pub fn from_models(models: &TrainedModels) -> Self {
        ModelBundle {
            linear_model: models.linear.clone(),
            rf_model: models.forest.clone(),
            scaler: models.scaler.clone(),
            features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            fingerprint: schema_fingerprint(&FEATURE_NAMES),
            trained_at: Utc::now(),
        }
    }

    fn into_models(self) -> Result<TrainedModels> {
        check_schema(&self.features, &self.fingerprint, &FEATURE_NAMES)?;
        let width = FEATURE_NAMES.len();
        if !self.scaler.matches_schema(&FEATURE_NAMES)
            || self.linear_model.coefficients.len() != width
            || self.rf_model.n_features() != width
        {
            return Err(EmissionsError::Schema(
                "bundle parameters do not match its declared features".to_string(),
            ));
        }
        Ok(TrainedModels {
            scaler: self.scaler,
            linear: self.linear_model,
            forest: self.rf_model,
        })
    }
}

pub fn save_models(path: &Path, models: &TrainedModels) -> Result<()> {
    write_json(path, &ModelBundle::from_models(models))?;
    info!("Saved model bundle to {}", path.display());
    Ok(())
}

pub fn load_models(path: &Path) -> Result<TrainedModels> {
    let bundle: ModelBundle = read_json(path)?;
    info!(
        "Restoring model bundle from {} (trained {})",
        path.display(),
        bundle.trained_at.to_rfc3339()
    );
    bundle.into_models()
}
