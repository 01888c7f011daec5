//! The operations behind the emissions API.
//!
//! One [`Snapshot`] (dataset, fitted models and the evaluation computed with them) is
//! published at a time. Loads and retrains build a complete new snapshot off to the side
//! and swap it in under the write lock, so readers see either the old state or the new
//! one, never a mix. A failed load or retrain publishes nothing. Writers are serialised
//! from the moment they read the current snapshot until they publish, so a slow retrain
//! can never republish a dataset that a later load already replaced.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{self, ForecastConfig, TrainingConfig};
use crate::error::{EmissionsError, Result};
use crate::forecast::{CountrySeries, ForecastResult, Forecaster, TrainingMetrics};
use crate::io::{self, EmissionRecord};
use crate::persist;
use crate::preprocess::Dataset;
use crate::trainer::{self, FeatureValues, ModelEvaluation, ModelType, TrainedModels};

#[derive(Debug, Default)]
pub struct Snapshot {
    dataset: Option<Arc<Dataset>>,
    models: Option<Arc<TrainedModels>>,
    evaluation: Option<Arc<ModelEvaluation>>,
}

impl Snapshot {
    fn dataset(&self) -> Result<&Dataset> {
        self.dataset.as_deref().ok_or(EmissionsError::NoData)
    }

    fn models(&self, purpose: &'static str) -> Result<&TrainedModels> {
        self.models.as_deref().ok_or(EmissionsError::NotTrained(purpose))
    }
}

/// Failure payload: a message and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl From<&EmissionsError> for ErrorResponse {
    fn from(e: &EmissionsError) -> Self {
        ErrorResponse { detail: e.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub name: String,
    pub emissions: Option<f64>,
    pub gdp: Option<f64>,
    pub population: Option<f64>,
    pub energy_per_capita: Option<f64>,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: FeatureProperties,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionsRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub gdp: f64,
    pub population: f64,
    pub energy_per_capita: f64,
    #[serde(default)]
    pub model_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: f64,
    pub model_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub message: String,
    pub years: Vec<i32>,
    pub countries: Vec<String>,
    pub model_evaluation: ModelEvaluation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    /// Absent when the forecaster was restored rather than trained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingMetrics>,
    #[serde(flatten)]
    pub forecast: ForecastResult,
}

pub struct EmissionsService {
    training: TrainingConfig,
    forecasting: ForecastConfig,
    data_dir: PathBuf,
    state: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

impl EmissionsService {
    pub fn new(data_dir: impl Into<PathBuf>, training: TrainingConfig, forecasting: ForecastConfig) -> Self {
        EmissionsService {
            training,
            forecasting,
            data_dir: data_dir.into(),
            state: RwLock::new(Arc::new(Snapshot::default())),
            writer: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, next: Snapshot) {
        let mut guard = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(next);
    }

    /// Replaces the dataset with the file at `path` and retrains both models.
    pub fn load(&self, path: &Path) -> Result<ModelEvaluation> {
        let _writer = self.lock_writer();
        let dataset = Dataset::from_records(io::load_csv(path)?);
        info!(
            "Loaded {} rows, {} countries, {} years",
            dataset.len(),
            dataset.countries().len(),
            dataset.years().len()
        );
        let (models, evaluation) = trainer::train_and_evaluate(dataset.records(), &self.training)?;
        self.publish(Snapshot {
            dataset: Some(Arc::new(dataset)),
            models: Some(Arc::new(models)),
            evaluation: Some(Arc::new(evaluation.clone())),
        });
        Ok(evaluation)
    }

    pub fn available_years(&self) -> Result<Vec<i32>> {
        Ok(self.snapshot().dataset()?.years().to_vec())
    }

    pub fn available_countries(&self) -> Result<Vec<String>> {
        Ok(self.snapshot().dataset()?.countries().to_vec())
    }

    pub fn emissions_by_year(&self, year: i32) -> Result<FeatureCollection> {
        let snap = self.snapshot();
        let features = snap
            .dataset()?
            .records()
            .iter()
            .filter(|r| r.year == year)
            .map(|r| Feature {
                kind: "Feature".to_string(),
                properties: FeatureProperties {
                    name: r.country.clone(),
                    emissions: r.co2,
                    gdp: r.gdp,
                    population: r.population,
                    energy_per_capita: r.energy_per_capita,
                    year,
                },
                id: r.country.clone(),
            })
            .collect();
        Ok(FeatureCollection { kind: "FeatureCollection".to_string(), features })
    }

    pub fn emissions_range(&self) -> Result<EmissionsRange> {
        let snap = self.snapshot();
        let values = snap.dataset()?.records().iter().filter_map(|r| r.co2);
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if min > max {
            return Err(EmissionsError::NoData);
        }
        Ok(EmissionsRange { min, max })
    }

    /// Rows of one country in dataset order; unknown countries give an empty list.
    pub fn country_timeline(&self, country: &str) -> Result<Vec<EmissionRecord>> {
        let snap = self.snapshot();
        Ok(snap
            .dataset()?
            .records()
            .iter()
            .filter(|r| r.country == country)
            .cloned()
            .collect())
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let snap = self.snapshot();
        let model_type = ModelType::resolve(request.model_type.as_deref());
        let features = FeatureValues {
            gdp: request.gdp,
            population: request.population,
            energy_per_capita: request.energy_per_capita,
        };
        let prediction = snap.models("prediction")?.predict(features, model_type)?;
        Ok(PredictionResponse {
            prediction,
            model_type: model_type.to_string(),
        })
    }

    /// The evaluation of the published models, recomputed only when none is cached.
    pub fn model_evaluation(&self) -> Result<ModelEvaluation> {
        let snap = self.snapshot();
        match &snap.evaluation {
            Some(eval) => Ok(eval.as_ref().clone()),
            None => self.retrain(),
        }
    }

    /// Fits fresh models on the current dataset and publishes them with their evaluation.
    pub fn retrain(&self) -> Result<ModelEvaluation> {
        let _writer = self.lock_writer();
        let snap = self.snapshot();
        let dataset = snap.dataset.clone().ok_or(EmissionsError::NoData)?;
        let (models, evaluation) = trainer::train_and_evaluate(dataset.records(), &self.training)?;
        self.publish(Snapshot {
            dataset: Some(dataset),
            models: Some(Arc::new(models)),
            evaluation: Some(Arc::new(evaluation.clone())),
        });
        Ok(evaluation)
    }

    pub fn feature_importance(&self, model_type: &str) -> Result<BTreeMap<String, f64>> {
        let snap = self.snapshot();
        Ok(snap
            .models("reading feature importance")?
            .feature_importance(ModelType::resolve(Some(model_type))))
    }

    /// Stores the uploaded bytes in the data directory, then loads them like any data file.
    pub fn upload_data(&self, file_name: &str, content: &[u8]) -> Result<UploadSummary> {
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| EmissionsError::Schema(format!("invalid upload name {:?}", file_name)))?;
        fs::create_dir_all(&self.data_dir)?;
        let path = self.data_dir.join(name);
        fs::write(&path, content)?;
        info!("Stored upload at {}", path.display());

        let model_evaluation = self.load(&path)?;
        Ok(UploadSummary {
            message: "Data uploaded and models trained successfully".to_string(),
            years: self.available_years()?,
            countries: self.available_countries()?,
            model_evaluation,
        })
    }

    /// Writes the cleaned dataset to `output` and the model bundle beside it.
    pub fn save_processed_data(&self, output: &Path) -> Result<PathBuf> {
        let snap = self.snapshot();
        io::write_csv(output, snap.dataset()?.records())?;
        let bundle = config::default_model_path(output);
        persist::save_models(&bundle, snap.models("saving")?)?;
        Ok(bundle)
    }

    pub fn save_models(&self, path: &Path) -> Result<()> {
        persist::save_models(path, self.snapshot().models("saving")?)
    }

    /// Publishes restored models next to the current dataset. The cached evaluation is
    /// dropped because it described the replaced models.
    pub fn load_models(&self, path: &Path) -> Result<()> {
        let models = persist::load_models(path)?;
        let _writer = self.lock_writer();
        let snap = self.snapshot();
        self.publish(Snapshot {
            dataset: snap.dataset.clone(),
            models: Some(Arc::new(models)),
            evaluation: None,
        });
        Ok(())
    }

    fn country_series(&self, country: &str) -> Result<CountrySeries> {
        let snap = self.snapshot();
        let series = CountrySeries::from_records(country, snap.dataset()?.records());
        if series.is_empty() {
            warn!("No emissions history for {}", country);
        }
        Ok(series)
    }

    /// Trains a forecaster on one country's history and projects `horizon` years ahead.
    /// With `save_to`, the fitted forecaster is written there for later reuse.
    pub fn forecast_country(
        &self,
        country: &str,
        horizon: usize,
        save_to: Option<&Path>,
    ) -> Result<ForecastReport> {
        let series = self.country_series(country)?;
        let mut forecaster = Forecaster::new(self.forecasting.clone());
        let training = forecaster.train(&series)?;
        let forecast = forecaster.forecast(&series, horizon)?;
        if let Some(path) = save_to {
            forecaster.save(path)?;
        }
        Ok(ForecastReport { training: Some(training), forecast })
    }

    /// Projects a country's history with a previously saved forecaster, no training.
    pub fn forecast_with_saved(&self, country: &str, horizon: usize, path: &Path) -> Result<ForecastReport> {
        let forecaster = Forecaster::load(path, self.forecasting.clone())?;
        let series = self.country_series(country)?;
        let forecast = forecaster.forecast(&series, horizon)?;
        Ok(ForecastReport { training: None, forecast })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn scratch_dir() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("co2_service_{}_{}", std::process::id(), n));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    fn fast_service(dir: &Path) -> EmissionsService {
        let training = TrainingConfig { n_estimators: 8, ..TrainingConfig::default() };
        let forecasting = ForecastConfig { n_estimators: 20, ..ForecastConfig::default() };
        EmissionsService::new(dir, training, forecasting)
    }

    fn panel_csv() -> String {
        let mut body = String::from("year,country,gdp,population,energy_per_capita,co2,iso_code\n");
        for (c, country) in ["Chile", "Peru", "World", "Kenya", "Asia"].iter().enumerate() {
            for year in 2000..2012 {
                let t = (year - 2000) as f64;
                let gdp = 50.0 + 10.0 * c as f64 + 3.0 * t;
                let pop = 10.0 + c as f64 + 0.2 * t + 0.3 * ((year % 3) as f64);
                let energy = 2.0 + 0.5 * c as f64 + 0.01 * t * t;
                let co2 = 0.02 * gdp + 0.5 * energy;
                body.push_str(&format!("{},{},{},{},{},{},X{}\n", year, country, gdp, pop, energy, co2, c));
            }
        }
        body
    }

    #[test]
    fn queries_before_load_fail() {
        let svc = fast_service(&scratch_dir());
        assert!(matches!(svc.available_years(), Err(EmissionsError::NoData)));
        assert!(matches!(svc.emissions_range(), Err(EmissionsError::NoData)));
        let req = PredictionRequest { gdp: 1.0, population: 1.0, energy_per_capita: 1.0, model_type: None };
        assert!(matches!(svc.predict(&req), Err(EmissionsError::NotTrained(_))));
        assert!(matches!(svc.feature_importance("linear"), Err(EmissionsError::NotTrained(_))));
    }

    #[test]
    fn two_row_scenario() {
        let dir = scratch_dir();
        let path = write_file(
            &dir,
            "two.csv",
            "year,country,gdp,population,energy_per_capita,co2\n\
             2019,X,100,10,5,3.0\n\
             2020,X,110,10.2,5.2,3.2\n",
        );
        let svc = fast_service(&dir);
        svc.load(&path).unwrap();

        let timeline = svc.country_timeline("X").unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].year, 2019);
        assert_eq!(timeline[1].year, 2020);
        assert_eq!(svc.emissions_range().unwrap(), EmissionsRange { min: 3.0, max: 3.2 });
        assert_eq!(svc.available_years().unwrap(), vec![2019, 2020]);
    }

    #[test]
    fn aggregates_never_surface() {
        let dir = scratch_dir();
        let path = write_file(&dir, "panel.csv", &panel_csv());
        let svc = fast_service(&dir);
        svc.load(&path).unwrap();

        let countries = svc.available_countries().unwrap();
        assert_eq!(countries, vec!["Chile", "Kenya", "Peru"]);
        let fc = svc.emissions_by_year(2005).unwrap();
        assert_eq!(fc.kind, "FeatureCollection");
        assert_eq!(fc.features.len(), 3);
        assert!(fc.features.iter().all(|f| f.id != "World" && f.id != "Asia"));
        assert!(fc.features.iter().all(|f| f.properties.year == 2005 && f.id == f.properties.name));
    }

    #[test]
    fn missing_column_is_schema_error_and_keeps_state() {
        let dir = scratch_dir();
        let good = write_file(&dir, "panel.csv", &panel_csv());
        let bad = write_file(&dir, "bad.csv", "year,country,gdp,population,co2\n2000,X,1,2,3\n");
        let svc = fast_service(&dir);
        svc.load(&good).unwrap();
        let before = svc.model_evaluation().unwrap();

        assert!(matches!(svc.load(&bad), Err(EmissionsError::Schema(_))));
        assert_eq!(svc.available_countries().unwrap().len(), 3);
        assert_eq!(svc.model_evaluation().unwrap(), before);
    }

    #[test]
    fn load_without_complete_rows_keeps_state() {
        let dir = scratch_dir();
        let good = write_file(&dir, "panel.csv", &panel_csv());
        let partial = write_file(
            &dir,
            "partial.csv",
            "year,country,gdp,population,energy_per_capita,co2\n\
             2000,Fiji,10,,1,0.5\n\
             2001,Fiji,12,1.1,,0.6\n\
             2002,Fiji,13,1.2,1.1,\n",
        );
        let svc = fast_service(&dir);
        svc.load(&good).unwrap();
        let before = svc.model_evaluation().unwrap();

        assert!(matches!(svc.load(&partial), Err(EmissionsError::InsufficientData { .. })));
        assert_eq!(svc.available_countries().unwrap(), vec!["Chile", "Kenya", "Peru"]);
        assert_eq!(svc.model_evaluation().unwrap(), before);
    }

    #[test]
    fn retrain_never_reverts_a_concurrent_load() {
        let dir = scratch_dir();
        let big = write_file(&dir, "panel.csv", &panel_csv());
        let small = write_file(
            &dir,
            "small.csv",
            "year,country,gdp,population,energy_per_capita,co2\n\
             2001,Fiji,10,1,1,0.5\n2002,Fiji,12,1.1,1.2,0.6\n2003,Fiji,13,1.2,1.1,0.7\n",
        );
        let svc = fast_service(&dir);
        svc.load(&big).unwrap();

        std::thread::scope(|s| {
            s.spawn(|| svc.retrain().unwrap());
            s.spawn(|| {
                std::thread::sleep(std::time::Duration::from_millis(5));
                svc.load(&small).unwrap();
            });
        });
        // whichever writer ran second saw the small dataset
        assert_eq!(svc.available_countries().unwrap(), vec!["Fiji"]);
        assert_eq!(svc.country_timeline("Fiji").unwrap().len(), 3);
        assert!(svc.country_timeline("Chile").unwrap().is_empty());
    }

    #[test]
    fn evaluation_is_cached_and_retrain_is_deterministic() {
        let dir = scratch_dir();
        let path = write_file(&dir, "panel.csv", &panel_csv());
        let svc = fast_service(&dir);
        let from_load = svc.load(&path).unwrap();
        assert_eq!(svc.model_evaluation().unwrap(), from_load);
        assert_eq!(svc.retrain().unwrap(), from_load);
    }

    #[test]
    fn predict_defaults_to_random_forest() {
        let dir = scratch_dir();
        let path = write_file(&dir, "panel.csv", &panel_csv());
        let svc = fast_service(&dir);
        svc.load(&path).unwrap();

        let mut req = PredictionRequest { gdp: 70.0, population: 12.0, energy_per_capita: 3.0, model_type: None };
        let rf = svc.predict(&req).unwrap();
        assert_eq!(rf.model_type, "random_forest");
        assert!(rf.prediction.is_finite());

        req.model_type = Some("linear".to_string());
        let lin = svc.predict(&req).unwrap();
        assert_eq!(lin.model_type, "linear");
        assert!((lin.prediction - (0.02 * 70.0 + 0.5 * 3.0)).abs() < 1e-6);

        let importance = svc.feature_importance("random_forest").unwrap();
        assert_eq!(importance.len(), 3);
        assert!((importance.values().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn saved_models_predict_identically() {
        let dir = scratch_dir();
        let path = write_file(&dir, "panel.csv", &panel_csv());
        let svc = fast_service(&dir);
        svc.load(&path).unwrap();

        let bundle = svc.save_processed_data(&dir.join("out").join("clean.csv")).unwrap();
        assert!(dir.join("out").join("clean.csv").exists());

        let req = PredictionRequest { gdp: 81.0, population: 11.5, energy_per_capita: 2.7, model_type: None };
        let lin_req = PredictionRequest { model_type: Some("linear".into()), ..req.clone() };
        let before = (svc.predict(&req).unwrap(), svc.predict(&lin_req).unwrap());

        let fresh = fast_service(&dir);
        fresh.load_models(&bundle).unwrap();
        let after = (fresh.predict(&req).unwrap(), fresh.predict(&lin_req).unwrap());
        assert!((before.0.prediction - after.0.prediction).abs() < 1e-9);
        assert!((before.1.prediction - after.1.prediction).abs() < 1e-9);
        // restored models with no dataset cannot be re-evaluated
        assert!(matches!(fresh.model_evaluation(), Err(EmissionsError::NoData)));
    }

    #[test]
    fn bundle_with_other_schema_is_rejected() {
        let dir = scratch_dir();
        let path = write_file(&dir, "panel.csv", &panel_csv());
        let svc = fast_service(&dir);
        svc.load(&path).unwrap();
        let bundle_path = dir.join("models.json");
        svc.save_models(&bundle_path).unwrap();

        let mut bundle: serde_json::Value = persist::read_json(&bundle_path).unwrap();
        bundle["features"] = serde_json::json!(["gdp", "population", "energy"]);
        persist::write_json(&bundle_path, &bundle).unwrap();

        let fresh = fast_service(&dir);
        assert!(matches!(fresh.load_models(&bundle_path), Err(EmissionsError::Schema(_))));
        assert!(matches!(
            fresh.predict(&PredictionRequest { gdp: 1.0, population: 1.0, energy_per_capita: 1.0, model_type: None }),
            Err(EmissionsError::NotTrained(_))
        ));
    }

    #[test]
    fn upload_replaces_dataset() {
        let dir = scratch_dir();
        let first = write_file(&dir, "panel.csv", &panel_csv());
        let svc = fast_service(&dir.join("data"));
        svc.load(&first).unwrap();

        let upload = "year,country,gdp,population,energy_per_capita,co2\n\
                      2001,Fiji,10,1,1,0.5\n2002,Fiji,12,1.1,1.2,0.6\n2003,Fiji,13,1.2,1.1,0.7\n";
        let summary = svc.upload_data("../fiji.csv", upload.as_bytes()).unwrap();
        assert_eq!(summary.countries, vec!["Fiji"]);
        assert_eq!(summary.years, vec![2001, 2002, 2003]);
        assert!(dir.join("data").join("fiji.csv").exists());
        assert!(svc.country_timeline("Chile").unwrap().is_empty());
    }

    #[test]
    fn forecast_country_projects_forward() {
        let dir = scratch_dir();
        let path = write_file(&dir, "panel.csv", &panel_csv());
        let svc = fast_service(&dir);
        svc.load(&path).unwrap();

        let report = svc.forecast_country("Peru", 4, None).unwrap();
        assert_eq!(report.forecast.country, "Peru");
        assert!(report.training.is_some());
        let years: Vec<i32> = report.forecast.predictions.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2012, 2013, 2014, 2015]);
        assert!(matches!(
            svc.forecast_country("Atlantis", 3, None),
            Err(EmissionsError::InsufficientData { .. })
        ));
    }

    #[test]
    fn saved_forecaster_reproduces_the_forecast() {
        let dir = scratch_dir();
        let path = write_file(&dir, "panel.csv", &panel_csv());
        let svc = fast_service(&dir);
        svc.load(&path).unwrap();

        let saved = dir.join("peru_forecaster.json");
        let fresh = svc.forecast_country("Peru", 3, Some(saved.as_path())).unwrap();
        let restored = svc.forecast_with_saved("Peru", 3, &saved).unwrap();
        assert!(restored.training.is_none());
        assert_eq!(fresh.forecast, restored.forecast);
    }

    #[test]
    fn readers_never_see_a_torn_snapshot() {
        let dir = scratch_dir();
        let path = write_file(&dir, "panel.csv", &panel_csv());
        let svc = fast_service(&dir);
        svc.load(&path).unwrap();
        let req = PredictionRequest { gdp: 70.0, population: 12.0, energy_per_capita: 3.0, model_type: Some("linear".into()) };

        std::thread::scope(|s| {
            s.spawn(|| {
                for _ in 0..3 {
                    svc.retrain().unwrap();
                }
            });
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..20 {
                        let snap = svc.snapshot();
                        let models = snap.models("test").unwrap();
                        assert!(models.scaler.matches_schema(&crate::preprocess::FEATURE_NAMES));
                        assert!(svc.predict(&req).unwrap().prediction.is_finite());
                    }
                });
            }
        });
    }
}
