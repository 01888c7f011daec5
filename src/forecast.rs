//! Per-country time-series forecaster.
//!
//! Each training row is built from one year of a series: the year, its square and cube, and
//! the two preceding observations. The first two years of a series have no complete lag
//! pair and are dropped. Forecasting walks forward one year at a time, feeding each
//! prediction back in as the next lag-1 value while lag-2 stays pinned to the
//! second-to-last observation.

use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info};
use ndarray::{arr1, Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::ForecastConfig;
use crate::error::{EmissionsError, Result};
use crate::io::EmissionRecord;
use crate::model::{self, Regressor};
use crate::persist::{check_schema, read_json, schema_fingerprint, write_json};
use crate::preprocess::StandardScaler;
use crate::trees::GradientBoosting;

pub const SERIES_FEATURE_NAMES: [&str; 5] =
    ["year", "year_squared", "year_cubed", "emissions_lag1", "emissions_lag2"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: f64,
}

/// One country's emissions, ordered by year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySeries {
    pub country: String,
    points: Vec<SeriesPoint>,
}

impl CountrySeries {
    pub fn new(country: impl Into<String>, mut points: Vec<SeriesPoint>) -> Self {
        points.sort_by_key(|p| p.year);
        CountrySeries { country: country.into(), points }
    }

    /// Rows of `country` that carry an emissions value.
    pub fn from_records(country: &str, records: &[EmissionRecord]) -> Self {
        let points = records
            .iter()
            .filter(|r| r.country == country)
            .filter_map(|r| r.co2.map(|value| SeriesPoint { year: r.year, value }))
            .collect();
        CountrySeries::new(country, points)
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn feature_row(year: i32, lag1: f64, lag2: f64) -> [f64; 5] {
    let y = f64::from(year);
    [y, y * y, y * y * y, lag1, lag2]
}

fn engineer(series: &CountrySeries) -> Result<(Array2<f64>, Array1<f64>)> {
    let pts = series.points();
    let mut flat = Vec::new();
    let mut target = Vec::new();
    for i in 2..pts.len() {
        flat.extend_from_slice(&feature_row(pts[i].year, pts[i - 1].value, pts[i - 2].value));
        target.push(pts[i].value);
    }
    let x = Array2::from_shape_vec((target.len(), SERIES_FEATURE_NAMES.len()), flat)?;
    Ok((x, Array1::from(target)))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub r2_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub year: i32,
    pub predicted_emissions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub country: String,
    pub predictions: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedForecaster {
    scaler: StandardScaler,
    model: GradientBoosting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ForecastBundle {
    model: GradientBoosting,
    scaler: StandardScaler,
    features: Vec<String>,
    fingerprint: String,
    trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct Forecaster {
    config: ForecastConfig,
    fitted: Option<FittedForecaster>,
}

impl Forecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Forecaster { config, fitted: None }
    }

    /// Fits scaler and boosted trees on the engineered rows; metrics are in-sample.
    pub fn train(&mut self, series: &CountrySeries) -> Result<TrainingMetrics> {
        let (raw_x, y) = engineer(series)?;
        if raw_x.nrows() == 0 {
            return Err(EmissionsError::InsufficientData { required: 3, actual: series.len() });
        }
        let scaler = StandardScaler::fit(&raw_x, &SERIES_FEATURE_NAMES)?;
        let x = scaler.transform(&raw_x)?;
        let gb = GradientBoosting::fit(
            &x,
            &y,
            self.config.n_estimators,
            self.config.learning_rate,
            self.config.max_depth,
        )?;

        let pred = gb.predict(&x);
        let mse = model::mse(&y, &pred);
        let metrics = TrainingMetrics {
            mse,
            rmse: mse.sqrt(),
            r2_score: model::r2_score(&y, &pred),
        };
        info!(
            "Forecaster trained on {} rows of {}: rmse={:.4}",
            x.nrows(),
            series.country,
            metrics.rmse
        );
        self.fitted = Some(FittedForecaster { scaler, model: gb });
        Ok(metrics)
    }

    /// Exactly `horizon` predictions for the years after the last observation.
    pub fn forecast(&self, series: &CountrySeries, horizon: usize) -> Result<ForecastResult> {
        let fitted = self.fitted.as_ref().ok_or(EmissionsError::NotTrained("forecasting"))?;
        let pts = series.points();
        if pts.len() < 2 {
            return Err(EmissionsError::InsufficientData { required: 2, actual: pts.len() });
        }
        let last = pts[pts.len() - 1];
        let second_last = pts[pts.len() - 2];
        let final_year = i32::try_from(horizon)
            .ok()
            .and_then(|h| last.year.checked_add(h))
            .ok_or_else(|| {
                EmissionsError::Schema(format!("forecast horizon {} runs past the last representable year", horizon))
            })?;
        debug!("Forecasting {} through {}", series.country, final_year);

        let mut predictions = Vec::with_capacity(horizon.min(256));
        let mut lag1 = last.value;
        for step in 1..=horizon {
            // bounded by the horizon check above
            let year = last.year + step as i32;
            let row = arr1(&feature_row(year, lag1, second_last.value));
            let scaled = fitted.scaler.transform_row(row.view())?;
            let value = fitted.model.predict_one(scaled.view());
            debug!("{} {}: {:.4}", series.country, year, value);
            predictions.push(ForecastPoint { year, predicted_emissions: value });
            lag1 = value;
        }

        Ok(ForecastResult {
            country: series.country.clone(),
            predictions,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let fitted = self.fitted.as_ref().ok_or(EmissionsError::NotTrained("saving"))?;
        let bundle = ForecastBundle {
            model: fitted.model.clone(),
            scaler: fitted.scaler.clone(),
            features: SERIES_FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            fingerprint: schema_fingerprint(&SERIES_FEATURE_NAMES),
            trained_at: Utc::now(),
        };
        write_json(path, &bundle)?;
        info!("Saved forecaster to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path, config: ForecastConfig) -> Result<Self> {
        let bundle: ForecastBundle = read_json(path)?;
        check_schema(&bundle.features, &bundle.fingerprint, &SERIES_FEATURE_NAMES)?;
        if !bundle.scaler.matches_schema(&SERIES_FEATURE_NAMES)
            || bundle.model.n_features() != SERIES_FEATURE_NAMES.len()
        {
            return Err(EmissionsError::Schema(
                "forecaster parameters do not match its declared features".to_string(),
            ));
        }
        Ok(Forecaster {
            config,
            fitted: Some(FittedForecaster { scaler: bundle.scaler, model: bundle.model }),
        })
    }
}
