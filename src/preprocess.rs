// Data cleaning, the in-memory dataset and the reusable feature scaler.
use std::collections::BTreeSet;

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{EmissionsError, Result};
use crate::io::EmissionRecord;

/// Continental and global rollups that appear in the source tables next to real countries.
pub const AGGREGATE_REGIONS: [&str; 7] = [
    "World",
    "Asia",
    "Europe",
    "Africa",
    "North America",
    "South America",
    "Oceania",
];

pub const FEATURE_NAMES: [&str; 3] = ["gdp", "population", "energy_per_capita"];

pub fn is_aggregate(country: &str) -> bool {
    AGGREGATE_REGIONS.contains(&country)
}

/// Loaded records plus the sorted distinct years and countries derived from them.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<EmissionRecord>,
    years: Vec<i32>,
    countries: Vec<String>,
}

impl Dataset {
    pub fn from_records(records: Vec<EmissionRecord>) -> Self {
        let before = records.len();
        let records: Vec<EmissionRecord> =
            records.into_iter().filter(|r| !is_aggregate(&r.country)).collect();
        debug!("Dropped {} aggregate rows", before - records.len());

        let years: BTreeSet<i32> = records.iter().map(|r| r.year).collect();
        let countries: BTreeSet<&str> = records.iter().map(|r| r.country.as_str()).collect();
        let countries = countries.into_iter().map(str::to_string).collect();

        Dataset {
            years: years.into_iter().collect(),
            countries,
            records,
        }
    }

    pub fn records(&self) -> &[EmissionRecord] {
        &self.records
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Feature matrix and target vector for the country-level models, unscaled.
/// Aggregates are filtered again so hand-built datasets are handled the same way.
pub fn prepare(records: &[EmissionRecord]) -> Result<(Array2<f64>, Array1<f64>)> {
    let mut flat = Vec::with_capacity(records.len() * FEATURE_NAMES.len());
    let mut target = Vec::with_capacity(records.len());

    for r in records.iter().filter(|r| !is_aggregate(&r.country)) {
        // partial rows are excluded, never imputed
        let (Some(gdp), Some(pop), Some(energy), Some(co2)) =
            (r.gdp, r.population, r.energy_per_capita, r.co2)
        else {
            continue;
        };
        if ![gdp, pop, energy, co2].iter().all(|v| v.is_finite()) {
            continue;
        }
        flat.extend_from_slice(&[gdp, pop, energy]);
        target.push(co2);
    }

    info!("Prepared {} complete rows out of {}", target.len(), records.len());
    let x = Array2::from_shape_vec((target.len(), FEATURE_NAMES.len()), flat)?;
    Ok((x, Array1::from(target)))
}

/// Zero-mean, unit-variance transform fit on one feature schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Population statistics per column; a constant column keeps a scale of 1.
    pub fn fit(x: &Array2<f64>, feature_names: &[&str]) -> Result<Self> {
        if x.ncols() != feature_names.len() {
            return Err(EmissionsError::Schema(format!(
                "scaler expects {} features, got {} columns",
                feature_names.len(),
                x.ncols()
            )));
        }
        if x.nrows() == 0 {
            return Err(EmissionsError::InsufficientData { required: 1, actual: 0 });
        }

        let mean: Vec<f64> = x.mean_axis(Axis(0)).map(|m| m.to_vec()).unwrap_or_default();
        let scale = x
            .std_axis(Axis(0), 0.0)
            .iter()
            .map(|&s| if s > f64::EPSILON { s } else { 1.0 })
            .collect();

        Ok(StandardScaler {
            feature_names: feature_names.iter().map(|s| s.to_string()).collect(),
            mean,
            scale,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(EmissionsError::Schema(format!(
                "scaler was fit on {} features ({:?}), got {}",
                self.n_features(),
                self.feature_names,
                x.ncols()
            )));
        }
        let mut out = x.to_owned();
        for (j, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (m, s) = (self.mean[j], self.scale[j]);
            col.mapv_inplace(|v| (v - m) / s);
        }
        Ok(out)
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Result<Array1<f64>> {
        let x = row.to_owned().insert_axis(Axis(0));
        Ok(self.transform(&x)?.row(0).to_owned())
    }

    /// `true` when this scaler was fit on exactly these feature names, in order.
    pub fn matches_schema(&self, feature_names: &[&str]) -> bool {
        self.feature_names.len() == feature_names.len()
            && self.feature_names.iter().zip(feature_names).all(|(a, b)| a == b)
            && self.mean.len() == feature_names.len()
            && self.scale.len() == feature_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn rec(year: i32, country: &str, co2: Option<f64>) -> EmissionRecord {
        EmissionRecord {
            year,
            country: country.to_string(),
            gdp: Some(100.0 + year as f64),
            population: Some(10.0),
            energy_per_capita: Some(5.0),
            co2,
        }
    }

    #[test]
    fn dataset_drops_aggregates_and_sorts_indices() {
        let ds = Dataset::from_records(vec![
            rec(2020, "Peru", Some(1.0)),
            rec(2019, "World", Some(9.0)),
            rec(2018, "Chile", Some(2.0)),
            rec(2020, "Asia", Some(9.0)),
        ]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.years(), &[2018, 2020]);
        assert_eq!(ds.countries(), &["Chile".to_string(), "Peru".to_string()]);
        assert!(ds.records().iter().all(|r| !is_aggregate(&r.country)));
    }

    #[test]
    fn prepare_skips_partial_rows_and_aggregates() {
        let records = vec![
            rec(2019, "Peru", Some(1.0)),
            rec(2020, "Peru", None),
            rec(2020, "Europe", Some(3.0)),
        ];
        let (x, y) = prepare(&records).unwrap();
        assert_eq!(x.shape(), &[1, 3]);
        assert_eq!(y.to_vec(), vec![1.0]);
    }

    #[test]
    fn scaler_centers_and_scales() {
        let x = array![[1.0, 10.0, 7.0], [3.0, 30.0, 7.0]];
        let scaler = StandardScaler::fit(&x, &FEATURE_NAMES).unwrap();
        let z = scaler.transform(&x).unwrap();
        assert!((z[[0, 0]] + 1.0).abs() < 1e-12);
        assert!((z[[1, 1]] - 1.0).abs() < 1e-12);
        // constant column is centred but not divided by zero
        assert_eq!(z[[0, 2]], 0.0);
        assert!(scaler.matches_schema(&FEATURE_NAMES));
        assert!(!scaler.matches_schema(&["gdp", "population"]));
    }

    #[test]
    fn scaler_rejects_foreign_schema() {
        let x = array![[1.0, 2.0, 3.0], [2.0, 3.0, 4.0]];
        let scaler = StandardScaler::fit(&x, &FEATURE_NAMES).unwrap();
        let wrong = array![[1.0, 2.0]];
        assert!(matches!(scaler.transform(&wrong), Err(EmissionsError::Schema(_))));
    }
}
