// Command-line surface and the tunables of both model pipelines.
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATA_PATH: &str = "data/emissions_data.csv";
pub const MODEL_BUNDLE_FILE: &str = "models.json";

/// Hyperparameters of the country-level trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub seed: u64,
    pub test_fraction: f64,
    pub cv_folds: usize,
    pub n_estimators: usize,
    pub max_depth: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            seed: 42,
            test_fraction: 0.2,
            cv_folds: 5,
            n_estimators: 100,
            max_depth: 10,
        }
    }
}

/// Hyperparameters of the time-series forecaster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 5,
        }
    }
}

/// The bundle lives next to the data file it was trained from.
pub fn default_model_path(data_path: &Path) -> PathBuf {
    data_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(MODEL_BUNDLE_FILE)
}

#[derive(Debug, Parser)]
#[command(name = "co2_insights", about = "CO2 emissions modelling and recommendations")]
pub struct Cli {
    /// CSV file with year, country, gdp, population, energy_per_capita, co2 columns
    #[arg(long, global = true, default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Restore a saved model bundle after loading the data
    #[arg(long, global = true)]
    pub models: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the years present in the dataset
    Years,
    /// List the countries present in the dataset
    Countries,
    /// Emissions of every country for one year, as a feature collection
    Emissions { year: i32 },
    /// Minimum and maximum emissions over the whole dataset
    Range,
    /// Historical rows of one country
    Country { name: String },
    /// Predict emissions from economic indicators
    Predict {
        #[arg(long)]
        gdp: f64,
        #[arg(long)]
        population: f64,
        #[arg(long)]
        energy_per_capita: f64,
        /// linear or random_forest
        #[arg(long)]
        model: Option<String>,
    },
    /// Held-out and cross-validated metrics of both models
    Evaluate,
    /// Feature importances of one model
    Importance {
        model: String,
        /// Also draw the importances as a PNG bar chart
        #[arg(long)]
        chart: Option<PathBuf>,
    },
    /// Copy a CSV into the data directory, reload and retrain
    Upload { file: PathBuf },
    /// Retrain both models from the loaded data, optionally writing the bundle
    Train {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write the cleaned dataset and the model bundle
    Save { output: PathBuf },
    /// Forecast one country's emissions several years ahead
    Forecast {
        country: String,
        #[arg(long, default_value_t = 5)]
        years: usize,
        /// Write the fitted forecaster to this file
        #[arg(long, conflicts_with = "restore")]
        save_model: Option<PathBuf>,
        /// Forecast with a previously saved forecaster instead of training one
        #[arg(long)]
        restore: Option<PathBuf>,
    },
    /// Rank mitigation actions for an emission level and trend
    Recommend {
        /// Current emissions in metric tons per capita
        #[arg(long)]
        current: f64,
        /// Historical values, comma separated
        #[arg(long, value_delimiter = ',')]
        history: Vec<f64>,
        /// Industry share as name=fraction, repeatable
        #[arg(long = "industry", value_parser = parse_share)]
        industries: Vec<(String, f64)>,
    },
}

fn parse_share(s: &str) -> Result<(String, f64), String> {
    let (name, share) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=fraction, got {}", s))?;
    let share = share
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid share for {}: {}", name, e))?;
    Ok((name.trim().to_string(), share))
}
