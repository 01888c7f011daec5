/// Command-line front end: load the data, train, and answer one query as JSON
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

mod chart;
mod config;
mod error;
mod forecast;
mod io;
mod model;
mod persist;
mod preprocess;
mod recommend;
mod service;
mod trainer;
mod trees;

use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;

use config::{Cli, Command, ForecastConfig, TrainingConfig};
use error::{EmissionsError, Result};
use service::{EmissionsService, ErrorResponse, PredictionRequest};

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Loads the configured data file the way the API does at startup: a missing or broken
/// file is logged, and queries that need data then fail on their own.
fn startup(cli: &Cli) -> EmissionsService {
    let data_dir = cli
        .data
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let service = EmissionsService::new(data_dir, TrainingConfig::default(), ForecastConfig::default());

    if cli.data.exists() {
        if let Err(e) = service.load(&cli.data) {
            warn!("Error loading data: {}", e);
        }
    } else {
        warn!("No data file found at {}. Please upload data first.", cli.data.display());
    }
    if let Some(models) = &cli.models {
        if let Err(e) = service.load_models(models) {
            warn!("Could not restore models from {}: {}", models.display(), e);
        }
    }
    service
}

fn run(cli: Cli) -> Result<()> {
    // recommendations are pure and need neither data nor models
    if let Command::Recommend { current, history, industries } = &cli.command {
        let shares: BTreeMap<String, f64> = industries.iter().cloned().collect();
        return emit(&recommend::recommend(*current, history, &shares));
    }

    let service = startup(&cli);
    match cli.command {
        Command::Years => emit(&json!({ "years": service.available_years()? })),
        Command::Countries => emit(&json!({ "countries": service.available_countries()? })),
        Command::Emissions { year } => emit(&service.emissions_by_year(year)?),
        Command::Range => emit(&service.emissions_range()?),
        Command::Country { name } => emit(&json!({ "data": service.country_timeline(&name)? })),
        Command::Predict { gdp, population, energy_per_capita, model } => {
            let request = PredictionRequest { gdp, population, energy_per_capita, model_type: model };
            emit(&service.predict(&request)?)
        }
        Command::Evaluate => emit(&service.model_evaluation()?),
        Command::Importance { model, chart: chart_path } => {
            let importances = service.feature_importance(&model)?;
            if let Some(path) = chart_path {
                chart::plot_importances(&format!("Feature importances ({})", model), &importances, &path)?;
                info!("Wrote {}", path.display());
            }
            emit(&importances)
        }
        Command::Upload { file } => {
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| EmissionsError::Schema(format!("invalid file name {}", file.display())))?
                .to_string();
            let content = fs::read(&file)?;
            emit(&service.upload_data(&name, &content)?)
        }
        Command::Train { output } => {
            let evaluation = service.retrain()?;
            if let Some(path) = output {
                service.save_models(&path)?;
                info!("Wrote {}", path.display());
            }
            emit(&evaluation)
        }
        Command::Save { output } => {
            let bundle = service.save_processed_data(&output)?;
            emit(&json!({ "data": output, "models": bundle }))
        }
        Command::Forecast { country, years, save_model, restore } => match restore {
            Some(path) => emit(&service.forecast_with_saved(&country, years, &path)?),
            None => emit(&service.forecast_country(&country, years, save_model.as_deref())?),
        },
        Command::Recommend { .. } => Ok(()),
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        let body = ErrorResponse::from(&e);
        eprintln!(
            "{}",
            serde_json::to_string(&body).unwrap_or_else(|_| format!("{{\"detail\":{:?}}}", body.detail))
        );
        std::process::exit(1);
    }
}

/// the test functions
#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::{fs::File, io::Write};

    // for IO tests
    use crate::io::{load_csv, read_records};
    use crate::error::EmissionsError;
    // for preprocessing tests
    use crate::preprocess::Dataset;

    fn temp_csv(name: &str, body: &str) -> Result<std::path::PathBuf, Box<dyn Error>> {
        let path = std::env::temp_dir().join(format!("{}_{}", std::process::id(), name));
        let mut f = File::create(&path)?;
        f.write_all(body.as_bytes())?;
        Ok(path)
    }

    /// IO: can read well-formed records, extra columns are ignored
    #[test]
    fn test_load_csv() -> Result<(), Box<dyn Error>> {
        let path = temp_csv(
            "test_emissions.csv",
            concat!(
                "iso_code,country,year,co2,population,gdp,energy_per_capita\n",
                "PER,Peru,2019,1.8,32.5,226.8,8.1\n",
                "CHL,Chile,2019,4.6,19.0,278.6,23.4\n",
            ),
        )?;

        let recs = load_csv(&path)?;
        assert_eq!(recs.len(), 2);
        let r = &recs[0];
        assert_eq!(r.country, "Peru");
        assert_eq!(r.year, 2019);
        assert!((r.co2.unwrap() - 1.8).abs() < 1e-12);
        assert!((r.energy_per_capita.unwrap() - 8.1).abs() < 1e-12);
        Ok(())
    }

    /// IO: blank numbers become gaps, broken rows are skipped rather than fatal
    #[test]
    fn test_load_csv_gaps_and_bad_rows() -> Result<(), Box<dyn Error>> {
        let body = concat!(
            "year,country,gdp,population,energy_per_capita,co2\n",
            "2019,Peru,226.8,,8.1,1.8\n",
            "20x9,Peru,1,2,3,4\n",
            "2020,Peru,230.1,33.0,abc,1.9\n",
            "2020,Peru,1,2\n",
            ",,,,,\n",
        );
        let recs = read_records(body.as_bytes())?;
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].population, None);
        assert_eq!(recs[1].energy_per_capita, None);
        Ok(())
    }

    /// IO: a table without the required columns is a schema error
    #[test]
    fn test_missing_columns() {
        let body = "year,country,gdp,co2\n2019,Peru,1,2\n";
        match read_records(body.as_bytes()) {
            Err(EmissionsError::Schema(msg)) => assert!(msg.contains("population")),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    /// PREPROCESS: aggregate regions never reach the dataset
    #[test]
    fn test_aggregates_filtered_on_load() -> Result<(), Box<dyn Error>> {
        let body = concat!(
            "year,country,gdp,population,energy_per_capita,co2\n",
            "2019,World,1,2,3,4\n",
            "2019,North America,1,2,3,4\n",
            "2019,Peru,1,2,3,4\n",
        );
        let ds = Dataset::from_records(read_records(body.as_bytes())?);
        assert_eq!(ds.countries(), &["Peru".to_string()]);
        Ok(())
    }
} // end tests
