// Feature importance bar chart.
use std::collections::BTreeMap;
use std::path::Path;

use plotters::prelude::*;

use crate::error::{EmissionsError, Result};

fn chart_err<E: std::fmt::Display>(e: E) -> EmissionsError {
    EmissionsError::Chart(e.to_string())
}

/// Draws a horizontal bar chart of feature importances and saves it as a PNG at `path`
/// input: feature names with their importance (coefficient or impurity share)
/// logic: split into names and values; compute X-axis range; set up PNG backend;
/// build Cartesian chart; label Y ticks with feature names; draw one bar per feature
pub fn plot_importances(title: &str, importances: &BTreeMap<String, f64>, path: &Path) -> Result<()> {
    let names: Vec<&str> = importances.keys().map(String::as_str).collect();
    let values: Vec<f64> = importances.values().copied().collect();
    let count = values.len();
    if count == 0 {
        return Err(EmissionsError::Chart("no importances to draw".to_string()));
    }

    // X range always includes zero so bars start at the axis
    let min_x = values.iter().cloned().fold(0.0_f64, f64::min);
    let max_x = values.iter().cloned().fold(0.0_f64, f64::max);
    let pad = ((max_x - min_x) * 0.1).max(1e-6);
    let x_range = (min_x - pad)..(max_x + pad);

    let root = BitMapBackend::new(path, (1000, 400)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(160)
        .build_cartesian_2d(x_range, 0..count)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .y_labels(count)
        .y_label_formatter(&|idx| names.get(*idx).map(|n| n.to_string()).unwrap_or_default())
        .x_desc("Importance")
        .y_desc("Feature")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(values.iter().enumerate().map(|(i, &v)| {
            let start = 0.0_f64.min(v);
            let end = 0.0_f64.max(v);
            Rectangle::new([(start, i), (end, i + 1)], BLUE.mix(0.5).filled())
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}
