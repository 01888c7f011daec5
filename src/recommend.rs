// Rule-based mitigation recommendations from emission level, trend and industry mix.
use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const HIGH_THRESHOLD: f64 = 10.0;
pub const MEDIUM_THRESHOLD: f64 = 5.0;
pub const INDUSTRY_SHARE_THRESHOLD: f64 = 0.2;
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Emission band in metric tons per capita.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionLevel {
    High,
    Medium,
    Low,
}

impl EmissionLevel {
    /// Both thresholds are strict: exactly 10.0 is medium, exactly 5.0 is low.
    pub fn classify(current: f64) -> Self {
        if current > HIGH_THRESHOLD {
            EmissionLevel::High
        } else if current > MEDIUM_THRESHOLD {
            EmissionLevel::Medium
        } else {
            EmissionLevel::Low
        }
    }

    fn score(self) -> u32 {
        match self {
            EmissionLevel::High => 2,
            EmissionLevel::Medium => 1,
            EmissionLevel::Low => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
}

pub struct Catalog {
    pub by_level: Vec<(EmissionLevel, Vec<&'static str>)>,
    /// Declaration order here is the tie-break order for industry candidates.
    pub by_industry: Vec<(&'static str, Vec<&'static str>)>,
}

impl Catalog {
    fn for_level(&self, level: EmissionLevel) -> &[&'static str] {
        self.by_level
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, recs)| recs.as_slice())
            .unwrap_or(&[])
    }
}

pub static CATALOG: Lazy<Catalog> = Lazy::new(|| Catalog {
    by_level: vec![
        (
            EmissionLevel::High,
            vec![
                "Implement carbon pricing mechanisms",
                "Invest in renewable energy infrastructure",
                "Promote electric vehicle adoption",
                "Improve energy efficiency in industries",
                "Develop sustainable public transportation",
            ],
        ),
        (
            EmissionLevel::Medium,
            vec![
                "Expand renewable energy capacity",
                "Enhance building energy efficiency",
                "Support sustainable agriculture",
                "Promote waste reduction and recycling",
                "Develop green urban planning",
            ],
        ),
        (
            EmissionLevel::Low,
            vec![
                "Maintain and expand existing green initiatives",
                "Invest in carbon capture technologies",
                "Promote sustainable tourism",
                "Support local environmental projects",
                "Educate about sustainable living",
            ],
        ),
    ],
    by_industry: vec![
        (
            "manufacturing",
            vec![
                "Adopt energy-efficient manufacturing processes",
                "Implement waste heat recovery systems",
                "Switch to renewable energy sources",
                "Optimize supply chain logistics",
                "Invest in carbon capture technology",
            ],
        ),
        (
            "transportation",
            vec![
                "Expand public transportation networks",
                "Promote electric vehicle infrastructure",
                "Implement congestion pricing",
                "Develop bike-friendly cities",
                "Optimize freight transportation",
            ],
        ),
        (
            "energy",
            vec![
                "Transition to renewable energy sources",
                "Modernize power grid infrastructure",
                "Implement smart grid technologies",
                "Promote energy storage solutions",
                "Develop microgrid systems",
            ],
        ),
        (
            "agriculture",
            vec![
                "Implement precision farming techniques",
                "Reduce fertilizer use",
                "Promote sustainable livestock management",
                "Develop agroforestry systems",
                "Support organic farming",
            ],
        ),
    ],
});

/// Slope of the least-squares line through `(index, value)`; zero for fewer than two points.
pub fn trend_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / nf;
    let (num, den) = values.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, &y)| {
        let dx = i as f64 - x_mean;
        (num + dx * (y - y_mean), den + dx * dx)
    });
    num / den
}

/// Inputs echoed back alongside the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub current_emissions: f64,
    pub historical_trend: Vec<f64>,
    pub industry_breakdown: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub emission_level: EmissionLevel,
    pub trend: Trend,
    pub trend_magnitude: f64,
    pub recommendations: Vec<String>,
    pub analysis: Analysis,
}

pub fn recommend(
    current: f64,
    history: &[f64],
    industry_shares: &BTreeMap<String, f64>,
) -> Recommendation {
    let slope = trend_slope(history);
    let trend = if slope > 0.0 { Trend::Increasing } else { Trend::Decreasing };
    let level = EmissionLevel::classify(current);

    // base list first, then heavy industries in catalog order
    let mut candidates: Vec<&'static str> = CATALOG.for_level(level).to_vec();
    let mut from_industry: HashSet<&'static str> = HashSet::new();
    for (industry, recs) in &CATALOG.by_industry {
        let heavy = industry_shares
            .get(*industry)
            .is_some_and(|&share| share > INDUSTRY_SHARE_THRESHOLD);
        if heavy {
            candidates.extend(recs.iter().copied());
            from_industry.extend(recs.iter().copied());
        }
    }

    let mut seen = HashSet::new();
    candidates.retain(|rec| seen.insert(*rec));

    let base_score = level.score() + if trend == Trend::Increasing { 2 } else { 0 };
    let mut scored: Vec<(u32, &str)> = candidates
        .into_iter()
        .map(|rec| (base_score + u32::from(from_industry.contains(rec)), rec))
        .collect();
    // stable: equal scores keep candidate order
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    Recommendation {
        emission_level: level,
        trend,
        trend_magnitude: slope.abs(),
        recommendations: scored
            .into_iter()
            .take(MAX_RECOMMENDATIONS)
            .map(|(_, rec)| rec.to_string())
            .collect(),
        analysis: Analysis {
            current_emissions: current,
            historical_trend: history.to_vec(),
            industry_breakdown: industry_shares.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shares(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn high_increasing_with_manufacturing() {
        let r = recommend(12.0, &[8.0, 9.0, 10.0, 11.0], &shares(&[("manufacturing", 0.3)]));
        assert_eq!(r.emission_level, EmissionLevel::High);
        assert_eq!(r.trend, Trend::Increasing);
        assert!((r.trend_magnitude - 1.0).abs() < 1e-12);
        assert!(r.recommendations.len() <= MAX_RECOMMENDATIONS);
        let manufacturing = &CATALOG.by_industry[0].1;
        assert!(r.recommendations.iter().any(|rec| manufacturing.contains(&rec.as_str())));
        // industry items outrank the base list, in catalog order
        assert_eq!(r.recommendations[0], "Adopt energy-efficient manufacturing processes");
        assert_eq!(r.analysis.current_emissions, 12.0);
    }

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(EmissionLevel::classify(10.0), EmissionLevel::Medium);
        assert_eq!(EmissionLevel::classify(10.01), EmissionLevel::High);
        assert_eq!(EmissionLevel::classify(5.0), EmissionLevel::Low);
        assert_eq!(EmissionLevel::classify(5.5), EmissionLevel::Medium);
    }

    #[test]
    fn flat_or_short_history_counts_as_decreasing() {
        assert_eq!(recommend(3.0, &[4.0, 4.0, 4.0], &BTreeMap::new()).trend, Trend::Decreasing);
        assert_eq!(recommend(3.0, &[4.0], &BTreeMap::new()).trend, Trend::Decreasing);
        assert_eq!(recommend(3.0, &[], &BTreeMap::new()).trend_magnitude, 0.0);
    }

    #[test]
    fn small_and_unknown_industries_add_nothing() {
        let r = recommend(7.0, &[7.0, 6.0], &shares(&[("energy", 0.2), ("mining", 0.9)]));
        assert_eq!(r.emission_level, EmissionLevel::Medium);
        assert_eq!(r.recommendations, CATALOG.for_level(EmissionLevel::Medium).to_vec());
    }

    #[test]
    fn ranking_is_reproducible() {
        let s = shares(&[("energy", 0.5), ("transportation", 0.4)]);
        let a = recommend(11.0, &[1.0, 2.0], &s);
        let b = recommend(11.0, &[1.0, 2.0], &s);
        assert_eq!(a.recommendations, b.recommendations);
        // transportation is declared before energy
        assert_eq!(a.recommendations[0], "Expand public transportation networks");
    }
}
