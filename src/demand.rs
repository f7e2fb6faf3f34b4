use std::collections::BTreeMap;
use std::fmt;

use crate::aggregate::quantile;
use crate::models::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DemandLevel {
    Low,
    Medium,
    High,
}

impl DemandLevel {
    pub const ALL: [DemandLevel; 3] = [DemandLevel::Low, DemandLevel::Medium, DemandLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            DemandLevel::Low => "Low",
            DemandLevel::Medium => "Medium",
            DemandLevel::High => "High",
        }
    }

    fn from_score(score: u32) -> Self {
        match score {
            s if s >= 4 => DemandLevel::High,
            2..=3 => DemandLevel::Medium,
            _ => DemandLevel::Low,
        }
    }
}

impl fmt::Display for DemandLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemandInputs {
    pub category: String,
    pub price: f64,
    pub discount_percent: f64,
    pub inventory_level: u32,
    pub is_holiday: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandPrediction {
    pub level: DemandLevel,
    pub score: u32,
    pub reasons: Vec<&'static str>,
}

const POPULAR_CATEGORIES: [&str; 2] = ["Electronics", "Toys"];

/// Point-scores the inputs and maps the total onto a demand level.
///
/// Reasons are listed in evaluation order, one per predicate that fired.
pub fn predict(inputs: &DemandInputs) -> DemandPrediction {
    let checks: [(bool, u32, &'static str); 5] = [
        (
            inputs.price < 40.0,
            2,
            "Competitive pricing attracts more customers",
        ),
        (
            inputs.discount_percent > 15.0,
            2,
            "Strong discount driving high demand",
        ),
        (
            inputs.is_holiday,
            1,
            "Holiday/promotion period increases sales",
        ),
        (
            POPULAR_CATEGORIES.contains(&inputs.category.as_str()),
            1,
            "Popular category with high demand",
        ),
        (
            inputs.inventory_level < 150,
            1,
            "Low inventory may indicate high demand",
        ),
    ];

    let mut score = 0;
    let mut reasons = Vec::new();
    for (fired, points, reason) in checks {
        if fired {
            score += points;
            reasons.push(reason);
        }
    }

    DemandPrediction {
        level: DemandLevel::from_score(score),
        score,
        reasons,
    }
}

/// Cut-points at the 1/3 and 2/3 quantiles.
pub fn tertile_cuts(values: &[f64]) -> Option<(f64, f64)> {
    Some((quantile(values, 1.0 / 3.0)?, quantile(values, 2.0 / 3.0)?))
}

/// Bins are right-inclusive; the lowest value lands in `Low`.
pub fn classify(value: f64, cuts: (f64, f64)) -> DemandLevel {
    if value <= cuts.0 {
        DemandLevel::Low
    } else if value <= cuts.1 {
        DemandLevel::Medium
    } else {
        DemandLevel::High
    }
}

pub fn demand_levels(values: &[f64]) -> Vec<DemandLevel> {
    match tertile_cuts(values) {
        Some(cuts) => values.iter().map(|v| classify(*v, cuts)).collect(),
        None => Vec::new(),
    }
}

/// Units-ordered tertile counts, in Low/Medium/High order.
pub fn distribution(dataset: &Dataset) -> Vec<(DemandLevel, usize)> {
    let ordered: Vec<f64> = dataset
        .records()
        .iter()
        .map(|r| r.units_ordered as f64)
        .collect();
    let levels = demand_levels(&ordered);

    DemandLevel::ALL
        .iter()
        .map(|level| (*level, levels.iter().filter(|l| *l == level).count()))
        .collect()
}

/// Per-category units-ordered tertile counts, `[low, medium, high]`.
pub fn by_category(dataset: &Dataset) -> Vec<(String, [usize; 3])> {
    let ordered: Vec<f64> = dataset
        .records()
        .iter()
        .map(|r| r.units_ordered as f64)
        .collect();
    let levels = demand_levels(&ordered);

    let mut table: BTreeMap<String, [usize; 3]> = BTreeMap::new();
    for (record, level) in dataset.records().iter().zip(levels) {
        let counts = table.entry(record.category.clone()).or_insert([0; 3]);
        counts[level as usize] += 1;
    }
    table.into_iter().collect()
}
