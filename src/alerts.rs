//! Threshold rules evaluated against the full dataset on every call.
//!
//! Record-level rules (low stock, high demand, the two pricing rules) flag
//! individual rows, count them, and then summarize the flagged rows per group.
//! Group-level rules (stores, categories) flag whole groups.

use log::debug;

use crate::aggregate::{
    aggregate, mean, quantile, AggregateTable, Column, Dimension, Measure, Reduction, SortOrder,
};
use crate::error::AggregationError;
use crate::models::{Dataset, Record, Selection};

/// Rows kept in each rule's summary table.
pub const SUMMARY_LIMIT: usize = 10;
/// Records shown in the filter preview.
pub const PREVIEW_LIMIT: usize = 20;

/// Discount percentage above which low sales count as a mismatch.
const DISCOUNT_FLOOR: f64 = 15.0;
/// Price over competitor price that flags a product.
const COMPETITOR_MARKUP: f64 = 1.2;
/// Fraction of the mean store total below which a store underperforms.
const STORE_SHARE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertRule {
    LowStock,
    HighDemand,
    DiscountMismatch,
    PriceAboveCompetitor,
    StoreUnderperformance,
    CategoryStockoutRisk,
}

impl AlertRule {
    pub const ALL: [AlertRule; 6] = [
        AlertRule::LowStock,
        AlertRule::HighDemand,
        AlertRule::DiscountMismatch,
        AlertRule::PriceAboveCompetitor,
        AlertRule::StoreUnderperformance,
        AlertRule::CategoryStockoutRisk,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            AlertRule::LowStock => "Low Stock",
            AlertRule::HighDemand => "High Demand",
            AlertRule::DiscountMismatch => "High Discount, Low Sales",
            AlertRule::PriceAboveCompetitor => "Price Above Competitors",
            AlertRule::StoreUnderperformance => "Underperforming Stores",
            AlertRule::CategoryStockoutRisk => "Potential Stockout Risk",
        }
    }

    pub fn evaluate(&self, dataset: &Dataset) -> Result<Alert, AggregationError> {
        match self {
            AlertRule::LowStock => low_stock(dataset),
            AlertRule::HighDemand => high_demand(dataset),
            AlertRule::DiscountMismatch => discount_mismatch(dataset),
            AlertRule::PriceAboveCompetitor => price_above_competitor(dataset),
            AlertRule::StoreUnderperformance => store_underperformance(dataset),
            AlertRule::CategoryStockoutRisk => category_stockout_risk(dataset),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub rule: AlertRule,
    /// Flagged records for record-level rules, flagged groups otherwise.
    pub matched: usize,
    pub threshold: f64,
    pub summary: AggregateTable,
}

impl Alert {
    pub fn message(&self) -> String {
        match self.rule {
            AlertRule::LowStock => format!(
                "{} products have inventory levels below the threshold ({:.0} units)",
                self.matched, self.threshold
            ),
            AlertRule::HighDemand => format!(
                "{} product entries show high demand (above {:.0} units ordered)",
                self.matched, self.threshold
            ),
            AlertRule::DiscountMismatch => format!(
                "{} products have high discounts (>{:.0}%) but sell fewer than {:.0} units",
                self.matched, DISCOUNT_FLOOR, self.threshold
            ),
            AlertRule::PriceAboveCompetitor => format!(
                "{} products are priced more than {:.0}% above competitor pricing",
                self.matched,
                (self.threshold - 1.0) * 100.0
            ),
            AlertRule::StoreUnderperformance => format!(
                "{} stores sold fewer than {:.0} units in total",
                self.matched, self.threshold
            ),
            AlertRule::CategoryStockoutRisk => format!(
                "{} categories show orders exceeding sales by more than {:.0} units",
                self.matched, self.threshold
            ),
        }
    }
}

/// Groups the flagged rows, or an empty table of the same shape when nothing was flagged.
fn summarize(
    flagged: &[&Record],
    group_by: &[Dimension],
    reductions: &[Reduction],
) -> Result<AggregateTable, AggregationError> {
    if flagged.is_empty() {
        return Ok(AggregateTable::empty(group_by, reductions));
    }
    aggregate(flagged.iter().copied(), group_by, reductions)
}

fn threshold_of(values: &[f64], q: f64) -> Result<f64, AggregationError> {
    quantile(values, q).ok_or(AggregationError::EmptyInput)
}

pub fn low_stock(dataset: &Dataset) -> Result<Alert, AggregationError> {
    let threshold = threshold_of(&Measure::InventoryLevel.values(dataset.records()), 0.2)?;
    let flagged: Vec<&Record> = dataset
        .records()
        .iter()
        .filter(|r| (r.inventory_level as f64) < threshold)
        .collect();
    debug!("low stock: threshold {:.2}, {} rows", threshold, flagged.len());

    let inventory = Reduction::Mean(Measure::InventoryLevel);
    let summary = summarize(
        &flagged,
        &[Dimension::ProductId, Dimension::Category, Dimension::StoreId],
        &[
            inventory,
            Reduction::Mean(Measure::UnitsSold),
            Reduction::Mean(Measure::Price),
        ],
    )?
    .sort_by(&inventory.into(), SortOrder::Ascending)
    .head(SUMMARY_LIMIT);

    Ok(Alert {
        rule: AlertRule::LowStock,
        matched: flagged.len(),
        threshold,
        summary,
    })
}

pub fn high_demand(dataset: &Dataset) -> Result<Alert, AggregationError> {
    let threshold = threshold_of(&Measure::UnitsOrdered.values(dataset.records()), 0.8)?;
    let flagged: Vec<&Record> = dataset
        .records()
        .iter()
        .filter(|r| (r.units_ordered as f64) > threshold)
        .collect();
    debug!("high demand: threshold {:.2}, {} rows", threshold, flagged.len());

    let ordered = Reduction::Mean(Measure::UnitsOrdered);
    let summary = summarize(
        &flagged,
        &[Dimension::ProductId, Dimension::Category, Dimension::Region],
        &[
            ordered,
            Reduction::Mean(Measure::InventoryLevel),
            Reduction::Mean(Measure::Price),
            Reduction::Mean(Measure::Discount),
        ],
    )?
    .sort_by(&ordered.into(), SortOrder::Descending)
    .head(SUMMARY_LIMIT);

    Ok(Alert {
        rule: AlertRule::HighDemand,
        matched: flagged.len(),
        threshold,
        summary,
    })
}

pub fn discount_mismatch(dataset: &Dataset) -> Result<Alert, AggregationError> {
    let threshold = threshold_of(&Measure::UnitsSold.values(dataset.records()), 0.3)?;
    let flagged: Vec<&Record> = dataset
        .records()
        .iter()
        .filter(|r| r.discount_percent > DISCOUNT_FLOOR && (r.units_sold as f64) < threshold)
        .collect();
    debug!("discount mismatch: threshold {:.2}, {} rows", threshold, flagged.len());

    let discount = Reduction::Mean(Measure::Discount);
    let summary = summarize(
        &flagged,
        &[Dimension::ProductId, Dimension::Category],
        &[
            discount,
            Reduction::Mean(Measure::UnitsSold),
            Reduction::Mean(Measure::Price),
        ],
    )?
    .sort_by(&discount.into(), SortOrder::Descending)
    .head(SUMMARY_LIMIT);

    Ok(Alert {
        rule: AlertRule::DiscountMismatch,
        matched: flagged.len(),
        threshold,
        summary,
    })
}

pub fn price_above_competitor(dataset: &Dataset) -> Result<Alert, AggregationError> {
    if dataset.is_empty() {
        return Err(AggregationError::EmptyInput);
    }
    let flagged: Vec<&Record> = dataset
        .records()
        .iter()
        .filter(|r| r.price > r.competitor_price * COMPETITOR_MARKUP)
        .collect();
    debug!("price above competitor: {} rows", flagged.len());

    let price = Reduction::Mean(Measure::Price);
    let competitor = Reduction::Mean(Measure::CompetitorPrice);
    let summary = summarize(
        &flagged,
        &[Dimension::ProductId, Dimension::Category],
        &[price, competitor, Reduction::Mean(Measure::UnitsSold)],
    )?
    .with_difference("Price Difference", price, competitor)
    .sort_by(&Column::Derived("Price Difference"), SortOrder::Descending)
    .head(SUMMARY_LIMIT);

    Ok(Alert {
        rule: AlertRule::PriceAboveCompetitor,
        matched: flagged.len(),
        threshold: COMPETITOR_MARKUP,
        summary,
    })
}

pub fn store_underperformance(dataset: &Dataset) -> Result<Alert, AggregationError> {
    let sold = Reduction::Sum(Measure::UnitsSold);
    let stores = aggregate(
        dataset.records(),
        &[Dimension::StoreId],
        &[sold, Reduction::Mean(Measure::InventoryLevel)],
    )?;

    let totals = stores.column_values(&sold.into());
    let threshold = mean(&totals).ok_or(AggregationError::EmptyInput)? * STORE_SHARE;
    let flagged = stores
        .retain(&sold.into(), |total| total < threshold)
        .sort_by(&sold.into(), SortOrder::Ascending);
    debug!("store underperformance: threshold {:.2}, {} stores", threshold, flagged.len());

    Ok(Alert {
        rule: AlertRule::StoreUnderperformance,
        matched: flagged.len(),
        threshold,
        summary: flagged.head(SUMMARY_LIMIT),
    })
}

pub fn category_stockout_risk(dataset: &Dataset) -> Result<Alert, AggregationError> {
    let sold = Reduction::Sum(Measure::UnitsSold);
    let ordered = Reduction::Sum(Measure::UnitsOrdered);
    let gap = Column::Derived("Demand vs Supply");

    let categories = aggregate(
        dataset.records(),
        &[Dimension::Category],
        &[sold, Reduction::Mean(Measure::InventoryLevel), ordered],
    )?
    .with_difference("Demand vs Supply", ordered, sold);

    let threshold = threshold_of(&categories.column_values(&gap), 0.75)?;
    let flagged = categories
        .retain(&gap, |diff| diff > threshold)
        .sort_by(&gap, SortOrder::Descending);
    debug!("category stockout risk: threshold {:.2}, {} categories", threshold, flagged.len());

    Ok(Alert {
        rule: AlertRule::CategoryStockoutRisk,
        matched: flagged.len(),
        threshold,
        summary: flagged.head(SUMMARY_LIMIT),
    })
}

pub fn evaluate_all(dataset: &Dataset) -> Result<Vec<Alert>, AggregationError> {
    AlertRule::ALL.iter().map(|rule| rule.evaluate(dataset)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlertCounts {
    pub low_stock: usize,
    pub high_demand: usize,
    pub pricing: usize,
    pub stores: usize,
}

impl AlertCounts {
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let mut counts = AlertCounts::default();
        for alert in alerts {
            match alert.rule {
                AlertRule::LowStock => counts.low_stock += alert.matched,
                AlertRule::HighDemand => counts.high_demand += alert.matched,
                AlertRule::DiscountMismatch | AlertRule::PriceAboveCompetitor => {
                    counts.pricing += alert.matched
                }
                AlertRule::StoreUnderperformance => counts.stores += alert.matched,
                AlertRule::CategoryStockoutRisk => {}
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterPreview {
    pub matched: usize,
    pub records: Vec<Record>,
}

/// Records matching a category/region selection; thresholds are unaffected.
pub fn preview(dataset: &Dataset, selection: &Selection) -> Option<FilterPreview> {
    if selection.is_empty() {
        return None;
    }
    let matching: Vec<&Record> = dataset
        .records()
        .iter()
        .filter(|r| selection.matches(r))
        .collect();
    Some(FilterPreview {
        matched: matching.len(),
        records: matching.into_iter().take(PREVIEW_LIMIT).cloned().collect(),
    })
}
