//! Group-by/reduce over loaded records, plus the quantile helpers every
//! threshold in the crate is derived from.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::error::AggregationError;
use crate::models::Record;

/// Text fields a table can be grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Date,
    Month,
    StoreId,
    ProductId,
    Category,
    Region,
    WeatherCondition,
    Seasonality,
}

impl Dimension {
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Date => "Date",
            Dimension::Month => "Month",
            Dimension::StoreId => "Store ID",
            Dimension::ProductId => "Product ID",
            Dimension::Category => "Category",
            Dimension::Region => "Region",
            Dimension::WeatherCondition => "Weather Condition",
            Dimension::Seasonality => "Seasonality",
        }
    }

    pub fn value(&self, record: &Record) -> String {
        match self {
            Dimension::Date => record.date.to_string(),
            Dimension::Month => record.month(),
            Dimension::StoreId => record.store_id.clone(),
            Dimension::ProductId => record.product_id.clone(),
            Dimension::Category => record.category.clone(),
            Dimension::Region => record.region.clone(),
            Dimension::WeatherCondition => record.weather_condition.clone(),
            Dimension::Seasonality => record.seasonality.clone(),
        }
    }
}

/// Numeric quantities a reduction can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    InventoryLevel,
    UnitsSold,
    UnitsOrdered,
    Price,
    Discount,
    CompetitorPrice,
    Revenue,
    InventoryValue,
}

impl Measure {
    pub fn label(&self) -> &'static str {
        match self {
            Measure::InventoryLevel => "Inventory Level",
            Measure::UnitsSold => "Units Sold",
            Measure::UnitsOrdered => "Units Ordered",
            Measure::Price => "Price",
            Measure::Discount => "Discount",
            Measure::CompetitorPrice => "Competitor Pricing",
            Measure::Revenue => "Revenue",
            Measure::InventoryValue => "Inventory Value",
        }
    }

    pub fn value(&self, record: &Record) -> f64 {
        match self {
            Measure::InventoryLevel => record.inventory_level as f64,
            Measure::UnitsSold => record.units_sold as f64,
            Measure::UnitsOrdered => record.units_ordered as f64,
            Measure::Price => record.price,
            Measure::Discount => record.discount_percent,
            Measure::CompetitorPrice => record.competitor_price,
            Measure::Revenue => record.revenue(),
            Measure::InventoryValue => record.inventory_value(),
        }
    }

    pub fn values(&self, records: &[Record]) -> Vec<f64> {
        records.iter().map(|r| self.value(r)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum(Measure),
    Mean(Measure),
    Min(Measure),
    Max(Measure),
    Count,
    NUnique(Dimension),
}

impl Reduction {
    pub fn label(&self) -> String {
        match self {
            Reduction::Sum(m) => format!("Total {}", m.label()),
            Reduction::Mean(m) => format!("Avg {}", m.label()),
            Reduction::Min(m) => format!("Min {}", m.label()),
            Reduction::Max(m) => format!("Max {}", m.label()),
            Reduction::Count => "Records".to_string(),
            Reduction::NUnique(d) => format!("Distinct {}", d.label()),
        }
    }

    /// NaN readings are skipped, matching how missing cells are treated elsewhere.
    fn reduce(&self, members: &[&Record]) -> f64 {
        let readings = |m: &Measure| -> Vec<f64> {
            members
                .iter()
                .map(|r| m.value(r))
                .filter(|v| !v.is_nan())
                .collect()
        };

        match self {
            Reduction::Sum(m) => readings(m).iter().sum(),
            Reduction::Mean(m) => mean(&readings(m)).unwrap_or(f64::NAN),
            Reduction::Min(m) => readings(m).into_iter().reduce(f64::min).unwrap_or(f64::NAN),
            Reduction::Max(m) => readings(m).into_iter().reduce(f64::max).unwrap_or(f64::NAN),
            Reduction::Count => members.len() as f64,
            Reduction::NUnique(d) => {
                let distinct: HashSet<String> = members.iter().map(|r| d.value(r)).collect();
                distinct.len() as f64
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Reduced(Reduction),
    Derived(&'static str),
}

impl Column {
    pub fn label(&self) -> String {
        match self {
            Column::Reduced(reduction) => reduction.label(),
            Column::Derived(name) => name.to_string(),
        }
    }
}

impl From<Reduction> for Column {
    fn from(reduction: Reduction) -> Self {
        Column::Reduced(reduction)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub keys: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Result of one grouping: one row per distinct key tuple, in key order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    pub group_by: Vec<Dimension>,
    pub columns: Vec<Column>,
    pub rows: Vec<AggregateRow>,
}

pub fn aggregate<'a, I>(
    records: I,
    group_by: &[Dimension],
    reductions: &[Reduction],
) -> Result<AggregateTable, AggregationError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut groups: BTreeMap<Vec<String>, Vec<&Record>> = BTreeMap::new();
    for record in records {
        let key = group_by.iter().map(|d| d.value(record)).collect();
        groups.entry(key).or_default().push(record);
    }

    if groups.is_empty() {
        return Err(AggregationError::EmptyInput);
    }

    let rows = groups
        .into_iter()
        .map(|(keys, members)| AggregateRow {
            keys,
            values: reductions.iter().map(|r| r.reduce(&members)).collect(),
        })
        .collect();

    Ok(AggregateTable {
        group_by: group_by.to_vec(),
        columns: reductions.iter().copied().map(Column::from).collect(),
        rows,
    })
}

impl AggregateTable {
    /// A table with the given shape and no rows, for rules that matched nothing.
    pub fn empty(group_by: &[Dimension], reductions: &[Reduction]) -> Self {
        Self {
            group_by: group_by.to_vec(),
            columns: reductions.iter().copied().map(Column::from).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> Vec<String> {
        self.group_by
            .iter()
            .map(|d| d.label().to_string())
            .chain(self.columns.iter().map(Column::label))
            .collect()
    }

    pub fn position(&self, column: &Column) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// NaN when the column is not part of this table.
    pub fn get(&self, row: &AggregateRow, column: &Column) -> f64 {
        self.position(column)
            .and_then(|i| row.values.get(i).copied())
            .unwrap_or(f64::NAN)
    }

    pub fn column_values(&self, column: &Column) -> Vec<f64> {
        self.rows.iter().map(|row| self.get(row, column)).collect()
    }

    pub fn sort_by(mut self, column: &Column, order: SortOrder) -> Self {
        if let Some(i) = self.position(column) {
            self.rows.sort_by(|a, b| {
                let ordering = a.values[i].partial_cmp(&b.values[i]).unwrap_or(Ordering::Equal);
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        self
    }

    pub fn head(mut self, n: usize) -> Self {
        self.rows.truncate(n);
        self
    }

    pub fn retain<F>(mut self, column: &Column, keep: F) -> Self
    where
        F: Fn(f64) -> bool,
    {
        if let Some(i) = self.position(column) {
            self.rows.retain(|row| keep(row.values[i]));
        }
        self
    }

    /// Appends `minuend - subtrahend` as a named column.
    pub fn with_difference(
        mut self,
        name: &'static str,
        minuend: Reduction,
        subtrahend: Reduction,
    ) -> Self {
        let (a, b) = (Column::from(minuend), Column::from(subtrahend));
        let diffs: Vec<f64> = self
            .rows
            .iter()
            .map(|row| self.get(row, &a) - self.get(row, &b))
            .collect();
        for (row, diff) in self.rows.iter_mut().zip(diffs) {
            row.values.push(diff);
        }
        self.columns.push(Column::Derived(name));
        self
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// Quantile with linear interpolation between order statistics. NaNs are skipped.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::small_dataset;

    #[test]
    fn one_row_per_distinct_key() {
        let data = small_dataset();
        let table = aggregate(
            data.records(),
            &[Dimension::StoreId, Dimension::Category],
            &[Reduction::Count, Reduction::Sum(Measure::UnitsSold)],
        )
        .unwrap();

        assert_eq!(table.len(), 3);
        let counts: f64 = table.column_values(&Reduction::Count.into()).iter().sum();
        assert_eq!(counts as usize, data.len());
        assert_eq!(table.rows[0].keys, vec!["S001", "Toys"]);
        assert_eq!(table.rows[0].values, vec![2.0, 90.0]);
    }

    #[test]
    fn single_member_groups_are_kept() {
        let data = small_dataset();
        let table = aggregate(
            data.records(),
            &[Dimension::Region],
            &[Reduction::Mean(Measure::InventoryLevel)],
        )
        .unwrap();
        let south = table.rows.iter().find(|r| r.keys[0] == "South").unwrap();
        assert_eq!(south.values, vec![20.0]);
    }

    #[test]
    fn empty_input_is_rejected() {
        let none: Vec<Record> = Vec::new();
        let result = aggregate(&none, &[Dimension::Category], &[Reduction::Count]);
        assert_eq!(result.unwrap_err(), AggregationError::EmptyInput);
    }

    #[test]
    fn no_grouping_gives_overall_totals() {
        let data = small_dataset();
        let table = aggregate(data.records(), &[], &[Reduction::Sum(Measure::UnitsSold)]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].values[0], 210.0);
    }

    #[test]
    fn nunique_and_extremes() {
        let data = small_dataset();
        let table = aggregate(
            data.records(),
            &[Dimension::ProductId],
            &[
                Reduction::NUnique(Dimension::StoreId),
                Reduction::Min(Measure::InventoryLevel),
                Reduction::Max(Measure::InventoryLevel),
            ],
        )
        .unwrap();
        let p3 = table.rows.iter().find(|r| r.keys[0] == "P0003").unwrap();
        assert_eq!(p3.values, vec![2.0, 40.0, 50.0]);
    }

    #[test]
    fn sort_head_and_difference() {
        let data = small_dataset();
        let price = Reduction::Mean(Measure::Price);
        let competitor = Reduction::Mean(Measure::CompetitorPrice);
        let table = aggregate(data.records(), &[Dimension::ProductId], &[price, competitor])
            .unwrap()
            .with_difference("Price Difference", price, competitor)
            .sort_by(&Column::Derived("Price Difference"), SortOrder::Descending)
            .head(1);

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].keys[0], "P0001");
        assert!((table.rows[0].values[2] - 5.5).abs() < 1e-9);
        assert_eq!(
            table.headers(),
            vec!["Product ID", "Avg Price", "Avg Competitor Pricing", "Price Difference"]
        );
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(quantile(&values, 0.2), Some(18.0));
        assert_eq!(quantile(&values, 0.5), Some(30.0));
        assert_eq!(quantile(&values, 0.75), Some(40.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn quantiles_are_monotonic() {
        let values = [7.0, 3.0, 99.0, 15.0, 42.0, 8.0, 1.0];
        let low = quantile(&values, 0.2).unwrap();
        let high = quantile(&values, 0.8).unwrap();
        assert!(high > low);

        let constant = [5.0; 6];
        assert_eq!(quantile(&constant, 0.2), quantile(&constant, 0.8));
    }

    #[test]
    fn mean_skips_missing() {
        assert_eq!(mean(&[1.0, f64::NAN, 3.0]), Some(2.0));
        assert_eq!(mean(&[f64::NAN]), None);
    }
}
