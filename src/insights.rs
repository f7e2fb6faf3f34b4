use std::cmp::Ordering;

use crate::aggregate::{
    aggregate, mean, AggregateRow, AggregateTable, Column, Dimension, Measure, Reduction,
    SortOrder,
};
use crate::error::AggregationError;
use crate::models::Dataset;

#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub total_units_sold: f64,
    pub avg_daily_sales: f64,
    pub total_revenue: f64,
    pub unique_products: usize,
}

pub fn kpis(dataset: &Dataset) -> Result<Kpis, AggregationError> {
    let totals = aggregate(
        dataset.records(),
        &[],
        &[
            Reduction::Sum(Measure::UnitsSold),
            Reduction::Sum(Measure::Revenue),
            Reduction::NUnique(Dimension::ProductId),
        ],
    )?;
    let overall = &totals.rows[0].values;

    Ok(Kpis {
        total_units_sold: overall[0],
        avg_daily_sales: avg_daily_sales(dataset)?,
        total_revenue: overall[1],
        unique_products: overall[2] as usize,
    })
}

/// Mean over dates of the per-date unit totals.
pub fn avg_daily_sales(dataset: &Dataset) -> Result<f64, AggregationError> {
    let sold = Reduction::Sum(Measure::UnitsSold);
    let daily = aggregate(dataset.records(), &[Dimension::Date], &[sold])?;
    mean(&daily.column_values(&sold.into())).ok_or(AggregationError::EmptyInput)
}

fn units_sold_by(
    dataset: &Dataset,
    group_by: &[Dimension],
    reduction: Reduction,
) -> Result<AggregateTable, AggregationError> {
    aggregate(dataset.records(), group_by, &[reduction])
}

/// Every breakdown chart on the overview page.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdowns {
    pub category_totals: AggregateTable,
    pub category_means: AggregateTable,
    pub region_totals: AggregateTable,
    pub store_totals: AggregateTable,
    pub region_category: AggregateTable,
    pub daily_trend: AggregateTable,
    pub monthly_trend: AggregateTable,
    pub seasonal_totals: AggregateTable,
}

pub fn breakdowns(dataset: &Dataset) -> Result<Breakdowns, AggregationError> {
    let sold = Reduction::Sum(Measure::UnitsSold);
    let avg_sold = Reduction::Mean(Measure::UnitsSold);

    Ok(Breakdowns {
        category_totals: units_sold_by(dataset, &[Dimension::Category], sold)?,
        category_means: units_sold_by(dataset, &[Dimension::Category], avg_sold)?
            .sort_by(&avg_sold.into(), SortOrder::Descending),
        region_totals: units_sold_by(dataset, &[Dimension::Region], sold)?,
        store_totals: units_sold_by(dataset, &[Dimension::StoreId], sold)?
            .sort_by(&sold.into(), SortOrder::Descending),
        region_category: units_sold_by(dataset, &[Dimension::Region, Dimension::Category], sold)?,
        daily_trend: units_sold_by(dataset, &[Dimension::Date], sold)?,
        monthly_trend: units_sold_by(dataset, &[Dimension::Month], sold)?,
        seasonal_totals: aggregate(
            dataset.records(),
            &[Dimension::Seasonality],
            &[sold, avg_sold],
        )?,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusinessInsights {
    pub top_categories: AggregateTable,
    pub regions_ranked: AggregateTable,
    pub avg_price: f64,
    pub avg_discount: f64,
    pub discounted_share: f64,
    /// Seasons with the highest and lowest mean units sold.
    pub best_season: String,
    pub slowest_season: String,
}

/// Key of the first row holding the largest (`Greater`) or smallest (`Less`) reduced value.
fn extreme_key(table: &AggregateTable, reduction: Reduction, wanted: Ordering) -> Option<String> {
    let column: Column = reduction.into();
    table
        .rows
        .iter()
        .reduce(|best: &AggregateRow, row| {
            let ordering = table
                .get(row, &column)
                .partial_cmp(&table.get(best, &column))
                .unwrap_or(Ordering::Equal);
            if ordering == wanted {
                row
            } else {
                best
            }
        })
        .map(|row| row.keys[0].clone())
}

pub fn business_insights(dataset: &Dataset) -> Result<BusinessInsights, AggregationError> {
    let sold = Reduction::Sum(Measure::UnitsSold);
    let overall = aggregate(
        dataset.records(),
        &[],
        &[Reduction::Mean(Measure::Price), Reduction::Mean(Measure::Discount)],
    )?;
    let avg_sold = Reduction::Mean(Measure::UnitsSold);
    let seasons = aggregate(dataset.records(), &[Dimension::Seasonality], &[avg_sold])?;
    let best_season =
        extreme_key(&seasons, avg_sold, Ordering::Greater).ok_or(AggregationError::EmptyInput)?;
    let slowest_season =
        extreme_key(&seasons, avg_sold, Ordering::Less).ok_or(AggregationError::EmptyInput)?;
    let discounted = dataset
        .records()
        .iter()
        .filter(|r| r.discount_percent > 0.0)
        .count();

    Ok(BusinessInsights {
        top_categories: units_sold_by(dataset, &[Dimension::Category], sold)?
            .sort_by(&sold.into(), SortOrder::Descending)
            .head(3),
        regions_ranked: units_sold_by(dataset, &[Dimension::Region], sold)?
            .sort_by(&sold.into(), SortOrder::Descending),
        avg_price: overall.rows[0].values[0],
        avg_discount: overall.rows[0].values[1],
        discounted_share: discounted as f64 / dataset.len() as f64 * 100.0,
        best_season,
        slowest_season,
    })
}

/// Bins in the inventory-level histogram.
pub const INVENTORY_BINS: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram of inventory levels; the last bin includes its upper edge.
pub fn inventory_distribution(dataset: &Dataset, bins: usize) -> Vec<HistogramBin> {
    let levels = Measure::InventoryLevel.values(dataset.records());
    let (Some(min), Some(max)) = (
        levels.iter().copied().reduce(f64::min),
        levels.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }
    if max == min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: levels.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();
    for level in levels {
        let index = (((level - min) / width) as usize).min(bins - 1);
        histogram[index].count += 1;
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::small_dataset;

    #[test]
    fn kpis_over_small_dataset() {
        let k = kpis(&small_dataset()).unwrap();
        assert_eq!(k.total_units_sold, 210.0);
        // dates: 01-01 -> 100, 01-02 -> 100, 02-01 -> 10
        assert!((k.avg_daily_sales - 70.0).abs() < 1e-9);
        assert_eq!(k.unique_products, 3);
        let expected_revenue = 50.0 * 30.0 * 0.8 + 50.0 * 50.0 * 0.95 + 40.0 * 30.0 * 0.9 + 60.0 * 60.0 + 10.0 * 60.0;
        assert!((k.total_revenue - expected_revenue).abs() < 1e-6);
    }

    #[test]
    fn kpis_reject_empty() {
        assert_eq!(kpis(&Dataset::default()).unwrap_err(), AggregationError::EmptyInput);
    }

    #[test]
    fn breakdown_orders() {
        let b = breakdowns(&small_dataset()).unwrap();
        assert_eq!(b.store_totals.rows[0].keys, vec!["S002"]);
        assert_eq!(b.monthly_trend.len(), 2);
        assert_eq!(b.monthly_trend.rows[0].keys, vec!["2022-01"]);
        assert_eq!(b.region_category.len(), 3);
        assert_eq!(b.category_means.rows[0].keys, vec!["Toys"]);
    }

    #[test]
    fn insights_rank_and_share() {
        let i = business_insights(&small_dataset()).unwrap();
        assert_eq!(i.top_categories.rows[0].keys, vec!["Groceries"]);
        assert!((i.avg_price - 46.0).abs() < 1e-9);
        assert!((i.discounted_share - 60.0).abs() < 1e-9);
        assert_eq!(i.best_season, "Spring");
        assert_eq!(i.slowest_season, "Spring");
    }

    #[test]
    fn seasons_ranked_by_mean_sales() {
        let mut records = small_dataset().records().to_vec();
        // Winter: 50 and 40 -> mean 45; Summer: 50; Spring: 60 and 10 -> mean 35
        for (record, season) in records
            .iter_mut()
            .zip(["Winter", "Summer", "Winter", "Spring", "Spring"])
        {
            record.seasonality = season.to_string();
        }
        let i = business_insights(&Dataset::new(records)).unwrap();
        assert_eq!(i.best_season, "Summer");
        assert_eq!(i.slowest_season, "Spring");
    }

    #[test]
    fn inventory_histogram_covers_every_row() {
        // inventory 10, 20, 30, 40, 50 over four bins of width 10
        let bins = inventory_distribution(&small_dataset(), 4);
        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 2]);
        assert_eq!(bins[0].lower, 10.0);
        assert_eq!(bins[3].upper, 50.0);

        assert_eq!(inventory_distribution(&small_dataset(), INVENTORY_BINS).len(), INVENTORY_BINS);
        assert!(inventory_distribution(&Dataset::default(), INVENTORY_BINS).is_empty());
    }
}
