//! Product catalog: filtered product table, per-category/store stats and a
//! single-product drill-down.

use std::cmp::Ordering;

use clap::ValueEnum;

use crate::aggregate::{aggregate, AggregateTable, Dimension, Measure, Reduction, SortOrder};
use crate::demand::{demand_levels, DemandLevel};
use crate::error::AggregationError;
use crate::models::{Dataset, Record, Selection};

const REGIONS_SHOWN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProductSort {
    #[default]
    TotalSold,
    TotalOrdered,
    AvgInventory,
    AvgPrice,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub selection: Selection,
    pub sort: ProductSort,
    pub order: SortOrder,
    pub product: Option<String>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            selection: Selection::default(),
            sort: ProductSort::TotalSold,
            order: SortOrder::Descending,
            product: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSummary {
    pub unique_products: usize,
    pub total_inventory: f64,
    pub avg_price: f64,
    pub total_sales: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub product_id: String,
    pub category: String,
    pub avg_inventory: f64,
    pub total_sold: f64,
    pub total_ordered: f64,
    pub avg_price: f64,
    pub avg_discount: f64,
    pub stores: usize,
    pub regions: Vec<String>,
    pub demand: DemandLevel,
}

impl ProductRow {
    fn sort_value(&self, sort: ProductSort) -> f64 {
        match sort {
            ProductSort::TotalSold => self.total_sold,
            ProductSort::TotalOrdered => self.total_ordered,
            ProductSort::AvgInventory => self.avg_inventory,
            ProductSort::AvgPrice => self.avg_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetail {
    pub product_id: String,
    pub category: String,
    pub avg_price: f64,
    pub avg_discount: f64,
    pub stores: usize,
    pub regions: Vec<String>,
    pub total_sold: f64,
    pub total_ordered: f64,
    pub avg_inventory: f64,
    pub revenue: f64,
    pub timeline: AggregateTable,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub summary: CatalogSummary,
    pub products: Vec<ProductRow>,
    pub category_stats: AggregateTable,
    pub store_stats: AggregateTable,
    pub price_analysis: AggregateTable,
    pub detail: Option<ProductDetail>,
}

/// Distinct values in first-seen order.
fn first_seen<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

pub fn summary(dataset: &Dataset) -> Result<CatalogSummary, AggregationError> {
    let totals = aggregate(
        dataset.records(),
        &[],
        &[
            Reduction::NUnique(Dimension::ProductId),
            Reduction::Sum(Measure::InventoryLevel),
            Reduction::Mean(Measure::Price),
            Reduction::Sum(Measure::UnitsSold),
        ],
    )?;
    let values = &totals.rows[0].values;

    Ok(CatalogSummary {
        unique_products: values[0] as usize,
        total_inventory: values[1],
        avg_price: values[2],
        total_sales: values[3],
    })
}

pub fn product_rows(
    dataset: &Dataset,
    sort: ProductSort,
    order: SortOrder,
) -> Result<Vec<ProductRow>, AggregationError> {
    let table = aggregate(
        dataset.records(),
        &[Dimension::ProductId, Dimension::Category],
        &[
            Reduction::Mean(Measure::InventoryLevel),
            Reduction::Sum(Measure::UnitsSold),
            Reduction::Sum(Measure::UnitsOrdered),
            Reduction::Mean(Measure::Price),
            Reduction::Mean(Measure::Discount),
            Reduction::NUnique(Dimension::StoreId),
        ],
    )?;

    let ordered: Vec<f64> = table.rows.iter().map(|row| row.values[2]).collect();
    let levels = demand_levels(&ordered);

    let mut rows: Vec<ProductRow> = table
        .rows
        .into_iter()
        .zip(levels)
        .map(|(row, demand)| {
            let (product_id, category) = (row.keys[0].clone(), row.keys[1].clone());
            let mut regions = first_seen(
                dataset
                    .records()
                    .iter()
                    .filter(|r| r.product_id == product_id && r.category == category)
                    .map(|r| r.region.as_str()),
            );
            regions.truncate(REGIONS_SHOWN);

            ProductRow {
                product_id,
                category,
                avg_inventory: row.values[0],
                total_sold: row.values[1],
                total_ordered: row.values[2],
                avg_price: row.values[3],
                avg_discount: row.values[4],
                stores: row.values[5] as usize,
                regions,
                demand,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        let ordering = a
            .sort_value(sort)
            .partial_cmp(&b.sort_value(sort))
            .unwrap_or(Ordering::Equal);
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
    Ok(rows)
}

/// `None` when the product does not appear in the dataset.
pub fn product_detail(dataset: &Dataset, product_id: &str) -> Option<ProductDetail> {
    let records: Vec<Record> = dataset
        .records()
        .iter()
        .filter(|r| r.product_id == product_id)
        .cloned()
        .collect();
    let first = records.first()?;

    let totals = aggregate(
        &records,
        &[],
        &[
            Reduction::Mean(Measure::Price),
            Reduction::Mean(Measure::Discount),
            Reduction::NUnique(Dimension::StoreId),
            Reduction::Sum(Measure::UnitsSold),
            Reduction::Sum(Measure::UnitsOrdered),
            Reduction::Mean(Measure::InventoryLevel),
            Reduction::Sum(Measure::Revenue),
        ],
    )
    .ok()?;
    let timeline = aggregate(
        &records,
        &[Dimension::Date],
        &[
            Reduction::Sum(Measure::UnitsSold),
            Reduction::Mean(Measure::InventoryLevel),
            Reduction::Mean(Measure::Price),
        ],
    )
    .ok()?;
    let values = &totals.rows[0].values;

    Some(ProductDetail {
        product_id: product_id.to_string(),
        category: first.category.clone(),
        avg_price: values[0],
        avg_discount: values[1],
        stores: values[2] as usize,
        regions: first_seen(records.iter().map(|r| r.region.as_str())),
        total_sold: values[3],
        total_ordered: values[4],
        avg_inventory: values[5],
        revenue: values[6],
        timeline,
        records,
    })
}

/// Builds the catalog for the filtered view. `None` when the filter matches nothing.
pub fn catalog(dataset: &Dataset, query: &ProductQuery) -> Result<Option<Catalog>, AggregationError> {
    let filtered = dataset.filter(&query.selection);
    if filtered.is_empty() {
        return Ok(None);
    }

    let category_stats = aggregate(
        filtered.records(),
        &[Dimension::Category],
        &[
            Reduction::Sum(Measure::UnitsSold),
            Reduction::Mean(Measure::InventoryLevel),
            Reduction::Mean(Measure::Price),
        ],
    )?;
    let store_stats = aggregate(
        filtered.records(),
        &[Dimension::StoreId],
        &[
            Reduction::Sum(Measure::UnitsSold),
            Reduction::Mean(Measure::Price),
            Reduction::Mean(Measure::InventoryLevel),
        ],
    )?;
    let price_analysis = aggregate(
        filtered.records(),
        &[Dimension::Category],
        &[
            Reduction::Mean(Measure::Price),
            Reduction::Min(Measure::Price),
            Reduction::Max(Measure::Price),
            Reduction::Mean(Measure::Discount),
            Reduction::Sum(Measure::UnitsSold),
        ],
    )?;

    Ok(Some(Catalog {
        summary: summary(&filtered)?,
        products: product_rows(&filtered, query.sort, query.order)?,
        category_stats,
        store_stats,
        price_analysis,
        detail: query
            .product
            .as_deref()
            .and_then(|id| product_detail(&filtered, id)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::small_dataset;

    #[test]
    fn summary_counts_products() {
        let s = summary(&small_dataset()).unwrap();
        assert_eq!(s.unique_products, 3);
        assert_eq!(s.total_inventory, 150.0);
        assert_eq!(s.total_sales, 210.0);
    }

    #[test]
    fn rows_sorted_by_requested_column() {
        let data = small_dataset();
        let rows = product_rows(&data, ProductSort::TotalSold, SortOrder::Descending).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, vec!["P0001", "P0003", "P0002"]);

        let rows = product_rows(&data, ProductSort::AvgPrice, SortOrder::Ascending).unwrap();
        assert_eq!(rows[0].product_id, "P0001");
    }

    #[test]
    fn rows_carry_regions_and_demand() {
        let rows = product_rows(&small_dataset(), ProductSort::TotalOrdered, SortOrder::Descending)
            .unwrap();
        let top = &rows[0];
        assert_eq!(top.product_id, "P0003");
        assert_eq!(top.stores, 2);
        assert_eq!(top.regions, vec!["East"]);
        assert_eq!(top.demand, DemandLevel::High);
        assert_eq!(rows[2].demand, DemandLevel::Low);
    }

    #[test]
    fn detail_for_known_product() {
        let detail = product_detail(&small_dataset(), "P0001").unwrap();
        assert_eq!(detail.category, "Toys");
        assert_eq!(detail.records.len(), 2);
        assert_eq!(detail.timeline.len(), 2);
        assert_eq!(detail.total_sold, 90.0);
        assert!((detail.revenue - (50.0 * 30.0 * 0.8 + 40.0 * 30.0 * 0.9)).abs() < 1e-9);
        assert!(product_detail(&small_dataset(), "P9999").is_none());
    }

    #[test]
    fn empty_filter_result_has_no_catalog() {
        let query = ProductQuery {
            selection: Selection {
                categories: vec!["Furniture".to_string()],
                ..Selection::default()
            },
            ..ProductQuery::default()
        };
        assert!(catalog(&small_dataset(), &query).unwrap().is_none());
    }

    #[test]
    fn catalog_respects_filter_and_detail() {
        let query = ProductQuery {
            selection: Selection {
                stores: vec!["S002".to_string()],
                ..Selection::default()
            },
            product: Some("P0003".to_string()),
            ..ProductQuery::default()
        };
        let catalog = catalog(&small_dataset(), &query).unwrap().unwrap();
        assert_eq!(catalog.summary.unique_products, 2);
        assert_eq!(catalog.store_stats.len(), 1);
        let detail = catalog.detail.unwrap();
        assert_eq!(detail.records.len(), 1);
    }
}
