use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Header columns every inventory file must carry, in file order.
pub const COLUMNS: [&str; 13] = [
    "Date",
    "Store ID",
    "Product ID",
    "Category",
    "Region",
    "Inventory Level",
    "Units Sold",
    "Units Ordered",
    "Price",
    "Discount",
    "Weather Condition",
    "Seasonality",
    "Competitor Pricing",
];

fn deserialize_naive_date<'de, D>(d: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    let trimmed = s.trim();
    // Timestamps keep only their date part; a cut inside a multi-byte char parses the whole cell.
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| serde::de::Error::custom(format!("invalid date '{}': {}", s, e)))
}

/// Blank cells load as NaN so they surface in the data-quality counts.
fn deserialize_real<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(f64::NAN);
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| serde::de::Error::custom(format!("expected number, got '{}'", trimmed)))
}

/// One daily per-store, per-product row of the inventory file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Date", deserialize_with = "deserialize_naive_date")]
    pub date: NaiveDate,
    #[serde(rename = "Store ID")]
    pub store_id: String,
    #[serde(rename = "Product ID")]
    pub product_id: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Inventory Level")]
    pub inventory_level: u32,
    #[serde(rename = "Units Sold")]
    pub units_sold: u32,
    #[serde(rename = "Units Ordered")]
    pub units_ordered: u32,
    #[serde(rename = "Price", deserialize_with = "deserialize_real")]
    pub price: f64,
    #[serde(rename = "Discount", deserialize_with = "deserialize_real")]
    pub discount_percent: f64,
    #[serde(rename = "Weather Condition")]
    pub weather_condition: String,
    #[serde(rename = "Seasonality")]
    pub seasonality: String,
    #[serde(rename = "Competitor Pricing", deserialize_with = "deserialize_real")]
    pub competitor_price: f64,
}

impl Record {
    /// Revenue after discount.
    pub fn revenue(&self) -> f64 {
        self.units_sold as f64 * self.price * (1.0 - self.discount_percent / 100.0)
    }

    pub fn inventory_value(&self) -> f64 {
        self.inventory_level as f64 * self.price
    }

    pub fn month(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }

    pub fn missing_values(&self) -> usize {
        [self.price, self.discount_percent, self.competitor_price]
            .iter()
            .filter(|v| v.is_nan())
            .count()
    }
}

/// Category/region/store multi-select. An empty list means "no filter" for that field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub categories: Vec<String>,
    pub regions: Vec<String>,
    pub stores: Vec<String>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.regions.is_empty() && self.stores.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        fn allows(selected: &[String], value: &str) -> bool {
            selected.is_empty() || selected.iter().any(|s| s == value)
        }

        allows(&self.categories, &record.category)
            && allows(&self.regions, &record.region)
            && allows(&self.stores, &record.store_id)
    }
}

/// The loaded snapshot. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn filter(&self, selection: &Selection) -> Dataset {
        if selection.is_empty() {
            return self.clone();
        }
        Dataset::new(
            self.records
                .iter()
                .filter(|r| selection.matches(r))
                .cloned()
                .collect(),
        )
    }

    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.date).min()?;
        let last = self.records.iter().map(|r| r.date).max()?;
        Some((first, last))
    }

    /// Distinct values of a text field, sorted.
    pub fn distinct<F>(&self, field: F) -> Vec<String>
    where
        F: Fn(&Record) -> &str,
    {
        let set: std::collections::BTreeSet<&str> = self.records.iter().map(field).collect();
        set.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    #[allow(clippy::too_many_arguments)]
    pub fn record(
        date: &str,
        store: &str,
        product: &str,
        category: &str,
        region: &str,
        inventory: u32,
        sold: u32,
        ordered: u32,
        price: f64,
        discount: f64,
        competitor: f64,
    ) -> Record {
        Record {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            store_id: store.to_string(),
            product_id: product.to_string(),
            category: category.to_string(),
            region: region.to_string(),
            inventory_level: inventory,
            units_sold: sold,
            units_ordered: ordered,
            price,
            discount_percent: discount,
            weather_condition: "Sunny".to_string(),
            seasonality: "Spring".to_string(),
            competitor_price: competitor,
        }
    }

    /// Five rows across three stores and two categories.
    pub fn small_dataset() -> Dataset {
        Dataset::new(vec![
            record("2022-01-01", "S001", "P0001", "Toys", "North", 10, 50, 60, 30.0, 20.0, 20.0),
            record("2022-01-01", "S002", "P0002", "Groceries", "South", 20, 50, 70, 50.0, 5.0, 48.0),
            record("2022-01-02", "S001", "P0001", "Toys", "North", 30, 40, 80, 30.0, 10.0, 29.0),
            record("2022-01-02", "S002", "P0003", "Groceries", "East", 40, 60, 90, 60.0, 0.0, 61.0),
            record("2022-02-01", "S003", "P0003", "Groceries", "East", 50, 10, 200, 60.0, 0.0, 59.0),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn revenue_applies_discount() {
        let r = record("2022-01-01", "S1", "P1", "Toys", "North", 1, 10, 0, 20.0, 25.0, 0.0);
        assert!((r.revenue() - 150.0).abs() < 1e-9);
        assert_eq!(r.month(), "2022-01");
    }

    #[test]
    fn empty_selection_keeps_every_row() {
        let data = small_dataset();
        assert_eq!(data.filter(&Selection::default()).len(), data.len());
    }

    #[test]
    fn selection_combines_fields() {
        let data = small_dataset();
        let selection = Selection {
            categories: vec!["Groceries".to_string()],
            regions: vec!["East".to_string()],
            stores: vec![],
        };
        let filtered = data.filter(&selection);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.records().iter().all(|r| r.region == "East"));
    }

    #[test]
    fn distinct_is_sorted() {
        let data = small_dataset();
        assert_eq!(data.distinct(|r| r.store_id.as_str()), vec!["S001", "S002", "S003"]);
    }

    #[test]
    fn missing_reals_are_counted() {
        let mut r = record("2022-01-01", "S1", "P1", "Toys", "North", 1, 1, 1, 1.0, 0.0, 1.0);
        assert_eq!(r.missing_values(), 0);
        r.price = f64::NAN;
        assert_eq!(r.missing_values(), 1);
    }
}
