use chrono::NaiveDate;
use clap::ValueEnum;

use crate::aggregate::{aggregate, AggregateTable, Dimension, Measure, Reduction, SortOrder};
use crate::error::{AggregationError, ValidationError};
use crate::insights::avg_daily_sales;
use crate::models::Dataset;

#[derive(Debug, Clone, PartialEq)]
pub struct SystemStats {
    pub total_records: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub span_days: i64,
    pub stores: usize,
    pub products: usize,
    pub categories: usize,
    pub regions: usize,
    pub weather_conditions: usize,
}

pub fn system_stats(dataset: &Dataset) -> Result<SystemStats, AggregationError> {
    let (first_date, last_date) = dataset.date_span().ok_or(AggregationError::EmptyInput)?;

    Ok(SystemStats {
        total_records: dataset.len(),
        first_date,
        last_date,
        span_days: (last_date - first_date).num_days(),
        stores: dataset.distinct(|r| r.store_id.as_str()).len(),
        products: dataset.distinct(|r| r.product_id.as_str()).len(),
        categories: dataset.distinct(|r| r.category.as_str()).len(),
        regions: dataset.distinct(|r| r.region.as_str()).len(),
        weather_conditions: dataset.distinct(|r| r.weather_condition.as_str()).len(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataQuality {
    pub total_records: usize,
    pub complete_records: usize,
    pub missing_values: usize,
}

impl DataQuality {
    pub fn completeness_pct(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        self.complete_records as f64 / self.total_records as f64 * 100.0
    }
}

pub fn data_quality(dataset: &Dataset) -> DataQuality {
    let missing: Vec<usize> = dataset.records().iter().map(|r| r.missing_values()).collect();

    DataQuality {
        total_records: dataset.len(),
        complete_records: missing.iter().filter(|m| **m == 0).count(),
        missing_values: missing.iter().sum(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Performance {
    pub total_sales: f64,
    pub total_revenue: f64,
    pub avg_daily_sales: f64,
    pub avg_inventory: f64,
    pub inventory_value: f64,
    pub turnover: f64,
}

pub fn performance(dataset: &Dataset) -> Result<Performance, AggregationError> {
    let totals = aggregate(
        dataset.records(),
        &[],
        &[
            Reduction::Sum(Measure::UnitsSold),
            Reduction::Sum(Measure::Revenue),
            Reduction::Mean(Measure::InventoryLevel),
            Reduction::Sum(Measure::InventoryValue),
        ],
    )?;
    let values = &totals.rows[0].values;
    let (total_sales, avg_inventory) = (values[0], values[2]);

    Ok(Performance {
        total_sales,
        total_revenue: values[1],
        avg_daily_sales: avg_daily_sales(dataset)?,
        avg_inventory,
        inventory_value: values[3],
        turnover: if avg_inventory > 0.0 {
            total_sales / avg_inventory
        } else {
            0.0
        },
    })
}

/// Record counts per category and per region, largest first.
pub fn record_distribution(
    dataset: &Dataset,
) -> Result<(AggregateTable, AggregateTable), AggregationError> {
    let count = Reduction::Count;
    let by_category = aggregate(dataset.records(), &[Dimension::Category], &[count])?
        .sort_by(&count.into(), SortOrder::Descending);
    let by_region = aggregate(dataset.records(), &[Dimension::Region], &[count])?
        .sort_by(&count.into(), SortOrder::Descending);
    Ok((by_category, by_region))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Administrator,
    Manager,
    Analyst,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Administrator, Role::Manager, Role::Analyst, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::Manager => "Manager",
            Role::Analyst => "Analyst",
            Role::Viewer => "Viewer",
        }
    }

    pub fn permissions(&self) -> Permissions {
        let (edit_products, admin_access, export_data) = match self {
            Role::Administrator => (true, true, true),
            Role::Manager => (true, false, true),
            Role::Analyst => (false, false, true),
            Role::Viewer => (false, false, false),
        };
        Permissions {
            view_pages: true,
            edit_products,
            admin_access,
            export_data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub view_pages: bool,
    pub edit_products: bool,
    pub admin_access: bool,
    pub export_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub password: String,
    pub confirm_password: String,
    pub active: bool,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::MismatchedPassword);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::small_dataset;

    fn user(password: &str, confirm: &str) -> NewUser {
        NewUser {
            username: "analyst2".to_string(),
            email: "analyst2@example.com".to_string(),
            role: Role::Analyst,
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            active: true,
        }
    }

    #[test]
    fn stats_span_and_counts() {
        let stats = system_stats(&small_dataset()).unwrap();
        assert_eq!(stats.total_records, 5);
        assert_eq!(stats.span_days, 31);
        assert_eq!(stats.stores, 3);
        assert_eq!(stats.categories, 2);
        assert_eq!(stats.weather_conditions, 1);
    }

    #[test]
    fn quality_counts_missing_cells() {
        let mut records = small_dataset().records().to_vec();
        records[0].price = f64::NAN;
        records[0].competitor_price = f64::NAN;
        let quality = data_quality(&Dataset::new(records));
        assert_eq!(quality.complete_records, 4);
        assert_eq!(quality.missing_values, 2);
        assert!((quality.completeness_pct() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn turnover_guards_zero_inventory() {
        let mut records = small_dataset().records().to_vec();
        for r in records.iter_mut() {
            r.inventory_level = 0;
        }
        let perf = performance(&Dataset::new(records)).unwrap();
        assert_eq!(perf.turnover, 0.0);
    }

    #[test]
    fn turnover_is_sales_over_mean_inventory() {
        let perf = performance(&small_dataset()).unwrap();
        assert!((perf.turnover - 7.0).abs() < 1e-9);
    }

    #[test]
    fn distribution_largest_first() {
        let (by_category, by_region) = record_distribution(&small_dataset()).unwrap();
        assert_eq!(by_category.rows[0].keys, vec!["Groceries"]);
        assert_eq!(by_region.len(), 3);
    }

    #[test]
    fn password_confirmation_must_match() {
        assert_eq!(user("secret", "secret").validate(), Ok(()));
        assert_eq!(
            user("secret", "Secret").validate(),
            Err(ValidationError::MismatchedPassword)
        );
        let mut blank = user("a", "a");
        blank.username = "  ".to_string();
        assert_eq!(blank.validate(), Err(ValidationError::EmptyUsername));
    }

    #[test]
    fn only_administrators_get_admin_access() {
        let admins: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|r| r.permissions().admin_access)
            .collect();
        assert_eq!(admins, vec![Role::Administrator]);
        assert!(!Role::Viewer.permissions().export_data);
    }
}
