//! Maps each page to a pure `Dataset -> ViewModel` transform.

use crate::admin::{self, DataQuality, Performance, SystemStats};
use crate::aggregate::AggregateTable;
use crate::alerts::{self, Alert, AlertCounts, FilterPreview};
use crate::catalog::{self, Catalog, ProductQuery};
use crate::config::AdminSettings;
use crate::demand::{self, DemandLevel};
use crate::error::AggregationError;
use crate::insights::{self, Breakdowns, BusinessInsights, HistogramBin, Kpis, INVENTORY_BINS};
use crate::models::{Dataset, Selection};

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Dashboard,
    Alerts(Selection),
    Products(ProductQuery),
    Admin(AdminSettings),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub kpis: Kpis,
    pub breakdowns: Breakdowns,
    pub demand_distribution: Vec<(DemandLevel, usize)>,
    pub demand_by_category: Vec<(String, [usize; 3])>,
    pub inventory_distribution: Vec<HistogramBin>,
    pub insights: BusinessInsights,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertsView {
    pub alerts: Vec<Alert>,
    pub counts: AlertCounts,
    pub preview: Option<FilterPreview>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductsView {
    pub matched_records: usize,
    pub catalog: Option<Catalog>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminView {
    pub stats: SystemStats,
    pub quality: DataQuality,
    pub performance: Performance,
    pub by_category: AggregateTable,
    pub by_region: AggregateTable,
    pub settings: AdminSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewModel {
    Dashboard(Box<DashboardView>),
    Alerts(AlertsView),
    Products(ProductsView),
    Admin(Box<AdminView>),
}

/// Callers must not route an empty dataset here; a failed load means no view at all.
pub fn render(page: &Page, dataset: &Dataset) -> Result<ViewModel, AggregationError> {
    if dataset.is_empty() {
        return Err(AggregationError::EmptyInput);
    }

    let view = match page {
        Page::Dashboard => ViewModel::Dashboard(Box::new(DashboardView {
            kpis: insights::kpis(dataset)?,
            breakdowns: insights::breakdowns(dataset)?,
            demand_distribution: demand::distribution(dataset),
            demand_by_category: demand::by_category(dataset),
            inventory_distribution: insights::inventory_distribution(dataset, INVENTORY_BINS),
            insights: insights::business_insights(dataset)?,
        })),
        Page::Alerts(selection) => {
            let alerts = alerts::evaluate_all(dataset)?;
            ViewModel::Alerts(AlertsView {
                counts: AlertCounts::from_alerts(&alerts),
                alerts,
                preview: alerts::preview(dataset, selection),
            })
        }
        Page::Products(query) => ViewModel::Products(ProductsView {
            matched_records: dataset.filter(&query.selection).len(),
            catalog: catalog::catalog(dataset, query)?,
        }),
        Page::Admin(settings) => {
            let (by_category, by_region) = admin::record_distribution(dataset)?;
            ViewModel::Admin(Box::new(AdminView {
                stats: admin::system_stats(dataset)?,
                quality: admin::data_quality(dataset),
                performance: admin::performance(dataset)?,
                by_category,
                by_region,
                settings: settings.clone(),
            }))
        }
    };
    Ok(view)
}
