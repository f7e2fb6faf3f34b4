use std::fmt::Write;

use crate::aggregate::AggregateTable;
use crate::alerts::AlertRule;
use crate::catalog::{Catalog, ProductDetail};
use crate::demand::{DemandInputs, DemandPrediction};
use crate::models::Record;
use crate::views::{AdminView, AlertsView, DashboardView, ProductsView, ViewModel};

/// Rows shown for long tables such as the daily trend or the product list.
const TABLE_ROWS: usize = 25;

pub fn render_markdown(view: &ViewModel) -> String {
    match view {
        ViewModel::Dashboard(dashboard) => render_dashboard(dashboard),
        ViewModel::Alerts(alerts) => render_alerts(alerts),
        ViewModel::Products(products) => render_products(products),
        ViewModel::Admin(admin) => render_admin(admin),
    }
}

pub fn render_no_data(reason: &str) -> String {
    format!("# No data available\n\n{}\n", reason)
}

/// 1234567.8 -> "1,234,568"
pub fn with_commas(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::new();
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < -0.5 {
        grouped.insert(0, '-');
    }
    grouped
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn write_table(output: &mut String, table: &AggregateTable, limit: usize) {
    if table.is_empty() {
        let _ = writeln!(output, "_No rows._");
        return;
    }

    let headers = table.headers();
    let _ = writeln!(output, "| {} |", headers.join(" | "));
    let _ = writeln!(output, "|{}", " --- |".repeat(headers.len()));
    for row in table.rows.iter().take(limit) {
        let cells: Vec<String> = row
            .keys
            .iter()
            .cloned()
            .chain(table.columns.iter().map(|c| format_cell(table.get(row, c))))
            .collect();
        let _ = writeln!(output, "| {} |", cells.join(" | "));
    }
    if table.len() > limit {
        let _ = writeln!(output, "_{} more rows not shown._", table.len() - limit);
    }
}

fn write_records(output: &mut String, records: &[Record]) {
    let _ = writeln!(
        output,
        "| Date | Store | Product | Category | Region | Inventory | Sold | Ordered | Price | Discount | Weather | Season |"
    );
    let _ = writeln!(output, "|{}", " --- |".repeat(12));
    for r in records {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {} | {:.2} | {:.0}% | {} | {} |",
            r.date,
            r.store_id,
            r.product_id,
            r.category,
            r.region,
            r.inventory_level,
            r.units_sold,
            r.units_ordered,
            r.price,
            r.discount_percent,
            r.weather_condition,
            r.seasonality
        );
    }
}

fn render_dashboard(view: &DashboardView) -> String {
    let mut output = String::new();
    let kpis = &view.kpis;

    let _ = writeln!(output, "# Dashboard Overview");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Business Metrics");
    let _ = writeln!(output, "- Total Units Sold: {}", with_commas(kpis.total_units_sold));
    let _ = writeln!(output, "- Average Daily Sales: {}", with_commas(kpis.avg_daily_sales));
    let _ = writeln!(output, "- Total Revenue: ${}", with_commas(kpis.total_revenue));
    let _ = writeln!(output, "- Total Products: {}", kpis.unique_products);

    let b = &view.breakdowns;
    let sections: [(&str, &AggregateTable); 8] = [
        ("Sales Distribution by Category", &b.category_totals),
        ("Average Sales per Category", &b.category_means),
        ("Sales Performance by Region", &b.region_totals),
        ("Store Performance Comparison", &b.store_totals),
        ("Sales by Region and Category", &b.region_category),
        ("Monthly Sales Trend", &b.monthly_trend),
        ("Daily Sales Trend", &b.daily_trend),
        ("Seasonal Sales Patterns", &b.seasonal_totals),
    ];
    for (title, table) in sections {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", title);
        write_table(&mut output, table, TABLE_ROWS);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Demand Level Distribution");
    for (level, count) in &view.demand_distribution {
        let _ = writeln!(output, "- {}: {}", level.as_str(), count);
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "| Category | Low | Medium | High |");
    let _ = writeln!(output, "| --- | --- | --- | --- |");
    for (category, [low, medium, high]) in &view.demand_by_category {
        let _ = writeln!(output, "| {} | {} | {} | {} |", category, low, medium, high);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Inventory Level Distribution");
    let _ = writeln!(output, "| Inventory Level | Records |");
    let _ = writeln!(output, "| --- | --- |");
    for bin in view.inventory_distribution.iter().filter(|b| b.count > 0) {
        let _ = writeln!(output, "| {:.0} - {:.0} | {} |", bin.lower, bin.upper, bin.count);
    }

    let insights = &view.insights;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Business Insights");
    let _ = writeln!(output, "### Top Performing Categories");
    for (i, row) in insights.top_categories.rows.iter().enumerate() {
        let _ = writeln!(output, "{}. {}: {} units", i + 1, row.keys[0], with_commas(row.values[0]));
    }
    let _ = writeln!(output, "### Best Performing Regions");
    for row in &insights.regions_ranked.rows {
        let _ = writeln!(output, "- {}: {} units", row.keys[0], with_commas(row.values[0]));
    }
    let _ = writeln!(output, "### Pricing Insights");
    let _ = writeln!(output, "- Average Price: ${:.2}", insights.avg_price);
    let _ = writeln!(output, "- Average Discount: {:.1}%", insights.avg_discount);
    let _ = writeln!(output, "- Products with Discount: {:.1}%", insights.discounted_share);
    let _ = writeln!(output, "### Seasonal Insights");
    let _ = writeln!(output, "- Best Season: {}", insights.best_season);
    let _ = writeln!(output, "- Slowest Season: {}", insights.slowest_season);

    output
}

fn render_alerts(view: &AlertsView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Alerts & Notifications");
    for alert in &view.alerts {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", alert.rule.title());
        if alert.matched == 0 {
            let quiet = match alert.rule {
                AlertRule::LowStock => "All products have adequate stock levels.",
                AlertRule::HighDemand => "No unusually high demand detected.",
                AlertRule::StoreUnderperformance => "All stores are performing well.",
                _ => "Nothing flagged.",
            };
            let _ = writeln!(output, "{}", quiet);
            continue;
        }
        let _ = writeln!(output, "**{}**", alert.message());
        let _ = writeln!(output);
        write_table(&mut output, &alert.summary, TABLE_ROWS);
    }

    let counts = &view.counts;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Alert Summary");
    let _ = writeln!(output, "- Low Stock Items: {}", counts.low_stock);
    let _ = writeln!(output, "- High Demand Items: {}", counts.high_demand);
    let _ = writeln!(output, "- Pricing Alerts: {}", counts.pricing);
    let _ = writeln!(output, "- Store Alerts: {}", counts.stores);

    if let Some(preview) = &view.preview {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Filtered Records");
        let _ = writeln!(output, "Showing alerts for {} filtered records.", preview.matched);
        let _ = writeln!(output);
        write_records(&mut output, &preview.records);
    }

    output
}

fn write_detail(output: &mut String, detail: &ProductDetail) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Product {}", detail.product_id);
    let _ = writeln!(output, "- Category: {}", detail.category);
    let _ = writeln!(output, "- Average Price: ${:.2}", detail.avg_price);
    let _ = writeln!(output, "- Average Discount: {:.1}%", detail.avg_discount);
    let _ = writeln!(output, "- Available in: {} stores", detail.stores);
    let _ = writeln!(output, "- Regions: {}", detail.regions.join(", "));
    let _ = writeln!(output, "- Total Units Sold: {}", with_commas(detail.total_sold));
    let _ = writeln!(output, "- Total Units Ordered: {}", with_commas(detail.total_ordered));
    let _ = writeln!(output, "- Average Inventory: {:.0}", detail.avg_inventory);
    let _ = writeln!(output, "- Total Revenue: ${:.2}", detail.revenue);
    let _ = writeln!(output);
    let _ = writeln!(output, "### Sales Timeline");
    write_table(output, &detail.timeline, TABLE_ROWS);
    let _ = writeln!(output);
    let _ = writeln!(output, "### All Records");
    write_records(output, &detail.records);
}

fn write_catalog(output: &mut String, catalog: &Catalog) {
    let summary = &catalog.summary;
    let _ = writeln!(output, "## Product Summary");
    let _ = writeln!(output, "- Total Products: {}", summary.unique_products);
    let _ = writeln!(output, "- Total Inventory: {}", with_commas(summary.total_inventory));
    let _ = writeln!(output, "- Average Price: ${:.2}", summary.avg_price);
    let _ = writeln!(output, "- Total Sales: {}", with_commas(summary.total_sales));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Product Details");
    let _ = writeln!(
        output,
        "| Product | Category | Avg Inventory | Total Sold | Total Ordered | Avg Price | Avg Discount | Stores | Regions | Demand |"
    );
    let _ = writeln!(output, "|{}", " --- |".repeat(10));
    for p in catalog.products.iter().take(TABLE_ROWS) {
        let _ = writeln!(
            output,
            "| {} | {} | {:.0} | {} | {} | ${:.2} | {:.1}% | {} | {} | {} |",
            p.product_id,
            p.category,
            p.avg_inventory,
            with_commas(p.total_sold),
            with_commas(p.total_ordered),
            p.avg_price,
            p.avg_discount,
            p.stores,
            p.regions.join(", "),
            p.demand.as_str()
        );
    }
    if catalog.products.len() > TABLE_ROWS {
        let _ = writeln!(output, "_{} more products not shown._", catalog.products.len() - TABLE_ROWS);
    }

    let sections: [(&str, &AggregateTable); 3] = [
        ("Performance by Category", &catalog.category_stats),
        ("Performance by Store", &catalog.store_stats),
        ("Price Analysis", &catalog.price_analysis),
    ];
    for (title, table) in sections {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", title);
        write_table(output, table, TABLE_ROWS);
    }

    if let Some(detail) = &catalog.detail {
        write_detail(output, detail);
    }
}

fn render_products(view: &ProductsView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Products List");
    let _ = writeln!(output, "Matching records: {}", view.matched_records);
    let _ = writeln!(output);
    match &view.catalog {
        Some(catalog) => write_catalog(&mut output, catalog),
        None => {
            let _ = writeln!(output, "No products match the selected filters.");
        }
    }

    output
}

fn render_admin(view: &AdminView) -> String {
    let mut output = String::new();
    let date_pattern = view.settings.date_format.pattern();
    let currency = &view.settings.currency_symbol;

    let stats = &view.stats;
    let _ = writeln!(output, "# Admin Panel");
    let _ = writeln!(output);
    let _ = writeln!(output, "## System Statistics");
    let _ = writeln!(output, "- Total Records: {}", with_commas(stats.total_records as f64));
    let _ = writeln!(output, "- Date Range: {} days", stats.span_days);
    let _ = writeln!(output, "- Start Date: {}", stats.first_date.format(date_pattern));
    let _ = writeln!(output, "- End Date: {}", stats.last_date.format(date_pattern));
    let _ = writeln!(output, "- Stores: {}", stats.stores);
    let _ = writeln!(output, "- Products: {}", stats.products);
    let _ = writeln!(output, "- Categories: {}", stats.categories);
    let _ = writeln!(output, "- Regions: {}", stats.regions);
    let _ = writeln!(output, "- Weather Conditions: {}", stats.weather_conditions);

    let quality = &view.quality;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Quality");
    let _ = writeln!(output, "- Complete Records: {}", with_commas(quality.complete_records as f64));
    let _ = writeln!(output, "- Missing Values: {}", quality.missing_values);
    let _ = writeln!(output, "- Data Completeness: {:.1}%", quality.completeness_pct());

    let perf = &view.performance;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance");
    let _ = writeln!(output, "- Total Sales: {} units", with_commas(perf.total_sales));
    let _ = writeln!(output, "- Total Revenue: {}{:.2}", currency, perf.total_revenue);
    let _ = writeln!(output, "- Average Daily Sales: {} units", with_commas(perf.avg_daily_sales));
    let _ = writeln!(output, "- Average Inventory: {} units", with_commas(perf.avg_inventory));
    let _ = writeln!(output, "- Total Inventory Value: {}{:.2}", currency, perf.inventory_value);
    let _ = writeln!(output, "- Inventory Turnover: {:.2}x", perf.turnover);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Records by Category");
    write_table(&mut output, &view.by_category, TABLE_ROWS);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Records by Region");
    write_table(&mut output, &view.by_region, TABLE_ROWS);

    let settings = &view.settings;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Settings");
    let _ = writeln!(output, "- Items per Page: {}", settings.items_per_page);
    let _ = writeln!(output, "- Low Stock Threshold: {}", settings.low_stock_threshold);
    let _ = writeln!(output, "- High Demand Threshold: {}", settings.high_demand_threshold);
    let _ = writeln!(output, "- Email Alerts: {}", settings.email_alerts);
    let _ = writeln!(output, "- SMS Alerts: {}", settings.sms_alerts);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Role Permissions");
    let _ = writeln!(output, "| Role | View Pages | Edit Products | Admin Access | Export Data |");
    let _ = writeln!(output, "| --- | --- | --- | --- | --- |");
    for role in crate::admin::Role::ALL {
        let p = role.permissions();
        let mark = |allowed: bool| if allowed { "yes" } else { "no" };
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} |",
            role.as_str(),
            mark(p.view_pages),
            mark(p.edit_products),
            mark(p.admin_access),
            mark(p.export_data)
        );
    }

    output
}

pub fn render_prediction(inputs: &DemandInputs, prediction: &DemandPrediction) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Demand Prediction");
    let _ = writeln!(
        output,
        "{} at ${:.2}, {:.0}% discount, {} units in stock{}",
        inputs.category,
        inputs.price,
        inputs.discount_percent,
        inputs.inventory_level,
        if inputs.is_holiday { ", holiday period" } else { "" }
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Predicted demand: **{}** (score {})",
        prediction.level, prediction.score
    );
    if !prediction.reasons.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Key Factors");
        for reason in &prediction.reasons {
            let _ = writeln!(output, "- {}", reason);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdminSettings;
    use crate::demand::predict;
    use crate::models::fixtures::small_dataset;
    use crate::models::Selection;
    use crate::views::{render, Page};

    #[test]
    fn commas_group_thousands() {
        assert_eq!(with_commas(0.0), "0");
        assert_eq!(with_commas(999.0), "999");
        assert_eq!(with_commas(1234567.8), "1,234,568");
        assert_eq!(with_commas(-1500.0), "-1,500");
        assert_eq!(with_commas(f64::NAN), "n/a");
    }

    #[test]
    fn alerts_report_lists_sections() {
        let view = render(&Page::Alerts(Selection::default()), &small_dataset()).unwrap();
        let report = render_markdown(&view);
        assert!(report.contains("# Alerts & Notifications"));
        assert!(report.contains("## Low Stock"));
        assert!(report.contains("| Product ID | Category | Store ID | Avg Inventory Level"));
        assert!(report.contains("- Pricing Alerts: 1"));
        assert!(!report.contains("## Filtered Records"));
    }

    #[test]
    fn dashboard_report_has_metrics() {
        let view = render(&Page::Dashboard, &small_dataset()).unwrap();
        let report = render_markdown(&view);
        assert!(report.contains("- Total Units Sold: 210"));
        assert!(report.contains("## Monthly Sales Trend"));
        assert!(report.contains("| Toys | 1 | 1 | 0 |"));
        assert!(report.contains("- Best Season: Spring"));
        assert!(report.contains("## Inventory Level Distribution"));
        assert!(report.contains("| 49 - 50 | 1 |"));
    }

    #[test]
    fn admin_report_uses_date_format() {
        let mut settings = AdminSettings::default();
        settings.date_format = crate::config::DateFormat::UsSlash;
        let view = render(&Page::Admin(settings), &small_dataset()).unwrap();
        let report = render_markdown(&view);
        assert!(report.contains("- Start Date: 01/01/2022"));
        assert!(report.contains("- Inventory Turnover: 7.00x"));
    }

    #[test]
    fn prediction_report_lists_reasons() {
        let inputs = DemandInputs {
            category: "Electronics".to_string(),
            price: 35.0,
            discount_percent: 20.0,
            inventory_level: 100,
            is_holiday: true,
        };
        let report = render_prediction(&inputs, &predict(&inputs));
        assert!(report.contains("Predicted demand: **HIGH** (score 7)"));
        assert_eq!(report.matches("\n- ").count(), 5);
    }
}
