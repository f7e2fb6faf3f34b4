use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

mod admin;
mod aggregate;
mod alerts;
mod catalog;
mod config;
mod demand;
mod error;
mod export;
mod insights;
mod loader;
mod models;
mod report;
mod views;

use aggregate::SortOrder;
use catalog::{ProductQuery, ProductSort};
use config::{AdminSettings, DateFormat, LoaderConfig};
use error::AggregationError;
use export::ExportFormat;
use loader::DatasetCache;
use models::Selection;
use views::Page;

#[derive(Parser)]
#[command(name = "retail-pulse")]
#[command(about = "Retail inventory analytics: KPIs, alerts and demand signals", long_about = None)]
struct Cli {
    /// Inventory CSV; overrides the default lookup locations
    #[arg(long, global = true, env = "RETAIL_DATA_PATH")]
    data: Option<PathBuf>,
    /// Write the report here instead of stdout
    #[arg(long, global = true)]
    out: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Default)]
struct FilterArgs {
    #[arg(long = "category")]
    categories: Vec<String>,
    #[arg(long = "region")]
    regions: Vec<String>,
    #[arg(long = "store")]
    stores: Vec<String>,
}

impl From<FilterArgs> for Selection {
    fn from(args: FilterArgs) -> Self {
        Selection {
            categories: args.categories,
            regions: args.regions,
            stores: args.stores,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportScope {
    Records,
    CategorySales,
    RegionSales,
    StoreSales,
    MonthlyTrend,
}

#[derive(Subcommand)]
enum Commands {
    /// KPIs, breakdowns, demand distribution and business insights
    Dashboard,
    /// Evaluate every alert rule; category/region filters preview matching records
    Alerts {
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long = "region")]
        regions: Vec<String>,
    },
    /// Filtered product catalog with optional drill-down
    Products {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_enum, default_value_t = ProductSort::TotalSold)]
        sort: ProductSort,
        #[arg(long)]
        ascending: bool,
        /// Product ID to show in detail
        #[arg(long)]
        product: Option<String>,
    },
    /// System statistics, data quality and performance
    Admin {
        /// Drop the cached dataset and reload from disk
        #[arg(long)]
        refresh: bool,
        #[arg(long, default_value_t = 20)]
        items_per_page: u32,
        #[arg(long, value_enum, default_value_t = DateFormat::Iso)]
        date_format: DateFormat,
        #[arg(long, default_value = "$")]
        currency: String,
    },
    /// Score demand for a hypothetical product
    Predict {
        #[arg(long, default_value = "Electronics")]
        category: String,
        #[arg(long, default_value_t = 50.0)]
        price: f64,
        #[arg(long, default_value_t = 10.0)]
        discount: f64,
        #[arg(long, default_value_t = 100)]
        inventory: u32,
        #[arg(long)]
        holiday: bool,
    },
    /// Export records or a breakdown table
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        #[arg(long, value_enum, default_value_t = ExportScope::Records)]
        scope: ExportScope,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Validate a new admin user
    AddUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, value_enum, default_value_t = admin::Role::Viewer)]
        role: admin::Role,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
}

fn emit(out: Option<&PathBuf>, text: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Report written to {}.", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn run_export(
    cache: &mut DatasetCache,
    format: ExportFormat,
    scope: ExportScope,
    selection: Selection,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let dataset = cache.get().context("no data available to export")?;
    let filtered = dataset.filter(&selection);
    if filtered.is_empty() {
        warn!("export filter matched no records");
    }

    // Build the table before touching the output file so a failure leaves nothing behind.
    let table = match scope {
        ExportScope::Records => None,
        _ => {
            let breakdowns = insights::breakdowns(&filtered)
                .context("cannot export a breakdown of an empty selection")?;
            Some(match scope {
                ExportScope::CategorySales => breakdowns.category_totals,
                ExportScope::RegionSales => breakdowns.region_totals,
                ExportScope::StoreSales => breakdowns.store_totals,
                _ => breakdowns.monthly_trend,
            })
        }
    };

    let path = out.unwrap_or_else(|| {
        PathBuf::from(export::file_name(chrono::Local::now().date_naive(), format))
    });
    let file = File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    let writer = BufWriter::new(file);

    match &table {
        None => export::write_records(filtered.records(), format, writer)?,
        Some(table) => export::write_table(table, format, writer)?,
    }

    info!("exported {} records ({:?}) to {}", filtered.len(), scope, path.display());
    println!("Exported to {}.", path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut cache = DatasetCache::new(LoaderConfig::from_override(cli.data));

    let page = match cli.command {
        Commands::Dashboard => Page::Dashboard,
        Commands::Alerts {
            categories,
            regions,
        } => Page::Alerts(Selection {
            categories,
            regions,
            stores: Vec::new(),
        }),
        Commands::Products {
            filter,
            sort,
            ascending,
            product,
        } => Page::Products(ProductQuery {
            selection: filter.into(),
            sort,
            order: if ascending {
                SortOrder::Ascending
            } else {
                SortOrder::Descending
            },
            product,
        }),
        Commands::Admin {
            refresh,
            items_per_page,
            date_format,
            currency,
        } => {
            if refresh {
                if let Err(e) = cache.reload() {
                    warn!("reload failed: {e}");
                }
            }
            let mut settings = AdminSettings::default().with_items_per_page(items_per_page);
            settings.date_format = date_format;
            settings.currency_symbol = currency;
            Page::Admin(settings)
        }
        Commands::Predict {
            category,
            price,
            discount,
            inventory,
            holiday,
        } => {
            let inputs = demand::DemandInputs {
                category,
                price,
                discount_percent: discount,
                inventory_level: inventory,
                is_holiday: holiday,
            };
            let prediction = demand::predict(&inputs);
            return emit(cli.out.as_ref(), &report::render_prediction(&inputs, &prediction));
        }
        Commands::Export {
            format,
            scope,
            filter,
        } => return run_export(&mut cache, format, scope, filter.into(), cli.out),
        Commands::AddUser {
            username,
            email,
            role,
            password,
            confirm_password,
        } => {
            let user = admin::NewUser {
                username,
                email,
                role,
                password,
                confirm_password,
                active: true,
            };
            user.validate().context("user was not added")?;
            println!(
                "User {} ({}) validated with role {}, {}.",
                user.username,
                user.email,
                user.role.as_str(),
                if user.active { "active" } else { "inactive" }
            );
            return Ok(());
        }
    };

    emit(cli.out.as_ref(), &page_report(&mut cache, &page))
}

/// Markdown for a page, or the "No data available" notice when nothing can be shown.
fn page_report(cache: &mut DatasetCache, page: &Page) -> String {
    let dataset = match cache.get() {
        Ok(dataset) => dataset,
        Err(e) => {
            warn!("dataset unavailable: {e}");
            return report::render_no_data(&e.to_string());
        }
    };

    match views::render(page, &dataset) {
        Ok(view) => report::render_markdown(&view),
        Err(AggregationError::EmptyInput) => {
            warn!("dataset has no records");
            report::render_no_data("the inventory file contains no records")
        }
    }
}
