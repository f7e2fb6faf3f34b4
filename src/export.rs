use std::io::Write;

use clap::ValueEnum;
use serde_json::{Map, Value};

use crate::aggregate::AggregateTable;
use crate::models::{Record, COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Writes records with the same column names the loader reads.
pub fn write_records<W: Write>(
    records: &[Record],
    format: ExportFormat,
    writer: W,
) -> anyhow::Result<()> {
    match format {
        ExportFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(writer);
            // serialize only emits the header alongside the first row
            if records.is_empty() {
                csv_writer.write_record(COLUMNS)?;
            }
            for record in records {
                csv_writer.serialize(record)?;
            }
            csv_writer.flush()?;
        }
        ExportFormat::Json => serde_json::to_writer_pretty(writer, records)?,
    }
    Ok(())
}

/// Group keys first, then one column per reduction.
pub fn write_table<W: Write>(
    table: &AggregateTable,
    format: ExportFormat,
    writer: W,
) -> anyhow::Result<()> {
    let headers = table.headers();
    match format {
        ExportFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(writer);
            csv_writer.write_record(&headers)?;
            for row in &table.rows {
                let cells = row
                    .keys
                    .iter()
                    .cloned()
                    .chain(row.values.iter().map(|v| v.to_string()));
                csv_writer.write_record(cells)?;
            }
            csv_writer.flush()?;
        }
        ExportFormat::Json => {
            let objects: Vec<Value> = table
                .rows
                .iter()
                .map(|row| {
                    let cells = row
                        .keys
                        .iter()
                        .map(|k| Value::String(k.clone()))
                        .chain(row.values.iter().map(|v| serde_json::json!(v)));
                    Value::Object(headers.iter().cloned().zip(cells).collect::<Map<_, _>>())
                })
                .collect();
            serde_json::to_writer_pretty(writer, &objects)?;
        }
    }
    Ok(())
}

/// Suggested file name, e.g. `retail_data_20240131.csv`.
pub fn file_name(stamp: chrono::NaiveDate, format: ExportFormat) -> String {
    format!("retail_data_{}.{}", stamp.format("%Y%m%d"), format.extension())
}
