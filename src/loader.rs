use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::models::{Dataset, Record, COLUMNS};

/// First candidate that exists on disk.
pub fn resolve_path(config: &LoaderConfig) -> Result<PathBuf, LoadError> {
    config
        .candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| LoadError::NotFound {
            tried: config.candidates.clone(),
        })
}

pub fn load(config: &LoaderConfig) -> Result<Dataset, LoadError> {
    let path = resolve_path(config)?;
    let file = std::fs::File::open(&path).map_err(|source| LoadError::Io {
        path: path.clone(),
        source,
    })?;
    let dataset = read_dataset(file)?;
    info!("loaded {} records from {}", dataset.len(), path.display());
    Ok(dataset)
}

/// Parses an inventory CSV, failing closed on a missing column or bad row.
pub fn read_dataset<R: Read>(reader: R) -> Result<Dataset, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(|e| LoadError::Parse {
        detail: format!("unreadable header: {}", e),
    })?;
    if let Some(missing) = COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(LoadError::Parse {
            detail: format!("missing column '{}'", missing),
        });
    }

    let mut records = Vec::new();
    for (line_num, result) in csv_reader.deserialize::<Record>().enumerate() {
        let record = result.map_err(|e| LoadError::Parse {
            detail: format!("line {}: {}", line_num + 2, e),
        })?;
        records.push(record);
    }

    Ok(Dataset::new(records))
}

/// Holds at most one loaded dataset until explicitly invalidated.
#[derive(Debug)]
pub struct DatasetCache {
    config: LoaderConfig,
    slot: Option<Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config, slot: None }
    }

    pub fn get(&mut self) -> Result<Arc<Dataset>, LoadError> {
        if let Some(dataset) = &self.slot {
            debug!("dataset cache hit ({} records)", dataset.len());
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(load(&self.config)?);
        self.slot = Some(Arc::clone(&dataset));
        Ok(dataset)
    }

    pub fn invalidate(&mut self) {
        if self.slot.take().is_some() {
            info!("dataset cache cleared");
        }
    }

    /// Drops any cached copy and reads the file again.
    pub fn reload(&mut self) -> Result<Arc<Dataset>, LoadError> {
        self.invalidate();
        let dataset = self.get()?;
        info!("dataset reloaded from disk ({} records)", dataset.len());
        Ok(dataset)
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.slot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Date,Store ID,Product ID,Category,Region,Inventory Level,Units Sold,Units Ordered,Price,Discount,Weather Condition,Seasonality,Competitor Pricing";

    fn sample_csv() -> String {
        format!(
            "{HEADER}\n\
             2022-01-01,S001,P0001,Groceries,North,231,127,55,33.5,20,Rainy,Autumn,29.69\n\
             2022-01-02,S001,P0002,Toys,South,204,150,66,63.01,20,Sunny,Autumn,66.16\n"
        )
    }

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_rows_and_dates() {
        let dataset = read_dataset(sample_csv().as_bytes()).unwrap();
        assert_eq!(dataset.len(), 2);
        let first = &dataset.records()[0];
        assert_eq!(first.date.to_string(), "2022-01-01");
        assert_eq!(first.inventory_level, 231);
        assert!((first.competitor_price - 29.69).abs() < 1e-9);
    }

    #[test]
    fn tolerates_extra_columns_and_timestamps() {
        let csv = "Date,Store ID,Product ID,Category,Region,Inventory Level,Units Sold,Units Ordered,Demand Forecast,Price,Discount,Weather Condition,Holiday/Promotion,Competitor Pricing,Seasonality\n\
                   2022-01-01 00:00:00,S001,P0001,Groceries,North,231,127,55,135.47,33.5,20,Rainy,0,29.69,Autumn\n";
        let dataset = read_dataset(csv.as_bytes()).unwrap();
        assert_eq!(dataset.records()[0].seasonality, "Autumn");
    }

    #[test]
    fn missing_column_is_parse_error() {
        let csv = "Date,Store ID,Product ID,Category,Region,Inventory Level,Units Sold,Units Ordered,Price,Discount,Weather Condition,Seasonality\n";
        match read_dataset(csv.as_bytes()) {
            Err(LoadError::Parse { detail }) => assert!(detail.contains("Competitor Pricing")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn bad_date_is_parse_error() {
        let csv = format!("{HEADER}\nnot-a-date,S001,P1,Toys,North,1,1,1,1.0,0,Sunny,Spring,1.0\n");
        assert!(matches!(
            read_dataset(csv.as_bytes()),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn non_ascii_date_is_parse_error() {
        let csv = format!("{HEADER}\n2022-01-0\u{e9}1,S001,P1,Toys,North,1,1,1,1.0,0,Sunny,Spring,1.0\n");
        match read_dataset(csv.as_bytes()) {
            Err(LoadError::Parse { detail }) => assert!(detail.starts_with("line 2")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn blank_price_loads_as_nan() {
        let csv = format!("{HEADER}\n2022-01-01,S001,P1,Toys,North,1,1,1,,0,Sunny,Spring,1.0\n");
        let dataset = read_dataset(csv.as_bytes()).unwrap();
        assert!(dataset.records()[0].price.is_nan());
    }

    #[test]
    fn not_found_when_no_candidate_exists() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoaderConfig {
            candidates: vec![dir.path().join("a.csv"), dir.path().join("b.csv")],
        };
        match load(&config) {
            Err(LoadError::NotFound { tried }) => assert_eq!(tried.len(), 2),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_second_candidate() {
        let file = write_temp(&sample_csv());
        let dir = tempfile::tempdir().unwrap();
        let config = LoaderConfig {
            candidates: vec![dir.path().join("missing.csv"), file.path().to_path_buf()],
        };
        assert_eq!(resolve_path(&config).unwrap(), file.path());
        assert_eq!(load(&config).unwrap().len(), 2);
    }

    #[test]
    fn cache_returns_same_dataset_until_invalidated() {
        let file = write_temp(&sample_csv());
        let mut cache = DatasetCache::new(LoaderConfig::explicit(file.path()));
        assert!(!cache.is_loaded());

        let first = cache.get().unwrap();
        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache.invalidate();
        assert!(!cache.is_loaded());
        let third = cache.get().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }

    #[test]
    fn reload_picks_up_changes_on_disk() {
        let file = write_temp(&sample_csv());
        let mut cache = DatasetCache::new(LoaderConfig::explicit(file.path()));
        assert_eq!(cache.get().unwrap().len(), 2);

        std::fs::write(file.path(), format!("{HEADER}\n")).unwrap();
        assert_eq!(cache.get().unwrap().len(), 2);

        let fresh = cache.reload().unwrap();
        assert!(fresh.is_empty());
        assert!(Arc::ptr_eq(&fresh, &cache.get().unwrap()));
    }

    #[test]
    fn cache_does_not_store_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = DatasetCache::new(LoaderConfig::explicit(dir.path().join("none.csv")));
        assert!(cache.get().is_err());
        assert!(!cache.is_loaded());
    }
}
