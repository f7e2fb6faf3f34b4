use std::path::PathBuf;

use clap::ValueEnum;

/// Locations tried, in order, when no explicit data path is given.
pub const DEFAULT_CANDIDATES: [&str; 2] = [
    "notebooks/retail_store_inventory.csv",
    "retail_store_inventory.csv",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub candidates: Vec<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES.iter().map(PathBuf::from).collect(),
        }
    }
}

impl LoaderConfig {
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![path.into()],
        }
    }

    /// Explicit path when given (flag or `RETAIL_DATA_PATH`), defaults otherwise.
    pub fn from_override(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::explicit(path),
            None => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DateFormat {
    Iso,
    UsSlash,
    EuSlash,
}

impl DateFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::Iso => "%Y-%m-%d",
            DateFormat::UsSlash => "%m/%d/%Y",
            DateFormat::EuSlash => "%d/%m/%Y",
        }
    }
}

/// Admin panel display and alert preferences.
///
/// These are presentation state only; alert rules always derive their
/// thresholds from the loaded data.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSettings {
    pub date_format: DateFormat,
    pub currency_symbol: String,
    pub items_per_page: u32,
    pub low_stock_threshold: u32,
    pub high_demand_threshold: u32,
    pub email_alerts: bool,
    pub sms_alerts: bool,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            date_format: DateFormat::Iso,
            currency_symbol: "$".to_string(),
            items_per_page: 20,
            low_stock_threshold: 100,
            high_demand_threshold: 200,
            email_alerts: false,
            sms_alerts: false,
        }
    }
}

impl AdminSettings {
    /// Snaps to the 10..=100 slider in steps of 10.
    pub fn with_items_per_page(mut self, items: u32) -> Self {
        let clamped = items.clamp(10, 100);
        self.items_per_page = (clamped + 5) / 10 * 10;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_candidates_in_order() {
        let config = LoaderConfig::default();
        assert_eq!(
            config.candidates,
            vec![
                PathBuf::from("notebooks/retail_store_inventory.csv"),
                PathBuf::from("retail_store_inventory.csv"),
            ]
        );
    }

    #[test]
    fn override_replaces_candidates() {
        let config = LoaderConfig::from_override(Some(PathBuf::from("/tmp/data.csv")));
        assert_eq!(config.candidates, vec![PathBuf::from("/tmp/data.csv")]);
    }

    #[test]
    fn items_per_page_snaps_to_slider() {
        let settings = AdminSettings::default();
        assert_eq!(settings.clone().with_items_per_page(3).items_per_page, 10);
        assert_eq!(settings.clone().with_items_per_page(44).items_per_page, 40);
        assert_eq!(settings.with_items_per_page(500).items_per_page, 100);
    }
}
