use std::path::PathBuf;

use thiserror::Error;

/// Failures while locating or reading the inventory file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("inventory file not found (tried {})", display_paths(.tried))]
    NotFound { tried: Vec<PathBuf> },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed inventory file: {detail}")]
    Parse { detail: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("cannot aggregate an empty dataset")]
    EmptyInput,
}

/// Admin form validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("passwords do not match")]
    MismatchedPassword,

    #[error("username must not be empty")]
    EmptyUsername,
}
