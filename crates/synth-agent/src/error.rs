//! Error types for synth-agent

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using synth-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading inputs or running a dialog
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the provider layer
    #[error(transparent)]
    Ai(#[from] synth_ai::Error),

    /// The order file does not exist
    #[error("Order file {} not found", .path.display())]
    OrderFileNotFound { path: PathBuf },

    /// The order file has no header or no rows
    #[error("Order file {} is empty or corrupt", .path.display())]
    EmptyOrderFile { path: PathBuf },

    /// A required column is absent from the order file
    #[error("Order file {} is missing column: {column}", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// A quantity cell is not a positive integer
    #[error("Order file {}: invalid quantity {value:?} for {item}", .path.display())]
    InvalidQuantity {
        path: PathBuf,
        item: String,
        value: String,
    },

    /// The menu file could not be used
    #[error("Menu file {}: {message}", .path.display())]
    Menu { path: PathBuf, message: String },

    /// CSV parsing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The model returned no text
    #[error("The model returned an empty reply")]
    EmptyResponse,

    /// A generic agent error
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_embed_path() {
        let e = Error::MissingColumn {
            path: PathBuf::from("Orders/Order-0001.csv"),
            column: "Quantity".into(),
        };
        assert_eq!(
            e.to_string(),
            "Order file Orders/Order-0001.csv is missing column: Quantity"
        );
    }

    #[test]
    fn test_ai_errors_are_transparent() {
        let e: Error = synth_ai::Error::InvalidApiKey.into();
        assert_eq!(e.to_string(), "Invalid or missing API key");
    }
}
