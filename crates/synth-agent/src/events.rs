//! Batch progress events

use std::path::PathBuf;

use crate::dialog::DialogStats;

/// Events emitted while a batch runs
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A numbered dialog was written
    DialogWritten {
        order: u32,
        path: PathBuf,
        stats: DialogStats,
    },

    /// No order file for this number; skipped
    OrderMissing { order: u32, path: PathBuf },

    /// Generating this order failed; the batch continues
    OrderFailed {
        order: u32,
        path: PathBuf,
        error: String,
    },

    /// A freeform dialog was written
    RandomDialogWritten {
        index: u32,
        path: PathBuf,
        stats: DialogStats,
    },
}
