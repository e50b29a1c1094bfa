//! Append-only per-dialog statistics log

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::dialog::{DialogStats, format_duration};
use crate::error::Result;

pub const HEADER: &str = "Order number; Start time; Duration; Token count; Character count";

/// Semicolon-separated log, one row per finished dialog
pub struct AnalysisLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl AnalysisLog {
    /// Open `path` for appending, writing the header into an empty file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_empty = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if is_empty {
            writeln!(writer, "{}", HEADER)?;
            writer.flush()?;
        }

        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, stats: &DialogStats) -> Result<()> {
        writeln!(self.writer, "{}", format_row(stats))?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn format_row(stats: &DialogStats) -> String {
    format!(
        "{:04};{};{};{};{}",
        stats.order_id.unwrap_or_default(),
        stats.start_time.to_rfc3339(),
        format_duration(stats.duration),
        stats.token_count,
        stats.char_count
    )
}
