use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use csv::WriterBuilder;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Column header of the exported sheet
pub const RECIPIENT_COLUMN: &str = "Recipient Email IDs";

/// Writes a single-column sheet: one header row, then one row per value
pub trait SpreadsheetWriter {
    fn write(&self, path: &Path, header: &str, rows: &[String]) -> Result<()>;

    /// Short name shown in the step log
    fn label(&self) -> &str;

    fn extension(&self) -> &str;
}

pub struct CsvSpreadsheetWriter;

impl SpreadsheetWriter for CsvSpreadsheetWriter {
    fn write(&self, path: &Path, header: &str, rows: &[String]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create directory {:?}", parent))?;
        }

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("Unable to create file {:?}", path))?;

        writer.write_record([header])?;
        for row in rows {
            writer.write_record([row.as_str()])?;
        }
        writer.flush()
            .with_context(|| format!("Unable to write file {:?}", path))?;

        debug!("{} row(s) written to {:?}", rows.len(), path);
        Ok(())
    }

    fn label(&self) -> &str {
        "csv"
    }

    fn extension(&self) -> &str {
        "csv"
    }
}

/// `<dir>/recipients_<YYYYmmdd_HHMMSS>.<extension>`
pub fn export_file_path(dir: impl AsRef<Path>, now: DateTime<Local>, extension: &str) -> PathBuf {
    let file_name = format!("recipients_{}.{}", now.format("%Y%m%d_%H%M%S"), extension);
    dir.as_ref().join(file_name)
}

pub fn export_recipients<W: SpreadsheetWriter + ?Sized>(
    writer: &W,
    dir: impl AsRef<Path>,
    recipients: &[String],
) -> Result<PathBuf> {
    let path = export_file_path(dir, Local::now(), writer.extension());
    writer.write(&path, RECIPIENT_COLUMN, recipients)?;
    info!("💾 {} recipient(s) saved to {:?}", recipients.len(), path);
    Ok(path)
}
