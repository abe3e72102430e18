use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::ranking::Selection;

/// Write a row extract as comma-separated text with a header row.
pub fn write_csv<W: Write>(selection: &Selection, output: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer
        .write_record(&selection.columns)
        .context("writing CSV header")?;
    for (row_no, row) in selection.rows.iter().enumerate() {
        writer
            .write_record(row.iter().map(|v| v.to_field()))
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}

/// Write a row extract to `path`, replacing any existing file.
pub fn export_csv(selection: &Selection, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv(selection, file)?;
    log::info!("Exported {} rows to {}", selection.len(), path.display());
    Ok(())
}
