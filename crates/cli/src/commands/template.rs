//! Sample CSV templates for the bulk importer.
//!
//! Each template carries the headers the importer matches on plus a sample
//! row or two. The parent `*_name` columns are labels for whoever fills the
//! sheet in; the importer ignores them.
//!
//! # Usage
//!
//! ```bash
//! keyiflibox-cli template product -o /tmp   # writes /tmp/product_template.csv
//! ```

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::import::ImportKind;

/// Errors that can occur while writing a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The output file could not be created.
    #[error("Cannot write template: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("Cannot write template: {0}")]
    Csv(#[from] csv::Error),
}

/// Write `<kind>_template.csv` into `output`.
///
/// # Errors
///
/// Returns [`TemplateError`] if the file cannot be created or written.
pub fn run(kind: ImportKind, output: &str) -> Result<(), TemplateError> {
    let path: PathBuf = Path::new(output).join(format!("{}_template.csv", kind.stem()));
    let file = File::create(&path)?;
    write_template(kind, file)?;

    info!(path = %path.display(), "Template written");
    Ok(())
}

/// Write the sample rows for a kind to any sink.
///
/// # Errors
///
/// Returns [`TemplateError::Csv`] if a record cannot be written.
pub fn write_template<W: Write>(kind: ImportKind, sink: W) -> Result<(), TemplateError> {
    let mut writer = csv::Writer::from_writer(sink);

    match kind {
        ImportKind::Activity => {
            writer.write_record(["activity_name"])?;
            writer.write_record(["Keşfet & Eğlen"])?;
            writer.write_record(["Spor & Macera"])?;
        }
        ImportKind::Category => {
            writer.write_record(["activity_id", "activity_name", "category_name"])?;
            writer.write_record([
                "UUID-of-activity",
                "Parent Activity",
                "Tema ve Macera Parkları",
            ])?;
        }
        ImportKind::ActivityType => {
            writer.write_record([
                "activity_id",
                "activity_name",
                "category_id",
                "category_name",
                "activity_type_name",
            ])?;
            writer.write_record([
                "UUID-of-activity",
                "Parent Activity",
                "UUID-of-category",
                "Parent Category",
                "Tema Park",
            ])?;
        }
        ImportKind::Product => {
            writer.write_record([
                "id",
                "activity_type_id",
                "category_id",
                "title",
                "sub_title",
                "description",
                "price",
                "image_url",
                "external_url",
                "city",
                "district",
                "ticket_rule",
                "date",
                "rating",
                "is_active",
                "priority",
                "full_address",
            ])?;
            writer.write_record([
                "",
                "",
                "1",
                "Sample Product",
                "",
                "",
                "0",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "true",
                "0",
                "",
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}
