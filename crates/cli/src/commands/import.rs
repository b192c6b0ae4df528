//! Bulk catalog import from CSV files.
//!
//! Reimplements the admin panel's spreadsheet importer: each row is
//! validated and written on its own, and a bad row never aborts the rest of
//! the file. The outcome reports how many rows succeeded, how many failed,
//! and one message per failure.
//!
//! # Usage
//!
//! ```bash
//! keyiflibox-cli import activity activities.csv
//! keyiflibox-cli import category categories.csv
//! keyiflibox-cli import activity-type activity_types.csv
//! keyiflibox-cli import product products.csv
//! ```
//!
//! Product rows may carry an `id` column: a non-empty id updates the
//! existing product, an empty or absent id inserts a new one.

use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use keyiflibox_core::{ActivityId, ActivityTypeId, CategoryId, Price, ProductId};
use keyiflibox_storefront::catalog::{CatalogStore, PgCatalog};
use keyiflibox_storefront::db::create_pool;
use keyiflibox_storefront::models::ProductDraft;

/// What a CSV file's rows describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportKind {
    Activity,
    Category,
    ActivityType,
    Product,
}

impl ImportKind {
    /// File-name stem used for templates (`product_template.csv`).
    #[must_use]
    pub const fn stem(self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Category => "category",
            Self::ActivityType => "activity_type",
            Self::Product => "product",
        }
    }
}

/// Errors that abort an import before any row is processed.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The CSV file could not be opened.
    #[error("Cannot read {path}: {source}")]
    File {
        path: String,
        source: csv::Error,
    },
}

/// Per-file import outcome: row failures are collected here, not raised.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub success: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

impl ImportOutcome {
    fn ok(&mut self) {
        self.success += 1;
    }

    fn fail(&mut self, message: String) {
        self.failed += 1;
        self.errors.push(message);
    }
}

/// Run an import against the configured database.
///
/// # Errors
///
/// Returns [`ImportError`] if the environment, connection, or file is
/// unusable. Row-level failures are reported in the summary instead.
pub async fn run(kind: ImportKind, file: &str) -> Result<(), ImportError> {
    dotenvy::dotenv().ok();

    let database_url = super::database_url().map_err(ImportError::MissingEnvVar)?;
    let pool = create_pool(&database_url).await?;
    let catalog = PgCatalog::new(pool);

    info!(file, kind = kind.stem(), "Starting import");
    let outcome = import_file(&catalog, kind, Path::new(file)).await?;

    info!("Import complete!");
    info!("  Rows imported: {}", outcome.success);
    info!("  Rows failed: {}", outcome.failed);
    if !outcome.errors.is_empty() {
        error!("  Errors:");
        for err in &outcome.errors {
            error!("    - {err}");
        }
    }

    Ok(())
}

/// Import one CSV file into the given catalog store.
///
/// # Errors
///
/// Returns [`ImportError::File`] if the file cannot be opened; everything
/// past that point is a row-level outcome.
pub async fn import_file(
    catalog: &dyn CatalogStore,
    kind: ImportKind,
    path: &Path,
) -> Result<ImportOutcome, ImportError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| ImportError::File {
            path: path.display().to_string(),
            source,
        })?;

    Ok(match kind {
        ImportKind::Activity => import_activities(catalog, reader).await,
        ImportKind::Category => import_categories(catalog, reader).await,
        ImportKind::ActivityType => import_activity_types(catalog, reader).await,
        ImportKind::Product => import_products(catalog, reader).await,
    })
}

// =============================================================================
// Row shapes
//
// Columns are matched by header name; extra columns (the parent-name labels
// the templates carry for human readers) are ignored. Required fields are
// checked per row so one bad row cannot abort the file.
// =============================================================================

#[derive(Debug, Deserialize)]
struct ActivityRow {
    #[serde(default)]
    activity_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    #[serde(default)]
    activity_id: Option<String>,
    #[serde(default)]
    category_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActivityTypeRow {
    #[serde(default)]
    activity_id: Option<String>,
    #[serde(default)]
    category_id: Option<String>,
    #[serde(default)]
    activity_type_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    activity_type_id: Option<String>,
    #[serde(default)]
    category_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    sub_title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    external_url: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    ticket_rule: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    rating: Option<String>,
    #[serde(default)]
    is_active: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    full_address: Option<String>,
}

impl ProductRow {
    /// Map the raw row into a draft, or explain what is missing.
    fn to_draft(&self) -> Result<ProductDraft, String> {
        let category_id = required(self.category_id.as_deref(), "category_id")?;
        let title = required(self.title.as_deref(), "title")?;

        Ok(ProductDraft {
            activity_type_id: opt(self.activity_type_id.as_deref()).map(ActivityTypeId::new),
            category_id: CategoryId::new(category_id),
            title: title.to_owned(),
            sub_title: opt(self.sub_title.as_deref()).map(str::to_owned),
            description: opt(self.description.as_deref()).map(str::to_owned),
            price: parse_price(self.price.as_deref()),
            image_url: opt(self.image_url.as_deref()).map(str::to_owned),
            external_url: opt(self.external_url.as_deref()).map(str::to_owned),
            city: opt(self.city.as_deref()).map(str::to_owned),
            district: opt(self.district.as_deref()).map(str::to_owned),
            ticket_rule: opt(self.ticket_rule.as_deref()).map(str::to_owned),
            date: opt(self.date.as_deref()).map(str::to_owned),
            rating: opt(self.rating.as_deref()).and_then(|s| s.parse::<f64>().ok()),
            is_active: parse_is_active(self.is_active.as_deref()),
            priority: opt(self.priority.as_deref()).and_then(|s| s.parse::<i32>().ok()),
            full_address: opt(self.full_address.as_deref()).map(str::to_owned),
        })
    }
}

/// Treat empty cells as absent.
fn opt(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, String> {
    opt(value).ok_or_else(|| format!("missing {field}"))
}

/// An unparseable or empty price imports as zero, matching the admin
/// panel's tolerance for rough spreadsheets.
fn parse_price(value: Option<&str>) -> Price {
    Price::new(
        opt(value)
            .and_then(|s| Decimal::from_str(s).ok())
            .unwrap_or(Decimal::ZERO),
    )
}

/// Only an explicit "false" deactivates a product.
fn parse_is_active(value: Option<&str>) -> bool {
    !matches!(
        opt(value).map(str::to_ascii_lowercase).as_deref(),
        Some("false" | "0" | "no")
    )
}

// =============================================================================
// Per-kind import loops
// =============================================================================

pub(crate) async fn import_activities<R>(catalog: &dyn CatalogStore, mut reader: csv::Reader<R>) -> ImportOutcome
where
    R: std::io::Read,
{
    let mut outcome = ImportOutcome::default();

    for record in reader.deserialize::<ActivityRow>() {
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                outcome.fail(format!("Unreadable row: {e}"));
                continue;
            }
        };
        let Some(name) = opt(row.activity_name.as_deref()) else {
            outcome.fail("Row missing activity_name".to_owned());
            continue;
        };
        match catalog.insert_activity(name).await {
            Ok(_) => outcome.ok(),
            Err(e) => outcome.fail(format!("Error inserting {name}: {e}")),
        }
    }

    outcome
}

pub(crate) async fn import_categories<R>(catalog: &dyn CatalogStore, mut reader: csv::Reader<R>) -> ImportOutcome
where
    R: std::io::Read,
{
    let mut outcome = ImportOutcome::default();

    for record in reader.deserialize::<CategoryRow>() {
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                outcome.fail(format!("Unreadable row: {e}"));
                continue;
            }
        };
        let (Some(activity_id), Some(name)) = (
            opt(row.activity_id.as_deref()),
            opt(row.category_name.as_deref()),
        ) else {
            outcome.fail("Row missing activity_id or category_name".to_owned());
            continue;
        };
        match catalog
            .insert_category(&ActivityId::new(activity_id), name)
            .await
        {
            Ok(_) => outcome.ok(),
            Err(e) => outcome.fail(format!("Error inserting {name}: {e}")),
        }
    }

    outcome
}

pub(crate) async fn import_activity_types<R>(
    catalog: &dyn CatalogStore,
    mut reader: csv::Reader<R>,
) -> ImportOutcome
where
    R: std::io::Read,
{
    let mut outcome = ImportOutcome::default();

    for record in reader.deserialize::<ActivityTypeRow>() {
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                outcome.fail(format!("Unreadable row: {e}"));
                continue;
            }
        };
        let (Some(activity_id), Some(category_id), Some(name)) = (
            opt(row.activity_id.as_deref()),
            opt(row.category_id.as_deref()),
            opt(row.activity_type_name.as_deref()),
        ) else {
            outcome.fail("Row missing activity_id, category_id, or activity_type_name".to_owned());
            continue;
        };
        match catalog
            .insert_activity_type(&ActivityId::new(activity_id), &CategoryId::new(category_id), name)
            .await
        {
            Ok(_) => outcome.ok(),
            Err(e) => outcome.fail(format!("Error inserting {name}: {e}")),
        }
    }

    outcome
}

pub(crate) async fn import_products<R>(catalog: &dyn CatalogStore, mut reader: csv::Reader<R>) -> ImportOutcome
where
    R: std::io::Read,
{
    let mut outcome = ImportOutcome::default();

    for record in reader.deserialize::<ProductRow>() {
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                outcome.fail(format!("Unreadable row: {e}"));
                continue;
            }
        };
        let draft = match row.to_draft() {
            Ok(draft) => draft,
            Err(missing) => {
                outcome.fail(format!("Row rejected: {missing}"));
                continue;
            }
        };

        // A row with an id updates the existing product; otherwise insert.
        let result = match opt(row.id.as_deref()) {
            Some(id) => catalog.update_product(&ProductId::new(id), &draft).await,
            None => catalog.insert_product(&draft).await.map(|_| ()),
        };

        match result {
            Ok(()) => outcome.ok(),
            Err(e) => outcome.fail(format!("Error processing {}: {e}", draft.title)),
        }
    }

    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use keyiflibox_storefront::catalog::{MemoryCatalog, ProductFilter};

    fn reader(csv_text: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv_text.as_bytes())
    }

    #[tokio::test]
    async fn test_activity_rows_insert() {
        let catalog = MemoryCatalog::new();
        let outcome = import_activities(
            &catalog,
            reader("activity_name\nKeşfet & Eğlen\nSpor & Macera\n"),
        )
        .await;

        assert_eq!(outcome.success, 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(catalog.activities().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_required_field_fails_only_that_row() {
        let catalog = MemoryCatalog::new();
        let outcome = import_activities(
            &catalog,
            reader("activity_name\nKeşfet & Eğlen\n\"\"\nSpor & Macera\n"),
        )
        .await;

        assert_eq!(outcome.success, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_category_requires_parent_activity_id() {
        let catalog = MemoryCatalog::new();
        let outcome = import_categories(
            &catalog,
            reader("activity_id,category_name\n,Tema ve Macera Parkları\n"),
        )
        .await;

        assert_eq!(outcome.success, 0);
        assert_eq!(outcome.failed, 1);
    }

    #[tokio::test]
    async fn test_product_insert_with_defaults() {
        let catalog = MemoryCatalog::new();
        let outcome = import_products(
            &catalog,
            reader("category_id,title,price,is_active\n1,Tandem Atlayış,4500,\n"),
        )
        .await;

        assert_eq!(outcome.success, 1);
        let products = catalog.products(&ProductFilter::default()).await.unwrap();
        let product = products.first().unwrap();
        assert_eq!(product.title, "Tandem Atlayış");
        assert_eq!(product.price.amount(), dec!(4500));
        assert!(product.is_active, "is_active defaults to true");
    }

    #[tokio::test]
    async fn test_product_unparseable_price_imports_as_zero() {
        let catalog = MemoryCatalog::new();
        let outcome = import_products(
            &catalog,
            reader("category_id,title,price\n1,Hamam,çok pahalı\n"),
        )
        .await;

        assert_eq!(outcome.success, 1);
        let products = catalog.products(&ProductFilter::default()).await.unwrap();
        assert!(products.first().unwrap().price.is_free());
    }

    #[tokio::test]
    async fn test_product_row_with_id_updates() {
        let catalog = MemoryCatalog::new();
        let outcome = import_products(
            &catalog,
            reader("category_id,title,price\n1,Rafting,300\n"),
        )
        .await;
        assert_eq!(outcome.success, 1);

        let products = catalog.products(&ProductFilter::default()).await.unwrap();
        let id = products.first().unwrap().id.clone();

        let csv_text = format!("id,category_id,title,price\n{id},1,Rafting Turu,350\n");
        let outcome = import_products(&catalog, reader(&csv_text)).await;
        assert_eq!(outcome.success, 1);

        let products = catalog.products(&ProductFilter::default()).await.unwrap();
        assert_eq!(products.len(), 1, "update must not create a second product");
        assert_eq!(products.first().unwrap().title, "Rafting Turu");
        assert_eq!(products.first().unwrap().price.amount(), dec!(350));
    }

    #[tokio::test]
    async fn test_product_update_unknown_id_is_reported() {
        let catalog = MemoryCatalog::new();
        let outcome = import_products(
            &catalog,
            reader("id,category_id,title,price\nno-such-id,1,Rafting,300\n"),
        )
        .await;

        assert_eq!(outcome.success, 0);
        assert_eq!(outcome.failed, 1);
        assert!(outcome.errors.first().unwrap().contains("Rafting"));
    }

    #[tokio::test]
    async fn test_extra_template_columns_are_ignored() {
        let catalog = MemoryCatalog::new();
        let outcome = import_categories(
            &catalog,
            reader("activity_id,activity_name,category_name\na-1,Keşfet & Eğlen,Tema ve Macera Parkları\n"),
        )
        .await;

        assert_eq!(outcome.success, 1);
        assert_eq!(catalog.categories().await.unwrap().len(), 1);
    }

    #[test]
    fn test_is_active_parsing() {
        assert!(parse_is_active(None));
        assert!(parse_is_active(Some("")));
        assert!(parse_is_active(Some("true")));
        assert!(!parse_is_active(Some("false")));
        assert!(!parse_is_active(Some("FALSE")));
        assert!(!parse_is_active(Some("0")));
    }
}
