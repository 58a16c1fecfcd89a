//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Pineapple
//!     description: Sweet and golden
//!     price: "4.99"
//!     image: /images/pineapple.jpg
//! ```
//!
//! The whole file is validated before anything is written. Products whose
//! name already exists in the catalog are skipped, so re-running a seed is
//! harmless.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use bazaar_api::config;
use bazaar_api::db::{self, CatalogStore, PgCatalogStore};
use bazaar_api::models::NewProduct;

/// A catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<CatalogEntry>,
}

/// One product in a catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
}

/// Validate every entry, collecting all problems.
///
/// # Errors
///
/// Returns every problem found, formatted as `"#<position> <name>: <reason>"`.
pub fn validate(catalog: &CatalogFile) -> Result<Vec<NewProduct>, Vec<String>> {
    let mut products = Vec::with_capacity(catalog.products.len());
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, entry) in catalog.products.iter().enumerate() {
        let position = index + 1;
        match NewProduct::parse(
            &entry.name,
            &entry.description,
            entry.price,
            entry.image.as_deref(),
        ) {
            Ok(product) => {
                if seen.insert(product.name.clone()) {
                    products.push(product);
                } else {
                    errors.push(format!("#{position} {}: duplicate name", entry.name));
                }
            }
            Err(e) => errors.push(format!("#{position} {}: {e}", entry.name)),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

/// Seed products from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or database operations fail.
pub async fn products(file_path: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !file_path.exists() {
        return Err(format!("File not found: {}", file_path.display()).into());
    }

    info!(path = %file_path.display(), "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(file_path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;
    info!(products = catalog.products.len(), "Parsed catalog");

    let products = match validate(&catalog) {
        Ok(products) => products,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };

    info!("Catalog validated successfully");

    if dry_run {
        for product in &products {
            info!("  would insert {} ({})", product.name, product.price);
        }
        return Ok(());
    }

    let database_url = config::database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let store = PgCatalogStore::new(pool);
    let existing: HashSet<String> = store
        .list_products()
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();

    let mut inserted = 0_usize;
    let mut skipped = 0_usize;
    for product in products {
        if existing.contains(&product.name) {
            skipped += 1;
            continue;
        }
        store.create_product(product).await?;
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products skipped (already exist): {skipped}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_catalog_is_valid() {
        let content = include_str!("../../seeds/catalog.yaml");
        let catalog: CatalogFile = serde_yaml::from_str(content).unwrap();
        let products = validate(&catalog).unwrap();
        assert_eq!(products.len(), catalog.products.len());
        assert!(!products.is_empty());
    }

    #[test]
    fn test_validation_collects_every_error() {
        let catalog: CatalogFile = serde_yaml::from_str(
            r#"
products:
  - name: Mango
    price: "2.50"
  - name: ""
    price: "1.00"
  - name: Mango
    price: "3.00"
  - name: Lime
    price: "-1"
"#,
        )
        .unwrap();

        let errors = validate(&catalog).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("#2"));
        assert!(errors[1].contains("duplicate name"));
        assert!(errors[2].contains("price"));
    }
}
