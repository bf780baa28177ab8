use std::path::PathBuf;

use printchat_core::catalog::{Catalog, CatalogError};
use printchat_core::config::{AppConfig, LoadOptions};
use serde_json::json;

use crate::commands::CommandResult;

/// Offline `filter_products_by_category` against the local catalog file.
pub fn run(category: &str, path: Option<PathBuf>) -> CommandResult {
    let path = path.unwrap_or_else(configured_catalog_path);

    let catalog = match Catalog::load(&path) {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::failure("catalog", "catalog_load", error.to_string(), 2),
    };

    match catalog.filter_products_by_category(category) {
        Ok(products) => CommandResult::json("catalog", 0, &products),
        Err(error @ CatalogError::NoProductsFound { .. }) => {
            CommandResult::json("catalog", 1, &json!({ "error": error.to_string() }))
        }
        Err(error) => CommandResult::failure("catalog", "catalog_load", error.to_string(), 2),
    }
}

// The lookup needs no credentials, so an invalid config falls back to the
// default catalog path instead of failing.
fn configured_catalog_path() -> PathBuf {
    AppConfig::load(LoadOptions::default())
        .map(|config| config.catalog.path)
        .unwrap_or_else(|_| AppConfig::default().catalog.path)
}
