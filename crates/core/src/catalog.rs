use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::product::Product;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
    #[error("No products found for the given category.")]
    NoProductsFound { category: String },
}

/// Read-only product dataset, loaded once at start-up.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_json(&raw)
            .map_err(|source| CatalogError::ParseFile { path: path.to_path_buf(), source })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Vec<Product>>(raw).map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for product in &self.products {
            if !categories.contains(&product.category.as_str()) {
                categories.push(product.category.as_str());
            }
        }
        categories
    }

    /// Case-insensitive exact match on `category`, in catalog order.
    pub fn filter_products_by_category(
        &self,
        category_name: &str,
    ) -> Result<Vec<&Product>, CatalogError> {
        let matches = self
            .products
            .iter()
            .filter(|product| product.in_category(category_name))
            .collect::<Vec<_>>();

        if matches.is_empty() {
            return Err(CatalogError::NoProductsFound { category: category_name.to_string() });
        }
        Ok(matches)
    }
}
