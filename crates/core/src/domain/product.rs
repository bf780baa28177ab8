use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Catalog record. Fields beyond the three the assistant relies on are kept
/// verbatim so they round-trip to the model unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub category: String,
    pub reference: String,
    pub note: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    pub fn in_category(&self, category_name: &str) -> bool {
        self.category.to_lowercase() == category_name.to_lowercase()
    }
}
