//! The three tools the assistant may call: catalog lookup by category, live
//! product details, and live pricing.

use std::sync::Arc;

use async_trait::async_trait;
use printchat_core::catalog::{Catalog, CatalogError};
use printchat_core::domain::pricing::PricingQuery;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::gateway::CloudprinterGateway;
use crate::tools::{decode_arguments, Tool, ToolDefinition, ToolError, ToolRegistry};

pub const FILTER_PRODUCTS_BY_CATEGORY: &str = "filter_products_by_category";
pub const GET_PRODUCT_INFO_BY_REFERENCE: &str = "get_product_info_by_reference";
pub const FETCH_PRICING_INFO: &str = "fetch_pricing_info";

pub fn default_registry(catalog: Arc<Catalog>, gateway: Arc<CloudprinterGateway>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(FilterProductsByCategoryTool::new(catalog));
    registry.register(GetProductInfoTool::new(gateway.clone()));
    registry.register(FetchPricingInfoTool::new(gateway));
    registry
}

#[derive(Debug, Deserialize)]
struct CategoryArguments {
    category_name: String,
}

pub struct FilterProductsByCategoryTool {
    catalog: Arc<Catalog>,
}

impl FilterProductsByCategoryTool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for FilterProductsByCategoryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: FILTER_PRODUCTS_BY_CATEGORY,
            description: "Lists the catalog products in the given category, including each product's reference and note.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "category_name": {
                        "type": "string",
                        "description": "Category chosen by the customer, e.g. \"Flyer\" or \"Business card\"."
                    }
                },
                "required": ["category_name"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let CategoryArguments { category_name } = decode_arguments(arguments)?;
        let error = match self.catalog.filter_products_by_category(&category_name) {
            Ok(products) => {
                return serde_json::to_value(products)
                    .map_err(|error| ToolError::Serialization(error.to_string()));
            }
            Err(error) => error,
        };

        error!(
            event_name = "catalog.filter.failed",
            operation = FILTER_PRODUCTS_BY_CATEGORY,
            category = %category_name,
            error = %error,
            "category lookup failed"
        );
        match error {
            CatalogError::NoProductsFound { .. } => Ok(json!({ "error": error.to_string() })),
            other => Ok(json!({ "error": format!("Unexpected error: {other}") })),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReferenceArguments {
    reference: String,
}

pub struct GetProductInfoTool {
    gateway: Arc<CloudprinterGateway>,
}

impl GetProductInfoTool {
    pub fn new(gateway: Arc<CloudprinterGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for GetProductInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: GET_PRODUCT_INFO_BY_REFERENCE,
            description: "Gets detailed information about a product from the print provider using its catalog reference.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "reference": {
                        "type": "string",
                        "description": "Product reference taken from the catalog, e.g. \"textbook_pb_a4_p_bw\"."
                    }
                },
                "required": ["reference"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let ReferenceArguments { reference } = decode_arguments(arguments)?;
        Ok(self.gateway.get_product_info_by_reference(&reference).await)
    }
}

pub struct FetchPricingInfoTool {
    gateway: Arc<CloudprinterGateway>,
}

impl FetchPricingInfoTool {
    pub fn new(gateway: Arc<CloudprinterGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for FetchPricingInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: FETCH_PRICING_INFO,
            description: "Requests a price quote for one product, using the destination country, quantity and product options the customer confirmed. Returns product price, VAT, currency and shipping options.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "country": {
                        "type": "string",
                        "description": "ISO 3166-1 alpha-2 code of the shipping country, e.g. \"NL\"."
                    },
                    "reference": {
                        "type": "string",
                        "description": "Product reference taken from the catalog."
                    },
                    "count": {
                        "type": "string",
                        "description": "Number of copies to order."
                    },
                    "options": {
                        "type": "array",
                        "description": "Product options, e.g. paper type or total page count.",
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": {"type": "string"},
                                "count": {"type": "string"}
                            },
                            "required": ["type", "count"]
                        }
                    },
                    "order_item_id": {
                        "type": "string",
                        "description": "Optional caller-side item reference."
                    }
                },
                "required": ["country", "reference", "count", "options"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let query: PricingQuery = decode_arguments(arguments)?;
        Ok(self.gateway.fetch_pricing_info(query).await)
    }
}
