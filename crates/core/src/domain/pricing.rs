use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_ORDER_ITEM_ID: &str = "ref_id_1234567";
pub const REDACTED: &str = "<redacted>";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingOption {
    #[serde(rename = "type")]
    pub option_type: String,
    #[serde(deserialize_with = "string_or_number")]
    pub count: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingItem {
    pub reference: String,
    pub product: String,
    #[serde(deserialize_with = "string_or_number")]
    pub count: String,
    #[serde(default)]
    pub options: Vec<PricingOption>,
}

/// What the assistant supplies when asking for a quote.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PricingQuery {
    pub country: String,
    pub reference: String,
    #[serde(deserialize_with = "string_or_number")]
    pub count: String,
    #[serde(default)]
    pub options: Vec<PricingOption>,
    #[serde(default)]
    pub order_item_id: Option<String>,
}

impl PricingQuery {
    pub fn order_item_id(&self) -> &str {
        self.order_item_id.as_deref().unwrap_or(DEFAULT_ORDER_ITEM_ID)
    }

    pub fn into_request(self, apikey: impl Into<String>) -> PricingRequest {
        let order_item_id = self.order_item_id().to_string();
        PricingRequest::single_item(
            apikey,
            self.country,
            order_item_id,
            self.reference,
            self.count,
            self.options,
        )
    }
}

/// Body of `POST /orders/quote`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PricingRequest {
    pub apikey: String,
    pub country: String,
    pub items: Vec<PricingItem>,
}

impl PricingRequest {
    /// Single-item quote request, the only shape the assistant asks for.
    pub fn single_item(
        apikey: impl Into<String>,
        country: impl Into<String>,
        order_item_id: impl Into<String>,
        product_reference: impl Into<String>,
        count: impl Into<String>,
        options: Vec<PricingOption>,
    ) -> Self {
        Self {
            apikey: apikey.into(),
            country: country.into(),
            items: vec![PricingItem {
                reference: order_item_id.into(),
                product: product_reference.into(),
                count: count.into(),
                options,
            }],
        }
    }

    /// Copy that is safe to write to logs.
    pub fn redacted(&self) -> Self {
        Self { apikey: REDACTED.to_string(), ..self.clone() }
    }
}

/// Body of `POST /products/info`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductInfoRequest {
    pub apikey: String,
    pub reference: String,
}

// The remote API takes counts as strings; models frequently emit numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        other => Err(de::Error::custom(format!("expected a string or number count, found {other}"))),
    }
}

/// Extracts the API-level business error (`error.info`) from a decoded quote
/// response, if present.
pub fn business_error_info(body: &Value) -> Option<&Value> {
    body.get("error").and_then(|error| error.get("info"))
}
