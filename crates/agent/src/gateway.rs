//! Cloudprinter CloudCore client.
//!
//! Every call is one-shot: no retries, no caching. Failures are folded into the
//! uniform `{"error": ...}` / `{"user_error": ...}` mappings the assistant reads,
//! and logged before they are returned.

use std::error::Error as _;
use std::time::Duration;

use printchat_core::config::CloudprinterConfig;
use printchat_core::domain::pricing::{business_error_info, PricingQuery, ProductInfoRequest};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

pub const PRODUCT_INFO_PATH: &str = "products/info";
pub const ORDER_QUOTE_PATH: &str = "orders/quote";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Json decode error: {0}")]
    Decode(String),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl GatewayError {
    pub fn into_payload(self) -> Value {
        json!({ "error": self.to_string() })
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        let details = describe(&error);
        if error.is_builder() {
            Self::Unexpected(details)
        } else if error.is_decode() {
            Self::Decode(details)
        } else {
            Self::Network(details)
        }
    }
}

/// A decoded quote response: either a quote (passed through whole) or the
/// API's business-level rejection.
#[derive(Clone, Debug, PartialEq)]
pub enum PricingOutcome {
    Quote(Value),
    UserError(Value),
}

impl PricingOutcome {
    pub fn into_payload(self) -> Value {
        match self {
            Self::Quote(body) => body,
            Self::UserError(info) => json!({ "user_error": info }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CloudprinterGateway {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl CloudprinterGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .build()
            .map_err(|error| GatewayError::Unexpected(describe(&error)))?;
        Ok(Self { client, base_url: base_url.into(), api_key, timeout })
    }

    pub fn from_config(config: &CloudprinterConfig) -> Result<Self, GatewayError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    // A missing key is sent as an empty string and left for the API to reject.
    fn api_key(&self) -> String {
        self.api_key.as_ref().map(|key| key.expose_secret().to_string()).unwrap_or_default()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post_json<B>(&self, path: &str, body: &B) -> Result<Value, GatewayError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        let bytes = response.bytes().await.map_err(GatewayError::from_reqwest)?;
        serde_json::from_slice::<Value>(&bytes).map_err(|error| GatewayError::Decode(error.to_string()))
    }

    pub async fn try_product_info(&self, reference: &str) -> Result<Value, GatewayError> {
        let request = ProductInfoRequest { apikey: self.api_key(), reference: reference.to_string() };
        self.post_json(PRODUCT_INFO_PATH, &request).await
    }

    /// Product details wrapped in a single-element list, or the uniform error
    /// mapping. The reference is forwarded as-is.
    pub async fn get_product_info_by_reference(&self, reference: &str) -> Value {
        match self.try_product_info(reference).await {
            Ok(body) => Value::Array(vec![body]),
            Err(gateway_error) => {
                error!(
                    event_name = "gateway.cloudprinter.product_info_failed",
                    operation = "get_product_info_by_reference",
                    reference,
                    error = %gateway_error,
                    "product info request failed"
                );
                gateway_error.into_payload()
            }
        }
    }

    pub async fn try_pricing(&self, query: PricingQuery) -> Result<PricingOutcome, GatewayError> {
        let request = query.into_request(self.api_key());
        debug!(
            event_name = "gateway.cloudprinter.quote_request",
            body = %loggable_body(&request.redacted()),
            "sending quote request"
        );

        let body = self.post_json(ORDER_QUOTE_PATH, &request).await?;
        if let Some(info) = business_error_info(&body) {
            return Ok(PricingOutcome::UserError(info.clone()));
        }
        Ok(PricingOutcome::Quote(body))
    }

    /// Full decoded quote, `{"user_error": info}` for API-level rejections, or
    /// the uniform error mapping for transport and decode failures.
    pub async fn fetch_pricing_info(&self, query: PricingQuery) -> Value {
        match self.try_pricing(query).await {
            Ok(outcome) => outcome.into_payload(),
            Err(gateway_error) => {
                error!(
                    event_name = "gateway.cloudprinter.quote_failed",
                    operation = "fetch_pricing_info",
                    error = %gateway_error,
                    "quote request failed"
                );
                gateway_error.into_payload()
            }
        }
    }
}

fn loggable_body<B: Serialize>(body: &B) -> String {
    serde_json::to_string(body).unwrap_or_else(|error| format!("<unserializable body: {error}>"))
}

// reqwest's Display omits the cause (timeouts, refused connections).
fn describe(error: &reqwest::Error) -> String {
    let mut details = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        details.push_str(": ");
        details.push_str(&cause.to_string());
        source = cause.source();
    }
    details
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::{routing::post, Json, Router};
    use printchat_core::domain::pricing::{PricingOption, PricingQuery};
    use serde_json::{json, Value};
    use tracing::subscriber::DefaultGuard;
    use tracing_subscriber::fmt::MakeWriter;

    use super::{loggable_body, CloudprinterGateway};

    /// In-memory sink for formatted log lines.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("log buffer lock")).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log buffer lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    // Scoped to the current thread; `#[tokio::test]` runs on a single thread.
    fn capture_logs() -> (CapturedLogs, DefaultGuard) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let address = listener.local_addr().expect("local address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        format!("http://{address}")
    }

    fn gateway(base_url: &str, timeout: Duration) -> CloudprinterGateway {
        CloudprinterGateway::new(base_url, Some("cp-test-key".to_string().into()), timeout)
            .expect("gateway should build")
    }

    fn query() -> PricingQuery {
        PricingQuery {
            country: "NL".to_string(),
            reference: "textbook_pb_a4_p_bw".to_string(),
            count: "1".to_string(),
            options: vec![PricingOption {
                option_type: "total_pages".to_string(),
                count: "120".to_string(),
            }],
            order_item_id: None,
        }
    }

    #[tokio::test]
    async fn product_info_posts_key_and_reference_and_wraps_response() {
        let router = Router::new().route(
            "/products/info",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "reference": body["reference"],
                    "key_seen": body["apikey"],
                    "name": "Textbook A4"
                }))
            }),
        );
        let base_url = serve(router).await;

        let result = gateway(&base_url, Duration::from_secs(5))
            .get_product_info_by_reference("textbook_pb_a4_p_bw")
            .await;

        assert_eq!(
            result,
            json!([{
                "reference": "textbook_pb_a4_p_bw",
                "key_seen": "cp-test-key",
                "name": "Textbook A4"
            }])
        );
    }

    #[tokio::test]
    async fn pricing_returns_the_full_decoded_quote() {
        let router = Router::new().route(
            "/orders/quote",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "price": "17.50",
                    "currency": "EUR",
                    "echo_items": body["items"],
                    "shipments": [{"quotes": [{"quote": "q-1", "price": "4.95"}]}]
                }))
            }),
        );
        let base_url = serve(router).await;

        let result = gateway(&base_url, Duration::from_secs(5)).fetch_pricing_info(query()).await;

        assert_eq!(result["price"], "17.50");
        assert_eq!(result["shipments"][0]["quotes"][0]["quote"], "q-1");
        assert_eq!(
            result["echo_items"],
            json!([{
                "reference": "ref_id_1234567",
                "product": "textbook_pb_a4_p_bw",
                "count": "1",
                "options": [{"type": "total_pages", "count": "120"}]
            }])
        );
    }

    #[tokio::test]
    async fn pricing_business_error_becomes_user_error() {
        let router = Router::new().route(
            "/orders/quote",
            post(|| async { Json(json!({"error": {"code": 400, "info": "X"}})) }),
        );
        let base_url = serve(router).await;

        let result = gateway(&base_url, Duration::from_secs(5)).fetch_pricing_info(query()).await;

        assert_eq!(result, json!({"user_error": "X"}));
    }

    #[tokio::test]
    async fn pricing_timeout_is_reported_as_network_error_and_logged() {
        let router = Router::new().route(
            "/orders/quote",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"price": "1.00"}))
            }),
        );
        let base_url = serve(router).await;
        let (logs, _guard) = capture_logs();

        let result =
            gateway(&base_url, Duration::from_millis(100)).fetch_pricing_info(query()).await;

        let message = result["error"].as_str().expect("error mapping");
        assert!(message.starts_with("Network error: "), "unexpected message: {message}");
        assert_eq!(result.as_object().map(|object| object.len()), Some(1));

        let logged = logs.contents();
        let failure = logged
            .lines()
            .find(|line| line.contains("gateway.cloudprinter.quote_failed"))
            .unwrap_or_else(|| panic!("quote failure was not logged:\n{logged}"));
        assert!(failure.contains("ERROR"), "failure logged below error level: {failure}");
        assert!(failure.contains("Network error: "), "failure log lacks details: {failure}");
    }

    #[tokio::test]
    async fn quote_request_log_never_carries_the_api_key() {
        let router = Router::new()
            .route("/orders/quote", post(|| async { Json(json!({"price": "2.00"})) }));
        let base_url = serve(router).await;
        let (logs, _guard) = capture_logs();

        gateway(&base_url, Duration::from_secs(5)).fetch_pricing_info(query()).await;

        let logged = logs.contents();
        assert!(logged.contains("gateway.cloudprinter.quote_request"), "request not logged:\n{logged}");
        assert!(logged.contains("textbook_pb_a4_p_bw"));
        assert!(!logged.contains("cp-test-key"), "api key leaked into logs:\n{logged}");
    }

    #[tokio::test]
    async fn refused_connection_is_reported_as_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let address = listener.local_addr().expect("local address");
        drop(listener);

        let result = gateway(&format!("http://{address}"), Duration::from_secs(2))
            .get_product_info_by_reference("poster_a2")
            .await;

        let message = result["error"].as_str().expect("error mapping");
        assert!(message.starts_with("Network error: "), "unexpected message: {message}");
    }

    #[tokio::test]
    async fn non_json_body_is_reported_as_decode_error() {
        let router = Router::new().route("/products/info", post(|| async { "<html>bad gateway</html>" }));
        let base_url = serve(router).await;

        let result = gateway(&base_url, Duration::from_secs(5))
            .get_product_info_by_reference("poster_a2")
            .await;

        let message = result["error"].as_str().expect("error mapping");
        assert!(message.starts_with("Json decode error: "), "unexpected message: {message}");
    }

    #[tokio::test]
    async fn malformed_base_url_is_reported_as_unexpected_error() {
        let result = gateway("not a url", Duration::from_secs(1))
            .get_product_info_by_reference("poster_a2")
            .await;

        let message = result["error"].as_str().expect("error mapping");
        assert!(message.starts_with("Unexpected error: "), "unexpected message: {message}");
    }

    #[test]
    fn logged_quote_body_never_contains_the_api_key() {
        let request = query().into_request("cp-test-key");
        let logged = loggable_body(&request.redacted());

        assert!(!logged.contains("cp-test-key"));
        assert!(logged.contains("\"apikey\":\"<redacted>\""));
        assert!(logged.contains("textbook_pb_a4_p_bw"));
    }
}
