//! HttpDelivery - POSTs each batch as one JSON document

use std::collections::HashMap;
use std::time::Duration;

use contracts::{Batch, ContractError, Delivery, DeliveryReceipt};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

/// Longest response body kept in a rejection error
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Configuration for HttpDelivery
#[derive(Debug, Clone)]
pub struct HttpDeliveryConfig {
    pub url: Url,
    /// Sent as the `apikey` header
    pub api_key: Option<String>,
    /// Sent verbatim as the `Authorization` header
    pub authorization: Option<String>,
    pub tenant_field: String,
    pub actor_field: String,
    pub records_field: String,
    pub timeout: Duration,
}

impl HttpDeliveryConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>, timeout: Duration) -> Result<Self, String> {
        let url_str = params
            .get("url")
            .ok_or_else(|| "missing 'url' parameter".to_string())?;
        let url = Url::parse(url_str).map_err(|e| format!("invalid url '{}': {}", url_str, e))?;

        let field = |key: &str, default: &str| {
            params
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            url,
            api_key: params.get("api_key").cloned(),
            authorization: params.get("authorization").cloned(),
            tenant_field: field("tenant_field", "agency_id"),
            actor_field: field("actor_field", "created_by"),
            records_field: field("records_field", "candidates"),
            timeout,
        })
    }
}

/// Delivery that POSTs `{tenant, actor, records}` documents over HTTP
pub struct HttpDelivery {
    name: String,
    config: HttpDeliveryConfig,
    client: reqwest::Client,
    headers: HeaderMap,
}

impl HttpDelivery {
    /// Create a new HttpDelivery with its own client
    pub fn new(name: impl Into<String>, config: HttpDeliveryConfig) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("batch-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ContractError::Other(format!("failed to build http client: {e}")))?;
        Self::with_client(name, config, client)
    }

    /// Create with a caller-provided client (shared pools, proxies)
    pub fn with_client(
        name: impl Into<String>,
        config: HttpDeliveryConfig,
        client: reqwest::Client,
    ) -> Result<Self, ContractError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some(api_key) = &config.api_key {
            headers.insert(
                HeaderName::from_static("apikey"),
                header_value("api_key", api_key)?,
            );
        }
        if let Some(authorization) = &config.authorization {
            headers.insert(
                header::AUTHORIZATION,
                header_value("authorization", authorization)?,
            );
        }

        Ok(Self {
            name: name.into(),
            config,
            client,
            headers,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, ContractError> {
        let config = HttpDeliveryConfig::from_params(params, timeout)
            .map_err(|e| ContractError::config_validation("delivery.params", e))?;
        Self::new(name, config)
    }

    pub fn url(&self) -> &Url {
        &self.config.url
    }

    fn body(&self, batch: &Batch<'_>) -> Value {
        let mut body = Map::new();
        body.insert(
            self.config.tenant_field.clone(),
            Value::from(batch.tenant.tenant_id.as_str()),
        );
        body.insert(
            self.config.actor_field.clone(),
            Value::from(batch.tenant.actor_id.as_str()),
        );
        body.insert(
            self.config.records_field.clone(),
            Value::Array(batch.records.iter().map(|r| r.payload.clone()).collect()),
        );
        Value::Object(body)
    }

    fn transport_error(&self, err: reqwest::Error) -> ContractError {
        if err.is_timeout() {
            ContractError::DeliveryTimeout {
                target: self.name.clone(),
                timeout_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            ContractError::delivery_transport(&self.name, err.to_string())
        }
    }
}

fn header_value(param: &str, value: &str) -> Result<HeaderValue, ContractError> {
    HeaderValue::from_str(value).map_err(|e| {
        ContractError::config_validation(format!("delivery.params.{param}"), e.to_string())
    })
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

impl Delivery for HttpDelivery {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_delivery_deliver",
        skip(self, batch),
        fields(delivery = %self.name, tenant = %batch.tenant, batch = batch.index + 1, total = batch.total)
    )]
    async fn deliver(&self, batch: Batch<'_>) -> Result<DeliveryReceipt, ContractError> {
        let response = self
            .client
            .post(self.config.url.clone())
            .headers(self.headers.clone())
            .json(&self.body(&batch))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::OK {
            debug!(records = batch.len(), "Batch accepted");
            return Ok(DeliveryReceipt::with_status(status.as_u16()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(ContractError::delivery_rejected(
            &self.name,
            status.as_u16(),
            truncate_chars(&body, MAX_ERROR_BODY_CHARS),
        ))
    }
}
