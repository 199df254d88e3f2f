//! reqwest client for the Alpaca order endpoint.

use super::{ApiError, OrdersApi, OrdersPage, PageRequest};
use crate::config::BrokerConfig;
use crate::constants::{API_KEY_HEADER, API_SECRET_HEADER, ORDERS_PATH};
use crate::error::ReconcileError;
use crate::model::{FilledOrder, Side};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Order as returned by `GET /v2/orders`. Fields we do not use are ignored.
#[derive(Debug, Clone, Deserialize)]
struct AlpacaOrder {
    id: String,
    #[serde(default)]
    client_order_id: Option<String>,
    symbol: String,
    side: Side,
    filled_qty: Decimal,
    #[serde(default)]
    filled_avg_price: Option<Decimal>,
    #[serde(default)]
    filled_at: Option<DateTime<Utc>>,
}

impl From<AlpacaOrder> for FilledOrder {
    fn from(o: AlpacaOrder) -> Self {
        FilledOrder {
            symbol: o.symbol,
            side: o.side,
            filled_qty: o.filled_qty,
            avg_fill_price: o.filled_avg_price,
            order_id: o.id,
            client_order_id: o.client_order_id.filter(|id| !id.is_empty()),
            filled_at: o.filled_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AlpacaErrorResponse {
    message: String,
}

/// Owns one HTTP connection pool for the lifetime of a run.
pub struct AlpacaOrdersClient {
    client: Client,
    orders_url: Url,
    api_key: String,
    api_secret: String,
}

impl AlpacaOrdersClient {
    pub fn new(config: &BrokerConfig) -> Result<Self, ReconcileError> {
        let base = config.base_url.trim_end_matches('/');
        let orders_url = Url::parse(&format!("{base}{ORDERS_PATH}")).map_err(|e| {
            ReconcileError::ValidationError(format!("Invalid API base URL '{}': {}", base, e))
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReconcileError::ValidationError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            orders_url,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    pub fn orders_url(&self) -> &Url {
        &self.orders_url
    }
}

#[async_trait]
impl OrdersApi for AlpacaOrdersClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<OrdersPage, ApiError> {
        let builder = match request {
            PageRequest::First { window, limit } => {
                self.client.get(self.orders_url.clone()).query(&[
                    ("status", "filled".to_string()),
                    ("after", window.after_param()),
                    ("until", window.until_param()),
                    ("direction", "asc".to_string()),
                    ("limit", limit.to_string()),
                ])
            }
            PageRequest::Next(url) => self.client.get(url.clone()),
        };

        let response = builder
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_SECRET_HEADER, &self.api_secret)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<AlpacaErrorResponse>(&body) {
                Ok(err) => err.message,
                Err(_) => body,
            };
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let next = next_link(response.headers(), response.url());
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let orders: Vec<AlpacaOrder> =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;

        Ok(OrdersPage {
            orders: orders.into_iter().map(FilledOrder::from).collect(),
            next,
        })
    }
}

/// Target of the `rel="next"` entry in the `Link` headers, resolved against `base`.
fn next_link(headers: &HeaderMap, base: &Url) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(next_target)
        .and_then(|target| base.join(target).ok())
}

/// `<url>; rel="next"` -> `url`
fn next_target(link: &str) -> Option<&str> {
    let mut parts = link.split(';');
    let target = parts
        .next()?
        .trim()
        .strip_prefix('<')?
        .strip_suffix('>')?;

    let is_next = parts.any(|param| {
        let param = param.trim();
        param
            .strip_prefix("rel=")
            .map(|rel| {
                rel.trim_matches('"')
                    .split_whitespace()
                    .any(|r| r.eq_ignore_ascii_case("next"))
            })
            .unwrap_or(false)
    });

    is_next.then_some(target)
}
