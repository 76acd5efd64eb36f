//! Paper-trading brokerage client (Alpaca-compatible REST API).
//!
//! Every call is made with the requesting user's own API keys. Responses
//! are reshaped into the types below; the upstream's string-encoded numbers
//! become `f64`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::BrokerageConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct BrokerageCredentials {
    pub key_id: String,
    pub secret_key: String,
}

#[derive(Clone)]
pub struct BrokerageClient {
    client: HttpClient,
    trading_url: String,
    data_url: String,
}

// MARK: - Reshaped responses

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(deserialize_with = "number_from_any")]
    pub cash: f64,
    #[serde(deserialize_with = "number_from_any")]
    pub buying_power: f64,
    #[serde(deserialize_with = "number_from_any")]
    pub equity: f64,
    #[serde(deserialize_with = "number_from_any")]
    pub portfolio_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    #[serde(deserialize_with = "number_from_any")]
    pub qty: f64,
    pub side: String,
    #[serde(deserialize_with = "number_from_any")]
    pub avg_entry_price: f64,
    #[serde(deserialize_with = "number_from_any")]
    pub current_price: f64,
    #[serde(deserialize_with = "number_from_any")]
    pub market_value: f64,
    #[serde(rename(deserialize = "unrealized_pl"), deserialize_with = "number_from_any")]
    pub unrealized_pnl: f64,
    #[serde(rename(deserialize = "unrealized_plpc"), deserialize_with = "number_from_any")]
    pub unrealized_pnl_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    #[serde(default, deserialize_with = "optional_number_from_any")]
    pub qty: Option<f64>,
    #[serde(default, deserialize_with = "optional_number_from_any")]
    pub filled_qty: Option<f64>,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub time_in_force: String,
    pub status: String,
    #[serde(default, deserialize_with = "optional_number_from_any")]
    pub limit_price: Option<f64>,
    #[serde(default, deserialize_with = "optional_number_from_any")]
    pub filled_avg_price: Option<f64>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub ask_price: f64,
    pub ask_size: f64,
    pub bid_price: f64,
    pub bid_size: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

// MARK: - Requests

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    #[default]
    Day,
    Gtc,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub symbol: String,
    pub qty: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<String>,
}

// MARK: - Upstream wire shapes

#[derive(Debug, Deserialize)]
struct LatestQuoteEnvelope {
    symbol: String,
    quote: UpstreamQuote,
}

#[derive(Debug, Deserialize)]
struct UpstreamQuote {
    #[serde(rename = "ap")]
    ask_price: f64,
    #[serde(rename = "as")]
    ask_size: f64,
    #[serde(rename = "bp")]
    bid_price: f64,
    #[serde(rename = "bs")]
    bid_size: f64,
    #[serde(rename = "t")]
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct BarsEnvelope {
    #[serde(default)]
    bars: Option<Vec<UpstreamBar>>,
}

#[derive(Debug, Deserialize)]
struct UpstreamBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    message: String,
}

impl BrokerageClient {
    pub fn new(config: &BrokerageConfig) -> anyhow::Result<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            trading_url: config.trading_url.trim_end_matches('/').to_string(),
            data_url: config.data_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn account(&self, creds: &BrokerageCredentials) -> Result<Account> {
        let url = format!("{}/v2/account", self.trading_url);
        self.send(self.client.get(url), creds).await
    }

    pub async fn positions(&self, creds: &BrokerageCredentials) -> Result<Vec<Position>> {
        let url = format!("{}/v2/positions", self.trading_url);
        self.send(self.client.get(url), creds).await
    }

    pub async fn orders(&self, creds: &BrokerageCredentials, status: &str) -> Result<Vec<Order>> {
        let url = format!("{}/v2/orders", self.trading_url);
        let request = self.client.get(url).query(&[("status", status)]);
        self.send(request, creds).await
    }

    pub async fn submit_order(&self, creds: &BrokerageCredentials, order: &NewOrder) -> Result<Order> {
        let url = format!("{}/v2/orders", self.trading_url);
        tracing::info!(symbol = %order.symbol, side = ?order.side, qty = %order.qty, "Submitting order");
        self.send(self.client.post(url).json(order), creds).await
    }

    pub async fn latest_quote(&self, creds: &BrokerageCredentials, symbol: &str) -> Result<Quote> {
        let url = format!("{}/v2/stocks/{}/quotes/latest", self.data_url, symbol);
        let envelope: LatestQuoteEnvelope = self.send(self.client.get(url), creds).await?;

        Ok(Quote {
            symbol: envelope.symbol,
            ask_price: envelope.quote.ask_price,
            ask_size: envelope.quote.ask_size,
            bid_price: envelope.quote.bid_price,
            bid_size: envelope.quote.bid_size,
            timestamp: envelope.quote.timestamp,
        })
    }

    pub async fn bars(
        &self,
        creds: &BrokerageCredentials,
        symbol: &str,
        timeframe: &str,
        limit: u32,
    ) -> Result<Vec<Bar>> {
        let url = format!("{}/v2/stocks/{}/bars", self.data_url, symbol);
        let request = self
            .client
            .get(url)
            .query(&[("timeframe", timeframe), ("limit", &limit.to_string())]);
        let envelope: BarsEnvelope = self.send(request, creds).await?;

        Ok(envelope
            .bars
            .unwrap_or_default()
            .into_iter()
            .map(|b| Bar {
                timestamp: b.t,
                open: b.o,
                high: b.h,
                low: b.l,
                close: b.c,
                volume: b.v,
            })
            .collect())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        creds: &BrokerageCredentials,
    ) -> Result<T> {
        let response = request
            .header("APCA-API-KEY-ID", &creds.key_id)
            .header("APCA-API-SECRET-KEY", &creds.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Brokerage API error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_failure(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Brokerage API parse error: {}", e)))
    }
}

fn upstream_failure(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<UpstreamError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string());
    AppError::Upstream(format!("Brokerage API error ({}): {}", status.as_u16(), message))
}

// MARK: - Number helpers

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn into_f64<E: serde::de::Error>(self) -> std::result::Result<f64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(s) => s.trim().parse().map_err(E::custom),
        }
    }
}

fn number_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    NumberOrString::deserialize(deserializer)?.into_f64()
}

fn optional_number_from_any<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<f64>, D::Error> {
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(NumberOrString::into_f64)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_parses_string_numbers() {
        let account: Account = serde_json::from_value(json!({
            "id": "acc-1",
            "status": "ACTIVE",
            "currency": "USD",
            "cash": "10000.50",
            "buying_power": "20001",
            "equity": 10000.5,
            "portfolio_value": "10000.5",
            "pattern_day_trader": false
        }))
        .unwrap();

        assert_eq!(account.cash, 10000.5);
        assert_eq!(account.buying_power, 20001.0);
        assert_eq!(account.equity, 10000.5);
    }

    #[test]
    fn order_tolerates_null_prices() {
        let order: Order = serde_json::from_value(json!({
            "id": "ord-1",
            "symbol": "AAPL",
            "qty": "2",
            "filled_qty": "0",
            "side": "buy",
            "type": "market",
            "time_in_force": "day",
            "status": "accepted",
            "limit_price": null,
            "filled_avg_price": null,
            "submitted_at": "2024-03-01T14:30:00Z"
        }))
        .unwrap();

        assert_eq!(order.qty, Some(2.0));
        assert_eq!(order.limit_price, None);
        assert_eq!(order.order_type, "market");
    }

    #[test]
    fn new_order_omits_missing_limit_price() {
        let order = NewOrder {
            symbol: "MSFT".into(),
            qty: "3".into(),
            side: OrderSide::Sell,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
            limit_price: None,
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["type"], "market");
        assert_eq!(value["side"], "sell");
        assert!(value.get("limit_price").is_none());
    }

    #[test]
    fn upstream_failure_prefers_json_message() {
        let err = upstream_failure(
            StatusCode::FORBIDDEN,
            r#"{"code":40310000,"message":"insufficient buying power"}"#,
        );
        assert!(err.to_string().contains("insufficient buying power"));
        assert!(err.to_string().contains("403"));
    }
}
