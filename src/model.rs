use crate::constants::{JOIN_KEY_FIELDS, NO_LOG_ENTRY};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown side '{}', expected buy or sell", other)),
        }
    }
}

/// A broker-confirmed execution, as returned by the order endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledOrder {
    pub symbol: String,
    pub side: Side,
    pub filled_qty: Decimal,
    pub avg_fill_price: Option<Decimal>,
    /// Broker-assigned id.
    pub order_id: String,
    /// Caller-assigned id; the join key against the trade log.
    pub client_order_id: Option<String>,
    pub filled_at: Option<DateTime<Utc>>,
}

/// One line of the trade log. Field order of the source line is kept.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogEntry {
    fields: Map<String, Value>,
}

impl LogEntry {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Client order id under the first recognised field name that holds a non-empty
    /// string.
    pub fn join_key(&self) -> Option<&str> {
        JOIN_KEY_FIELDS.iter().find_map(|name| {
            self.fields
                .get(*name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl fmt::Display for LogEntry {
    /// Compact JSON (`,` and `:` without spaces, non-ASCII left as UTF-8), as embedded in
    /// the merged table. Numbers keep their source text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.fields).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// A filled order annotated with its trade log line. Field order here is the column
/// order of the merged table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub symbol: String,
    pub side: Side,
    pub filled_qty: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub filled_at: Option<DateTime<Utc>>,
    /// Serialized log line, or [`NO_LOG_ENTRY`].
    pub log_entry: String,
    #[serde(skip)]
    matched: bool,
}

impl MergedRecord {
    pub fn matched(order: FilledOrder, entry: &LogEntry) -> Self {
        Self::build(order, entry.to_string(), true)
    }

    pub fn unmatched(order: FilledOrder) -> Self {
        Self::build(order, NO_LOG_ENTRY.to_string(), false)
    }

    fn build(order: FilledOrder, log_entry: String, matched: bool) -> Self {
        Self {
            symbol: order.symbol,
            side: order.side,
            filled_qty: order.filled_qty,
            avg_fill_price: order.avg_fill_price,
            order_id: order.order_id,
            client_order_id: order.client_order_id,
            filled_at: order.filled_at,
            log_entry,
            matched,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }
}
