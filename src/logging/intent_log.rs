use crate::model::Side;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// An order the bot is about to submit, keyed by the client order id it will send.
#[derive(Debug, Serialize, Clone)]
pub struct IntentRecord {
    pub timestamp: String,
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Fresh client order id to attach to an outgoing order.
pub fn new_client_order_id() -> String {
    Uuid::new_v4().to_string()
}

/// Append-only JSONL writer for the trade log.
#[derive(Clone)]
pub struct IntentLogger {
    file: Arc<Mutex<File>>,
    path: PathBuf,
}

impl IntentLogger {
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir_all(dir).context("Failed to create trade log directory")?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open trade log {}", path.display()))?;

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one record as a single line and flush it.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<()> {
        let mut line = serde_json::to_vec(record).context("Failed to serialize trade log record")?;
        line.push(b'\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("Trade log writer lock poisoned"))?;
        file.write_all(&line).context("Failed to write trade log")?;
        file.flush().context("Failed to flush trade log")?;
        Ok(())
    }

    /// Record an order intent under a newly generated client order id and return the id.
    pub fn log_intent(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        strategy: Option<String>,
        notes: Option<String>,
    ) -> Result<String> {
        let client_order_id = new_client_order_id();
        self.append(&IntentRecord {
            timestamp: Utc::now().to_rfc3339(),
            client_order_id: client_order_id.clone(),
            symbol: symbol.to_string(),
            side,
            qty,
            strategy,
            notes,
        })?;
        Ok(client_order_id)
    }
}
