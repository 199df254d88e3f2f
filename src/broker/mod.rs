//! Broker order retrieval.
//!
//! [`OrdersApi`] is the seam between pagination logic and the wire: the fetcher drives
//! page requests, an implementation performs one HTTP round trip per request.

pub mod alpaca;
pub mod fetcher;

use crate::error::ReconcileError;
use crate::model::FilledOrder;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::Url;
use thiserror::Error;

/// Closed-open time range of fills to retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub after: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl FetchWindow {
    pub fn new(after: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { after, until }
    }

    /// The `days` days ending now. "Now" is read once here, never per page.
    pub fn trailing_days(days: i64) -> Result<Self, ReconcileError> {
        Duration::try_days(days)
            .and_then(|length| Self::ending_at(Utc::now(), length))
            .ok_or_else(|| {
                ReconcileError::ValidationError(format!(
                    "window of {} days is out of range",
                    days
                ))
            })
    }

    /// `None` when the start of the window is not representable.
    pub fn ending_at(until: DateTime<Utc>, length: Duration) -> Option<Self> {
        let after = until.checked_sub_signed(length)?;
        Some(Self { after, until })
    }

    pub fn is_empty(&self) -> bool {
        self.after >= self.until
    }

    pub fn after_param(&self) -> String {
        self.after.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn until_param(&self) -> String {
        self.until.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// Initial query built from the window.
    First { window: FetchWindow, limit: u32 },
    /// Locator taken from the previous response, requested verbatim.
    Next(Url),
}

#[derive(Debug, Clone, Default)]
pub struct OrdersPage {
    pub orders: Vec<FilledOrder>,
    pub next: Option<Url>,
}

/// Failure of a single page request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport: {0}")]
    Transport(String),
    #[error("decode: {0}")]
    Decode(String),
}

impl ApiError {
    /// Attach the index of the page that failed.
    pub fn at_page(self, page: usize) -> ReconcileError {
        match self {
            ApiError::Status { status, message } => ReconcileError::RemoteFetch {
                page,
                status,
                message,
            },
            ApiError::Transport(message) => ReconcileError::Transport { page, message },
            ApiError::Decode(message) => ReconcileError::Decode { page, message },
        }
    }
}

#[async_trait]
pub trait OrdersApi: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<OrdersPage, ApiError>;
}
