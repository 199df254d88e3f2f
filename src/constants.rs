//! Central defaults for fill-reconciler.
//!
//! Values that describe the broker contract or the trade log layout live here so the
//! pipeline modules stay free of magic strings.

use std::time::Duration;

// =============================================================================
// BROKER
// =============================================================================

/// Paper trading endpoint, used when APCA_API_BASE_URL is unset.
pub const DEFAULT_API_BASE_URL: &str = "https://paper-api.alpaca.markets";

/// Order listing endpoint, relative to the base URL.
pub const ORDERS_PATH: &str = "/v2/orders";

pub const API_KEY_HEADER: &str = "APCA-API-KEY-ID";
pub const API_SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

/// Records per page requested from the order endpoint (also the broker maximum).
pub const DEFAULT_PAGE_SIZE: u32 = 500;
pub const MAX_PAGE_SIZE: u32 = 500;

/// Length of the default fetch window, ending at invocation time.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// TRADE LOG
// =============================================================================

pub const DEFAULT_TRADE_LOG_PATH: &str = "logs/trade_log.jsonl";

/// Join key field names, in lookup priority order (current name first).
pub const JOIN_KEY_FIELDS: [&str; 2] = ["client_order_id", "client_orderID"];

// =============================================================================
// OUTPUT
// =============================================================================

/// File name of the merged table, written next to the trade log by default.
pub const MERGED_OUTPUT_FILE: &str = "filled_trades_merged.csv";

/// Value of `log_entry` for orders without a matching log line.
pub const NO_LOG_ENTRY: &str = "no log entry found";
