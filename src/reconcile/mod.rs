//! Join of broker fills against the trade log.

use crate::logging::reader::LogIndex;
use crate::model::{FilledOrder, MergedRecord};
use std::collections::HashSet;

/// Annotate each order with its trade log line.
///
/// One record per order, in input order. Orders without a client id, or whose id is not
/// in the index, get the "no log entry found" marker. Log entries that match no order
/// are not emitted.
pub fn merge(orders: Vec<FilledOrder>, index: &LogIndex) -> Vec<MergedRecord> {
    orders
        .into_iter()
        .map(|order| {
            let entry = order
                .client_order_id
                .as_deref()
                .and_then(|cloid| index.get(cloid));
            match entry {
                Some(entry) => MergedRecord::matched(order, entry),
                None => MergedRecord::unmatched(order),
            }
        })
        .collect()
}

/// Counts describing one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationSummary {
    pub orders: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Unmatched orders that carried no client id at all.
    pub missing_client_id: usize,
    /// Log entries with no corresponding fill.
    pub log_only: usize,
}

impl ReconciliationSummary {
    pub fn from_merge(records: &[MergedRecord], index: &LogIndex) -> Self {
        let matched = records.iter().filter(|r| r.is_matched()).count();
        let missing_client_id = records
            .iter()
            .filter(|r| r.client_order_id.is_none())
            .count();

        let filled: HashSet<&str> = records
            .iter()
            .filter_map(|r| r.client_order_id.as_deref())
            .collect();
        let log_only = index.keys().filter(|k| !filled.contains(k)).count();

        Self {
            orders: records.len(),
            matched,
            unmatched: records.len() - matched,
            missing_client_id,
            log_only,
        }
    }
}
