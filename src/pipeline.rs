//! One reconciliation run: read the trade log, fetch fills, merge, write the table.

use crate::broker::fetcher::OrderFetcher;
use crate::broker::{FetchWindow, OrdersApi};
use crate::config::ReconcileSettings;
use crate::error::ReconcileError;
use crate::logging::reader::{read_log, LogReadStats};
use crate::reconcile::{merge, ReconciliationSummary};
use crate::reporter::csv_table::write_table;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub window: FetchWindow,
    pub log_stats: LogReadStats,
    pub summary: ReconciliationSummary,
    /// Where the table was written; `None` when there was nothing to emit.
    pub output: Option<PathBuf>,
}

/// Run the pipeline against `api`. The caller owns the client.
///
/// The table is only written after every page was fetched and merged, so a failed fetch
/// leaves the previous output untouched.
pub async fn run_pipeline<A: OrdersApi + ?Sized>(
    api: &A,
    settings: &ReconcileSettings,
) -> Result<PipelineOutcome, ReconcileError> {
    let window = settings.window.resolve()?;
    info!(
        log = %settings.log_path.display(),
        after = %window.after,
        until = %window.until,
        "Starting reconciliation"
    );

    let index = read_log(&settings.log_path)?;
    let orders = OrderFetcher::new(api)
        .with_page_size(settings.page_size)
        .fetch_filled_orders(&window)
        .await?;

    let records = merge(orders, &index);
    let summary = ReconciliationSummary::from_merge(&records, &index);
    info!(
        orders = summary.orders,
        matched = summary.matched,
        unmatched = summary.unmatched,
        log_only = summary.log_only,
        "Reconciled fills against trade log"
    );

    let written = write_table(&records, &settings.output_path)?;
    let output = written.then(|| settings.output_path.clone());
    match &output {
        Some(path) => info!(path = %path.display(), rows = records.len(), "Merged table written"),
        None => info!("No filled orders in window, nothing written"),
    }

    Ok(PipelineOutcome {
        window,
        log_stats: index.stats(),
        summary,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::fake::{order, ScriptedOrdersApi};
    use crate::broker::{ApiError, OrdersPage};
    use crate::config::WindowSpec;
    use chrono::{TimeZone, Utc};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    fn settings(dir: &Path) -> ReconcileSettings {
        ReconcileSettings {
            log_path: dir.join("trade_log.jsonl"),
            output_path: dir.join("merged.csv"),
            window: WindowSpec::TrailingDays(30),
            page_size: 500,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_matched_and_unmatched_fills_end_to_end() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        std::fs::write(
            &settings.log_path,
            "{\"client_order_id\":\"c1\",\"strategy\":\"swing\"}\n{\"broken\n",
        )
        .unwrap();

        let api = ScriptedOrdersApi::new(vec![Ok(OrdersPage {
            orders: vec![
                order("o1", Some("c1"), "AAPL"),
                order("o2", Some("c2"), "MSFT"),
            ],
            next: None,
        })]);

        let outcome = run_pipeline(&api, &settings).await.unwrap();

        assert_eq!(outcome.output.as_deref(), Some(settings.output_path.as_path()));
        assert_eq!(outcome.summary.matched, 1);
        assert_eq!(outcome.summary.unmatched, 1);
        assert_eq!(outcome.log_stats.malformed, 1);

        let content = std::fs::read_to_string(&settings.output_path).unwrap();
        let lines: Vec<&str> = content.trim_end().split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(",o1,c1,"));
        assert!(lines[1].contains(r#""{""client_order_id"":""c1"",""strategy"":""swing""}""#));
        assert!(lines[2].contains(",o2,c2,"));
        assert!(lines[2].ends_with("no log entry found"));
    }

    #[tokio::test]
    async fn test_no_fills_writes_no_file() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        let api = ScriptedOrdersApi::new(vec![Ok(OrdersPage::default())]);

        let outcome = run_pipeline(&api, &settings).await.unwrap();

        assert!(outcome.output.is_none());
        assert_eq!(outcome.summary.orders, 0);
        assert!(!settings.output_path.exists());
    }

    #[tokio::test]
    async fn test_empty_window_skips_broker_and_output() {
        let dir = tempdir().unwrap();
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let settings = ReconcileSettings {
            window: WindowSpec::Between { after: t, until: t },
            ..settings(dir.path())
        };
        let api = ScriptedOrdersApi::default();

        let outcome = run_pipeline(&api, &settings).await.unwrap();

        assert!(api.requests().is_empty());
        assert!(outcome.output.is_none());
        assert!(!settings.output_path.exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_previous_output() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        std::fs::write(&settings.output_path, "previous run\n").unwrap();

        let api = ScriptedOrdersApi::new(vec![
            Ok(OrdersPage {
                orders: vec![order("o1", Some("c1"), "AAPL")],
                next: Some("https://broker.test/v2/orders?page=1".parse().unwrap()),
            }),
            Err(ApiError::Status {
                status: 401,
                message: "unauthorized".into(),
            }),
        ]);

        let err = run_pipeline(&api, &settings).await.unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::RemoteFetch {
                page: 1,
                status: 401,
                ..
            }
        ));
        assert_eq!(
            std::fs::read_to_string(&settings.output_path).unwrap(),
            "previous run\n"
        );
    }

    #[tokio::test]
    async fn test_missing_log_marks_every_fill_unmatched() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        let api = ScriptedOrdersApi::with_page_sizes(&[2, 1]);

        let outcome = run_pipeline(&api, &settings).await.unwrap();

        assert_eq!(outcome.summary.orders, 3);
        assert_eq!(outcome.summary.unmatched, 3);
        assert_eq!(api.requests().len(), 2);
    }
}
