//! Console renderer for the end-of-run report.

use crate::pipeline::PipelineOutcome;

/// Console renderer for reconciliation run reports.
pub struct ConsoleRenderer;

impl ConsoleRenderer {
    /// Render a complete run report to stdout.
    pub fn render(outcome: &PipelineOutcome) {
        println!();
        println!("{}", "=".repeat(60));
        println!(" FILL RECONCILIATION REPORT");
        println!("{}", "=".repeat(60));

        println!();
        println!("Window:      {} -> {}", outcome.window.after_param(), outcome.window.until_param());

        println!();
        println!("{}", "-".repeat(60));
        Self::render_log_stats(outcome);

        println!();
        println!("{}", "-".repeat(60));
        Self::render_summary(outcome);

        println!();
        println!("{}", "=".repeat(60));
        println!("{}", Self::output_line(outcome));
        println!();
    }

    fn render_log_stats(outcome: &PipelineOutcome) {
        let stats = &outcome.log_stats;
        println!("TRADE LOG");
        println!("Lines:       {}", stats.lines);
        println!("Malformed:   {}", stats.malformed);
        println!("No join key: {}", stats.missing_key);
        println!("Overwritten: {}", stats.overwritten);
    }

    fn render_summary(outcome: &PipelineOutcome) {
        let s = &outcome.summary;
        println!("FILLS");
        println!("Orders:      {}", s.orders);
        println!("Matched:     {}", s.matched);
        println!("Unmatched:   {} ({} without client id)", s.unmatched, s.missing_client_id);
        println!("Log only:    {}", s.log_only);
    }

    fn output_line(outcome: &PipelineOutcome) -> String {
        match &outcome.output {
            Some(path) => format!("Merged data written to {}", path.display()),
            None => "No filled orders in window; nothing written".to_string(),
        }
    }
}
