//! Listing extraction pipeline.
//!
//! # Architecture
//!
//! ```text
//! ProductCode → Navigator → DisplayModeSwitcher → ListingEnumerator
//!             → FieldExtractor → EnrichmentFetcher → RowSink
//! ```
//!
//! Codes are processed strictly one after another against a single
//! foreground context. A failure is confined to the smallest unit that
//! raised it: a field falls back to its default, a row is rejected, a code
//! is skipped. Only a dead browser or sink ends the run.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pricelens::pipeline::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(&engine, &sink, &config);
//! let report = pipeline.run(&codes).await?;
//! println!("{} rows", report.rows_written());
//! ```

mod config;
pub mod display_mode;
pub mod enrichment;
pub mod extractor;
pub mod listing;
pub mod navigator;
mod report;
mod scripts;

pub use config::PipelineConfig;
pub use display_mode::{DisplayModeSwitcher, ModeSwitchOutcome};
pub use enrichment::EnrichmentFetcher;
pub use extractor::{FieldExtractor, Rejection};
pub use listing::{ListingCandidate, ListingEnumerator};
pub use navigator::Navigator;
pub use report::{CodeOutcome, RunReport};

use tracing::{debug, error, info, warn};

use crate::app::{PricelensError, Result};
use crate::domain::ProductCode;
use crate::engine::RenderingEngine;
use crate::store::RowSink;

/// Sequences the pipeline stages over a list of codes.
pub struct Pipeline<'a, E: RenderingEngine, S: RowSink> {
    engine: &'a E,
    sink: &'a S,
    config: &'a PipelineConfig,
    extractor: FieldExtractor,
}

impl<'a, E: RenderingEngine, S: RowSink> Pipeline<'a, E, S> {
    pub fn new(engine: &'a E, sink: &'a S, config: &'a PipelineConfig) -> Self {
        Self {
            engine,
            sink,
            config,
            extractor: FieldExtractor::new(&config.store_domain),
        }
    }

    /// Process every code in order.
    ///
    /// Per-code problems are recorded in the report; only fatal errors
    /// (browser or sink unusable) are returned.
    pub async fn run(&self, codes: &[ProductCode]) -> Result<RunReport> {
        let mut report = RunReport::default();
        let total = codes.len();

        for (i, code) in codes.iter().enumerate() {
            info!("[{}/{}] Processing code {}", i + 1, total, code);

            let outcome = match self.process_code(code).await {
                Ok(outcome) => outcome,
                Err(PricelensError::NotFound(_)) => {
                    warn!("No product page for code {}; skipping", code);
                    CodeOutcome::Skipped
                }
                Err(e) if e.is_fatal() => {
                    error!("Aborting run at code {}: {}", code, e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Processing code {} failed: {}", code, e);
                    CodeOutcome::Failed(e.to_string())
                }
            };
            report.record(code.clone(), outcome);
        }

        info!(
            "Run complete: {} rows, {} skipped, {} failed",
            report.rows_written(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    /// Run all stages for one code, appending accepted rows to the sink.
    pub async fn process_code(&self, code: &ProductCode) -> Result<CodeOutcome> {
        Navigator::new(self.engine, self.config).open(code).await?;

        let mode = DisplayModeSwitcher::new(self.engine, self.config)
            .switch()
            .await
            .mode;

        let enumerator = ListingEnumerator::new(self.engine, self.config);
        let rows = enumerator.enumerate().await?;
        let base_url = self.engine.current_url().await.ok().flatten();
        let enrichment = EnrichmentFetcher::new(self.engine, self.config);

        let mut accepted = 0;
        let mut rejected = 0;
        for row in rows {
            if accepted >= self.config.max_listings_per_code {
                break;
            }

            let candidate = match enumerator.read_candidate(row, base_url.clone()).await {
                Ok(candidate) => candidate,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!("Unreadable row for {}: {}", code, e);
                    rejected += 1;
                    continue;
                }
            };

            let rank = accepted as u32 + 1;
            let mut record = match self.extractor.extract(code.as_str(), rank, mode, &candidate) {
                Ok(record) => record,
                Err(rejection) => {
                    debug!("Row rejected for {}: {}", code, rejection);
                    rejected += 1;
                    continue;
                }
            };

            record.order_activity = enrichment.fetch(&record.item_url).await?;
            self.sink.append_record(&record)?;
            accepted += 1;
            debug!("Code {} rank {}: {} {}", code, rank, record.shop_name, record.price);
        }

        info!(
            "Code {}: {} rows written, {} rows rejected ({} mode)",
            code, accepted, rejected, mode
        );
        Ok(CodeOutcome::Completed {
            rows: accepted,
            mode,
        })
    }
}
