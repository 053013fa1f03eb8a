use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::warn;

use crate::app::{AppContext, Result};
use crate::domain::ProductCode;
use crate::engine::ChromeEngine;
use crate::pipeline::{CodeOutcome, Pipeline, RunReport};
use crate::store::{CsvSink, RowSink};

/// Read newline-separated codes from `input`, or stdin when it is `None`.
pub fn read_codes(input: Option<&Path>) -> Result<Vec<ProductCode>> {
    let mut content = String::new();
    match input {
        Some(path) => {
            File::open(path)?.read_to_string(&mut content)?;
        }
        None => {
            std::io::stdin().read_to_string(&mut content)?;
        }
    }
    Ok(ProductCode::parse_list(&content))
}

pub async fn run(
    ctx: &AppContext,
    input: Option<&Path>,
    csv: Option<&Path>,
    no_clear: bool,
    headed: bool,
) -> Result<()> {
    let codes = read_codes(input)?;
    if codes.is_empty() {
        println!("No product codes to process");
        return Ok(());
    }

    let clear = ctx.config.sink.clear_before_run && !no_clear;
    let report = match csv {
        Some(path) => {
            let sink = CsvSink::open(path)?;
            run_with_sink(ctx, &sink, &codes, clear, headed).await?
        }
        None => run_with_sink(ctx, &*ctx.store, &codes, clear, headed).await?,
    };

    print_report(&report);
    Ok(())
}

async fn run_with_sink<S: RowSink>(
    ctx: &AppContext,
    sink: &S,
    codes: &[ProductCode],
    clear: bool,
    headed: bool,
) -> Result<RunReport> {
    if clear {
        sink.clear_with_header()?;
    }

    let mut browser = ctx.config.browser.clone();
    if headed {
        browser.headless = false;
    }

    println!("Processing {} codes...", codes.len());
    let engine = ChromeEngine::launch(&browser).await?;
    let result = Pipeline::new(&engine, sink, &ctx.config.pipeline)
        .run(codes)
        .await;

    if let Err(e) = engine.shutdown().await {
        warn!("Browser did not shut down cleanly: {}", e);
    }
    result
}

fn print_report(report: &RunReport) {
    for (code, outcome) in &report.outcomes {
        match outcome {
            CodeOutcome::Completed { rows, mode } => {
                println!("  {} {} rows ({})", code, rows, mode);
            }
            CodeOutcome::Skipped => println!("  {} no product page", code),
            CodeOutcome::Failed(e) => eprintln!("  {} failed: {}", code, e),
        }
    }

    println!(
        "Run complete: {} rows, {} skipped, {} failed, {} degraded",
        report.rows_written(),
        report.skipped(),
        report.failed(),
        report.degraded()
    );
}

pub fn list_records(ctx: &AppContext, code: Option<&str>) -> Result<()> {
    let records = ctx.store.list_records(code)?;

    if records.is_empty() {
        println!("No rows");
        return Ok(());
    }

    for record in records {
        println!(
            "{} #{} {} | {} | {} {} | {}",
            record.code,
            record.rank,
            record.product_name,
            record.shop_name,
            record.price,
            record.postage_label,
            record.order_activity
        );
    }

    Ok(())
}

pub fn export(ctx: &AppContext, path: &Path) -> Result<()> {
    let records = ctx.store.list_records(None)?;
    CsvSink::write_all(File::create(path)?, &records)?;
    println!("Exported {} rows to {}", records.len(), path.display());
    Ok(())
}
