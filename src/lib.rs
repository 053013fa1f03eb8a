//! # Pricelens
//!
//! Collects the top shipping-inclusive listings for product codes from a
//! storefront search site by driving a headless browser.
//!
//! ## Architecture
//!
//! ```text
//! codes → Navigator → DisplayModeSwitcher → ListingEnumerator
//!       → FieldExtractor → EnrichmentFetcher → RowSink
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Extract listings for every code in a file
//! pricelens run codes.txt
//!
//! # Write straight to a CSV file
//! pricelens run codes.txt --csv listings.csv
//!
//! # Inspect and export stored rows
//! pricelens list --code 4571697232075
//! pricelens export listings.csv
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires configuration to the
/// row database.
pub mod app;

/// Command-line interface using clap.
///
/// - `run [INPUT]` - Extract listings for product codes
/// - `list [--code]` - Show stored rows
/// - `export <path>` - Write stored rows to CSV
pub mod cli;

/// Configuration loaded from `~/.config/pricelens/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`ProductCode`](domain::ProductCode): Input identifier
/// - [`PriceDisplayMode`](domain::PriceDisplayMode): Price presentation of a listing page
/// - [`ExtractedRecord`](domain::ExtractedRecord): One output row
pub mod domain;

/// Browser automation.
///
/// - [`RenderingEngine`](engine::RenderingEngine): Async trait over page primitives
/// - [`ChromeEngine`](engine::ChromeEngine): chromiumoxide implementation
/// - [`ContextStack`](engine::ContextStack): Scoped secondary browsing contexts
pub mod engine;

/// Listing extraction stages and their orchestration.
pub mod pipeline;

/// Row sinks.
///
/// - [`RowSink`](store::RowSink): Trait for appending rows
/// - [`SqliteSink`](store::SqliteSink): SQLite implementation
/// - [`CsvSink`](store::CsvSink): CSV file implementation
pub mod store;
