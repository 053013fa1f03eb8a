pub mod csv_file;
pub mod sqlite;

use crate::app::Result;
use crate::domain::ExtractedRecord;

pub use csv_file::CsvSink;
pub use sqlite::SqliteSink;

/// Append-only destination for extracted rows.
pub trait RowSink {
    /// Drop previously written rows and start over with the header.
    fn clear_with_header(&self) -> Result<()>;

    fn append_record(&self, record: &ExtractedRecord) -> Result<()>;
}
