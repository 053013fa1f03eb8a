use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use csv::Writer;

use crate::app::{PricelensError, Result};
use crate::domain::{ExtractedRecord, HEADER};
use crate::store::RowSink;

/// CSV file sink, one 13-column row per record.
pub struct CsvSink {
    path: PathBuf,
    writer: Mutex<Writer<File>>,
}

impl CsvSink {
    /// Open `path` for appending, creating it if needed. An empty file gets
    /// the header row first.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = Writer::from_writer(file);
        if is_empty {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Writer<File>>> {
        self.writer
            .lock()
            .map_err(|e| PricelensError::Sink(format!("CSV writer poisoned: {}", e)))
    }

    /// Write rows with a leading header to any writer.
    pub fn write_all<W: std::io::Write>(out: W, records: &[ExtractedRecord]) -> Result<()> {
        let mut writer = Writer::from_writer(out);
        writer.write_record(HEADER)?;
        for record in records {
            writer.write_record(record.to_row())?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl RowSink for CsvSink {
    fn clear_with_header(&self) -> Result<()> {
        let mut writer = self.lock()?;
        let file = File::create(&self.path)?;
        *writer = Writer::from_writer(file);
        writer.write_record(HEADER)?;
        writer.flush()?;
        Ok(())
    }

    fn append_record(&self, record: &ExtractedRecord) -> Result<()> {
        let mut writer = self.lock()?;
        writer.write_record(record.to_row())?;
        writer.flush()?;
        Ok(())
    }
}
