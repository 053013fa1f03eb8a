use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{PricelensError, Result};
use crate::domain::{ExtractedRecord, PriceDisplayMode};
use crate::store::RowSink;

const SELECT_COLUMNS: &str = "code, product_name, rank, shop_name, price, postage_label,
     point_percent_label, point_value, quality_delivery, bonus, review_count,
     order_activity, item_url, display_mode, scraped_at";

pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            PricelensError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| PricelensError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ExtractedRecord> {
        Ok(ExtractedRecord {
            code: row.get(0)?,
            product_name: row.get(1)?,
            rank: row.get(2)?,
            shop_name: row.get(3)?,
            price: row.get(4)?,
            postage_label: row.get(5)?,
            point_percent_label: row.get(6)?,
            point_value: row.get(7)?,
            quality_delivery: row.get(8)?,
            bonus: row.get(9)?,
            review_count: row.get(10)?,
            order_activity: row.get(11)?,
            item_url: row.get(12)?,
            display_mode: row
                .get::<_, String>(13)?
                .parse()
                .unwrap_or_default(),
            scraped_at: row
                .get::<_, String>(14)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    /// Stored rows in insertion order, optionally for one code only.
    pub fn list_records(&self, code: Option<&str>) -> Result<Vec<ExtractedRecord>> {
        let conn = self.lock()?;

        let records = match code {
            Some(code) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM listings WHERE code = ?1 ORDER BY id",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt.query_map(params![code], Self::record_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("SELECT {} FROM listings ORDER BY id", SELECT_COLUMNS))?;
                let rows = stmt.query_map([], Self::record_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(records)
    }

    pub fn count_records(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl RowSink for SqliteSink {
    fn clear_with_header(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM listings", [])?;
        Ok(())
    }

    fn append_record(&self, record: &ExtractedRecord) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO listings (code, product_name, rank, shop_name, price, postage_label,
                 point_percent_label, point_value, quality_delivery, bonus, review_count,
                 order_activity, item_url, display_mode, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                record.code,
                record.product_name,
                record.rank,
                record.shop_name,
                record.price,
                record.postage_label,
                record.point_percent_label,
                record.point_value,
                record.quality_delivery,
                record.bonus,
                record.review_count,
                record.order_activity,
                record.item_url,
                record.display_mode.as_str(),
                record.scraped_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }
}
