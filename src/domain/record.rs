use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::PriceDisplayMode;

/// Flag value written when a marker is present.
pub const FLAG_PRESENT: &str = "あり";
/// Flag value written when a marker is absent.
pub const FLAG_ABSENT: &str = "なし";
/// Order-activity value when the detail page carries no urgency line.
pub const NO_ORDER_ACTIVITY: &str = "なし";

/// Column headings of the output sheet, in row order.
pub const HEADER: [&str; 13] = [
    "JAN",
    "商品名",
    "順位",
    "店舗名",
    "価格(送料込)",
    "送料表記",
    "ポイント%",
    "ポイント額",
    "優良配送",
    "BONUS",
    "レビュー件数",
    "注文情報",
    "商品URL",
];

/// One accepted listing, normalized for the sink.
///
/// Text fields use the empty string rather than `Option` so that every row
/// has exactly the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub code: String,
    pub product_name: String,
    /// 1-based position among the accepted listings of this code.
    pub rank: u32,
    pub shop_name: String,
    pub price: String,
    pub postage_label: String,
    pub point_percent_label: String,
    pub point_value: String,
    pub quality_delivery: bool,
    pub bonus: bool,
    pub review_count: String,
    pub order_activity: String,
    pub item_url: String,
    /// Display mode the listing page was in when this row was read.
    pub display_mode: PriceDisplayMode,
    pub scraped_at: DateTime<Utc>,
}

impl ExtractedRecord {
    pub fn new(code: &str, rank: u32) -> Self {
        Self {
            code: code.to_string(),
            product_name: String::new(),
            rank,
            shop_name: String::new(),
            price: String::new(),
            postage_label: String::new(),
            point_percent_label: String::new(),
            point_value: String::new(),
            quality_delivery: false,
            bonus: false,
            review_count: String::new(),
            order_activity: NO_ORDER_ACTIVITY.to_string(),
            item_url: String::new(),
            display_mode: PriceDisplayMode::Unknown,
            scraped_at: Utc::now(),
        }
    }

    pub fn flag_label(flag: bool) -> &'static str {
        if flag {
            FLAG_PRESENT
        } else {
            FLAG_ABSENT
        }
    }

    /// Render the record as the 13 sheet columns, in `HEADER` order.
    pub fn to_row(&self) -> [String; 13] {
        [
            self.code.clone(),
            self.product_name.clone(),
            self.rank.to_string(),
            self.shop_name.clone(),
            self.price.clone(),
            self.postage_label.clone(),
            self.point_percent_label.clone(),
            self.point_value.clone(),
            Self::flag_label(self.quality_delivery).to_string(),
            Self::flag_label(self.bonus).to_string(),
            self.review_count.clone(),
            self.order_activity.clone(),
            self.item_url.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let record = ExtractedRecord::new("4571697232075", 1);
        assert_eq!(record.order_activity, "なし");
        assert_eq!(record.point_value, "");
        assert!(!record.quality_delivery);
        assert_eq!(record.display_mode, PriceDisplayMode::Unknown);
    }

    #[test]
    fn test_row_follows_header_order() {
        let mut record = ExtractedRecord::new("4571697232075", 2);
        record.product_name = "Widget".into();
        record.shop_name = "Shop".into();
        record.price = "1,000円".into();
        record.postage_label = "送料無料".into();
        record.point_percent_label = "5%".into();
        record.point_value = "50".into();
        record.quality_delivery = true;
        record.review_count = "12".into();
        record.item_url = "https://example.com/item".into();

        let row = record.to_row();
        assert_eq!(row.len(), HEADER.len());
        assert_eq!(row[0], "4571697232075");
        assert_eq!(row[2], "2");
        assert_eq!(row[8], "あり");
        assert_eq!(row[9], "なし");
        assert_eq!(row[11], "なし");
        assert_eq!(row[12], "https://example.com/item");
    }
}
