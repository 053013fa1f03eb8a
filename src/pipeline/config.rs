use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app::Result;
use crate::domain::ProductCode;

/// Configuration for the listing extraction pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Storefront search URL; `{code}` is replaced by the URL-encoded code
    pub search_url_template: String,

    /// Link on the search result page that leads to the product page
    pub product_link_selector: String,

    /// Controls switching the listing into list view, in priority order
    pub list_view_selectors: Vec<String>,

    /// Link text that identifies the list-view control when no selector matches
    pub list_view_label: String,

    /// Listing layout variants, in priority order
    pub layout_selectors: Vec<String>,

    /// Elements inspected by the generic fallback layout
    pub generic_item_selector: String,

    /// Merchant storefront host; its first path segment is the shop id
    pub store_domain: String,

    /// Accepted listings emitted per code (default: 5)
    pub max_listings_per_code: usize,

    /// Display-mode switch attempts before accepting the degraded mode (default: 3)
    pub mode_switch_attempts: u32,

    /// Wait for the product link on the search page in seconds (default: 30)
    pub navigation_timeout_secs: u64,

    /// Wait for display-mode confirmation per attempt in seconds (default: 10)
    pub confirm_timeout_secs: u64,

    /// Interval between condition checks in milliseconds (default: 1000)
    pub poll_interval_ms: u64,

    /// Settle delay after loading the search page in milliseconds (default: 3000)
    pub search_settle_ms: u64,

    /// Settle delay after loading the product page in milliseconds (default: 5000)
    pub product_settle_ms: u64,

    /// Settle delay after switching to list view in milliseconds (default: 3000)
    pub list_view_settle_ms: u64,

    /// Settle delay after opening the price-display control in milliseconds (default: 1000)
    pub control_settle_ms: u64,

    /// Settle delay after the display mode was confirmed in milliseconds (default: 3000)
    pub confirmed_settle_ms: u64,

    /// Settle delay after reloading for another attempt in milliseconds (default: 5000)
    pub reload_settle_ms: u64,

    /// Settle delay on an item detail page before reading it in milliseconds (default: 2000)
    pub enrichment_settle_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_url_template:
                "https://shopping.yahoo.co.jp/search?first=1&tab_ex=commerce&fr=shp-prop&p={code}"
                    .to_string(),
            product_link_selector: "a[href*='/products/']:not([href*='search'])".to_string(),
            list_view_selectors: vec!["li[class*='ChangeView__item--list'] a".to_string()],
            list_view_label: "リスト".to_string(),
            layout_selectors: vec![
                "li[class*='elItem']".to_string(),
                "div[class*='LoopList__item']".to_string(),
                "div[class*='SearchResultItem']".to_string(),
            ],
            generic_item_selector: "li".to_string(),
            store_domain: "store.shopping.yahoo.co.jp".to_string(),
            max_listings_per_code: 5,
            mode_switch_attempts: 3,
            navigation_timeout_secs: 30,
            confirm_timeout_secs: 10,
            poll_interval_ms: 1000,
            search_settle_ms: 3000,
            product_settle_ms: 5000,
            list_view_settle_ms: 3000,
            control_settle_ms: 1000,
            confirmed_settle_ms: 3000,
            reload_settle_ms: 5000,
            enrichment_settle_ms: 2000,
        }
    }
}

impl PipelineConfig {
    /// Search page URL for a product code
    pub fn search_url(&self, code: &ProductCode) -> Result<String> {
        let encoded: String = url::form_urlencoded::byte_serialize(code.as_str().as_bytes()).collect();
        let url = url::Url::parse(&self.search_url_template.replace("{code}", &encoded))?;
        Ok(url.to_string())
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn search_settle(&self) -> Duration {
        Duration::from_millis(self.search_settle_ms)
    }

    pub fn product_settle(&self) -> Duration {
        Duration::from_millis(self.product_settle_ms)
    }

    pub fn list_view_settle(&self) -> Duration {
        Duration::from_millis(self.list_view_settle_ms)
    }

    pub fn control_settle(&self) -> Duration {
        Duration::from_millis(self.control_settle_ms)
    }

    pub fn confirmed_settle(&self) -> Duration {
        Duration::from_millis(self.confirmed_settle_ms)
    }

    pub fn reload_settle(&self) -> Duration {
        Duration::from_millis(self.reload_settle_ms)
    }

    pub fn enrichment_settle(&self) -> Duration {
        Duration::from_millis(self.enrichment_settle_ms)
    }

    /// No settle delays and near-zero waits, for driving the fake engine
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            navigation_timeout_secs: 0,
            confirm_timeout_secs: 0,
            poll_interval_ms: 1,
            search_settle_ms: 0,
            product_settle_ms: 0,
            list_view_settle_ms: 0,
            control_settle_ms: 0,
            confirmed_settle_ms: 0,
            reload_settle_ms: 0,
            enrichment_settle_ms: 0,
            ..Default::default()
        }
    }
}
