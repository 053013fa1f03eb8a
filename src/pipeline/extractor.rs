//! Field extraction from one listing row.
//!
//! Every field is resolved independently from the row's rendered text and
//! markup. Fields with several sources are resolved by an ordered list of
//! strategies where the first one to produce a value wins. Only postage and
//! price are required; a row missing either is rejected.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::domain::{ExtractedRecord, PriceDisplayMode};
use crate::pipeline::listing::ListingCandidate;

pub const FREE_SHIPPING_LABEL: &str = "送料無料";
pub const UNSPECIFIED_SHIPPING_LABEL: &str = "送料別";
pub const UNKNOWN_SHOP_LABEL: &str = "店舗名不明";

const FREE_SHIPPING_MARKERS: [&str; 2] = ["送料無料", "送料0円"];
const QUALITY_DELIVERY_PHRASE: &str = "優良配送";
const QUALITY_DELIVERY_ICON: &str = "icon_delivery_excellent";
const BONUS_TEXT: &str = "BONUS";
const BONUS_MARKER: &str = "bonus";
/// Link texts that are badges rather than the product name.
const NAME_EXCLUSIONS: [&str; 3] = ["円", "件", "最安値"];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static SHIPPING_FEE: Lazy<Regex> = Lazy::new(|| Regex::new(r"送料([0-9,]+)円").expect("valid regex"));
static PRICE_IN_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9,]+)\s*円").expect("valid regex"));
static POINT_PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)%").expect("valid regex"));
static REVIEW_PARENTHESIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[（(]([\d,]+)件[）)]").expect("valid regex"));
static REVIEW_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\d,]+)件").expect("valid regex"));

static PRICE_VALUE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span[class*='elPriceValue']").expect("valid selector"));
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "div[class*='elName'] a, div[class*='SearchResultItem__title'] a, p[class*='elName'] a",
    )
    .expect("valid selector")
});
static STORE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[class*='Store'] a, [class*='store'] a").expect("valid selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));
static LINK_WITH_HREF: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("valid selector"));

/// Why a row produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Postage is neither free nor a stated amount.
    PostageUnspecified,
    /// No price could be read.
    PriceMissing,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::PostageUnspecified => f.write_str("postage unspecified"),
            Rejection::PriceMissing => f.write_str("price missing"),
        }
    }
}

/// A row parsed once and shared by all strategies.
struct Row<'c> {
    raw: &'c str,
    /// Whitespace runs collapsed to one space.
    collapsed: String,
    /// All whitespace removed.
    compact: String,
    markup: &'c str,
    fragment: Html,
}

impl<'c> Row<'c> {
    fn new(text: &'c str, markup: &'c str) -> Self {
        Self {
            raw: text,
            collapsed: WHITESPACE.replace_all(text, " ").into_owned(),
            compact: WHITESPACE.replace_all(text, "").into_owned(),
            markup,
            fragment: Html::parse_fragment(markup),
        }
    }
}

type Strategy = fn(&Row<'_>) -> Option<String>;

fn first_success(strategies: &[Strategy], row: &Row<'_>) -> Option<String> {
    strategies.iter().find_map(|strategy| strategy(row))
}

fn element_text(element: ElementRef<'_>) -> String {
    let text: String = element.text().collect();
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn is_free_shipping(text: &str) -> bool {
    let compact = WHITESPACE.replace_all(text, "");
    FREE_SHIPPING_MARKERS.iter().any(|m| compact.contains(m))
}

// Postage

fn postage(row: &Row<'_>) -> String {
    if FREE_SHIPPING_MARKERS.iter().any(|m| row.compact.contains(m)) {
        return FREE_SHIPPING_LABEL.to_string();
    }
    match SHIPPING_FEE.captures(&row.compact) {
        Some(caps) => format!("送料{}円", &caps[1]),
        None => UNSPECIFIED_SHIPPING_LABEL.to_string(),
    }
}

// Price

fn price_from_element(row: &Row<'_>) -> Option<String> {
    let element = row.fragment.select(&PRICE_VALUE).next()?;
    non_empty(element_text(element)).map(|value| format!("{}円", value))
}

fn price_from_text(row: &Row<'_>) -> Option<String> {
    PRICE_IN_TEXT
        .captures(&row.collapsed)
        .map(|caps| format!("{}円", &caps[1]))
}

const PRICE_STRATEGIES: &[Strategy] = &[price_from_element, price_from_text];

// Product name

fn name_from_title_link(row: &Row<'_>) -> Option<String> {
    let element = row.fragment.select(&TITLE_LINK).next()?;
    non_empty(element_text(element))
}

fn name_from_longest_link(row: &Row<'_>) -> Option<String> {
    let mut texts: Vec<String> = row.fragment.select(&LINK).map(element_text).collect();
    // Stable: equally long links keep document order.
    texts.sort_by_key(|text| std::cmp::Reverse(text.chars().count()));
    texts
        .into_iter()
        .find(|text| !NAME_EXCLUSIONS.iter().any(|badge| text.contains(badge)))
        .and_then(non_empty)
}

const NAME_STRATEGIES: &[Strategy] = &[name_from_title_link, name_from_longest_link];

// Shop name

fn shop_from_store_link(row: &Row<'_>) -> Option<String> {
    let link = row.fragment.select(&STORE_LINK).next()?;
    non_empty(element_text(link))
}

fn shop_from_store_image(row: &Row<'_>) -> Option<String> {
    let link = row.fragment.select(&STORE_LINK).next()?;
    let image = link.select(&IMAGE).next()?;
    non_empty(image.value().attr("alt")?.trim().to_string())
}

const SHOP_STRATEGIES: &[Strategy] = &[shop_from_store_link, shop_from_store_image];

/// Shop id from a merchant storefront URL, labeled as an id.
fn shop_from_url(item_url: &str, store_domain: &str) -> Option<String> {
    if item_url.is_empty() || !item_url.contains(store_domain) {
        return None;
    }
    let segment = url::Url::parse(item_url).ok().and_then(|url| {
        url.path_segments()
            .and_then(|mut segments| segments.next().map(str::to_string))
            .filter(|segment| !segment.is_empty())
    });
    Some(match segment {
        Some(id) => format!("{} (ID)", id),
        None => UNKNOWN_SHOP_LABEL.to_string(),
    })
}

// Flags

fn has_quality_delivery(row: &Row<'_>) -> bool {
    row.raw.contains(QUALITY_DELIVERY_PHRASE)
        || row.markup.contains(QUALITY_DELIVERY_ICON)
        || row.fragment.select(&IMAGE).any(|img| {
            img.value()
                .attr("alt")
                .is_some_and(|alt| alt.contains(QUALITY_DELIVERY_PHRASE))
        })
}

fn has_bonus(row: &Row<'_>) -> bool {
    row.raw.contains(BONUS_TEXT) || row.markup.to_lowercase().contains(BONUS_MARKER)
}

// Points

fn point_percent(row: &Row<'_>) -> u64 {
    POINT_PERCENT
        .captures(&row.compact)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

fn point_percent_label(percent: u64) -> String {
    if percent == 0 {
        String::new()
    } else {
        format!("{}%", percent)
    }
}

/// `floor(price * percent / 100)` with thousands separators, or empty when
/// either input is missing or non-positive.
pub fn point_value(price: &str, percent: u64) -> String {
    let digits: String = price.chars().filter(char::is_ascii_digit).collect();
    let Ok(price) = digits.parse::<u64>() else {
        return String::new();
    };
    if price == 0 || percent == 0 {
        return String::new();
    }
    price
        .checked_mul(percent)
        .map(|total| with_thousands_separators(total / 100))
        .unwrap_or_default()
}

fn with_thousands_separators(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// Reviews

fn reviews_parenthesized(row: &Row<'_>) -> Option<String> {
    REVIEW_PARENTHESIZED
        .captures(row.raw)
        .map(|caps| caps[1].to_string())
}

fn reviews_bare(row: &Row<'_>) -> Option<String> {
    let count = REVIEW_BARE.captures(row.raw)?[1].to_string();
    let digits = count.replace(',', "");
    (!digits.is_empty() && digits.chars().all(char::is_numeric)).then_some(count)
}

const REVIEW_STRATEGIES: &[Strategy] = &[reviews_parenthesized, reviews_bare];

// Item URL

fn item_url(row: &Row<'_>, base_url: Option<&str>) -> String {
    let Some(href) = row
        .fragment
        .select(&LINK_WITH_HREF)
        .next()
        .and_then(|a| a.value().attr("href"))
    else {
        return String::new();
    };
    let href = href.trim();
    base_url
        .and_then(|base| url::Url::parse(base).ok())
        .and_then(|base| base.join(href).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// Turns listing rows into records.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    store_domain: String,
}

impl FieldExtractor {
    pub fn new(store_domain: &str) -> Self {
        Self {
            store_domain: store_domain.to_string(),
        }
    }

    /// Extract a record for `code` at `rank`.
    ///
    /// Postage is checked on every row whatever `mode` says, so rows without
    /// a shipping-inclusive price are dropped even when the display mode
    /// could not be confirmed.
    pub fn extract<H>(
        &self,
        code: &str,
        rank: u32,
        mode: PriceDisplayMode,
        candidate: &ListingCandidate<H>,
    ) -> Result<ExtractedRecord, Rejection> {
        let row = Row::new(&candidate.text, &candidate.markup);

        let postage_label = postage(&row);
        if postage_label == UNSPECIFIED_SHIPPING_LABEL {
            return Err(Rejection::PostageUnspecified);
        }

        let price = first_success(PRICE_STRATEGIES, &row).ok_or(Rejection::PriceMissing)?;

        let item_url = item_url(&row, candidate.base_url.as_deref());
        let shop_name = first_success(SHOP_STRATEGIES, &row)
            .or_else(|| shop_from_url(&item_url, &self.store_domain))
            .unwrap_or_default();
        let percent = point_percent(&row);

        let mut record = ExtractedRecord::new(code, rank);
        record.product_name = first_success(NAME_STRATEGIES, &row).unwrap_or_default();
        record.shop_name = shop_name;
        record.point_value = point_value(&price, percent);
        record.price = price;
        record.postage_label = postage_label;
        record.point_percent_label = point_percent_label(percent);
        record.quality_delivery = has_quality_delivery(&row);
        record.bonus = has_bonus(&row);
        record.review_count = first_success(REVIEW_STRATEGIES, &row).unwrap_or_default();
        record.item_url = item_url;
        record.display_mode = mode;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE: &str = "store.shopping.yahoo.co.jp";

    fn extract(text: &str, markup: &str) -> Result<ExtractedRecord, Rejection> {
        FieldExtractor::new(STORE).extract(
            "4571697232075",
            1,
            PriceDisplayMode::ShippingInclusive,
            &ListingCandidate::from_parts(text, markup),
        )
    }

    #[test]
    fn test_free_shipping_wins_over_amount() {
        let record = extract("1,980円\n送料無料 送料500円", "").unwrap();
        assert_eq!(record.postage_label, "送料無料");

        let record = extract("1,980円 送料 0 円", "").unwrap();
        assert_eq!(record.postage_label, "送料無料");
    }

    #[test]
    fn test_stated_shipping_amount() {
        let record = extract("1,980円\n送料 1,200 円", "").unwrap();
        assert_eq!(record.postage_label, "送料1,200円");
    }

    #[test]
    fn test_unspecified_postage_is_rejected() {
        assert_eq!(
            extract("1,980円 送料別", "").unwrap_err(),
            Rejection::PostageUnspecified
        );
        assert_eq!(extract("1,980円", "").unwrap_err(), Rejection::PostageUnspecified);
    }

    #[test]
    fn test_missing_price_is_rejected() {
        assert_eq!(extract("送料無料 在庫あり", "").unwrap_err(), Rejection::PriceMissing);
    }

    #[test]
    fn test_price_prefers_price_element() {
        let markup = r#"<span class="elPriceValue">2,480</span><span>999円相当</span>"#;
        let record = extract("999円相当 2,480円 送料無料", markup).unwrap();
        assert_eq!(record.price, "2,480円");
    }

    #[test]
    fn test_price_falls_back_to_text() {
        let record = extract("ポイント 3,300\n円 送料無料", "").unwrap();
        assert_eq!(record.price, "3,300円");
    }

    #[test]
    fn test_name_prefers_title_link() {
        let markup = r#"
            <a href="/img">A much longer link text that is not the title</a>
            <div class="elName"><a href="/item">Widget Pro</a></div>
        "#;
        let record = extract("1,000円 送料無料", markup).unwrap();
        assert_eq!(record.product_name, "Widget Pro");
    }

    #[test]
    fn test_name_falls_back_to_longest_plain_link() {
        let markup = r#"
            <a href="/a">1,000円 (税込) 最安値の商品はこちら</a>
            <a href="/b">レビュー 1,234件 のレビューを見る</a>
            <a href="/c">Widget Pro 2 pack</a>
            <a href="/d">Shop</a>
        "#;
        let record = extract("1,000円 送料無料", markup).unwrap();
        assert_eq!(record.product_name, "Widget Pro 2 pack");
    }

    #[test]
    fn test_shop_from_store_link_text() {
        let markup = r#"<div class="SearchResultItemStore"><a href="/s">Good Shop</a></div>"#;
        let record = extract("1,000円 送料無料", markup).unwrap();
        assert_eq!(record.shop_name, "Good Shop");
    }

    #[test]
    fn test_shop_from_store_logo_alt() {
        let markup = r#"<p class="elStore"><a href="/s"><img alt="Logo Shop" src="x.png"></a></p>"#;
        let record = extract("1,000円 送料無料", markup).unwrap();
        assert_eq!(record.shop_name, "Logo Shop");
    }

    #[test]
    fn test_shop_id_from_storefront_url() {
        let markup = r#"<a href="https://store.shopping.yahoo.co.jp/goodshop/item-1.html">Widget</a>"#;
        let record = extract("1,000円 送料無料", markup).unwrap();
        assert_eq!(record.shop_name, "goodshop (ID)");
        assert_eq!(
            record.item_url,
            "https://store.shopping.yahoo.co.jp/goodshop/item-1.html"
        );
    }

    #[test]
    fn test_shop_empty_for_other_domains() {
        let markup = r#"<a href="https://paypaymall.yahoo.co.jp/store/x/item/1/">Widget</a>"#;
        let record = extract("1,000円 送料無料", markup).unwrap();
        assert_eq!(record.shop_name, "");
    }

    #[test]
    fn test_shop_from_url_without_segment() {
        assert_eq!(
            shop_from_url("https://store.shopping.yahoo.co.jp/", STORE).as_deref(),
            Some("店舗名不明")
        );
        assert_eq!(shop_from_url("", STORE), None);
    }

    #[test]
    fn test_quality_delivery_sources() {
        assert!(extract("1,000円 送料無料 優良配送", "").unwrap().quality_delivery);
        assert!(
            extract("1,000円 送料無料", r#"<i class="icon_delivery_excellent"></i>"#)
                .unwrap()
                .quality_delivery
        );
        assert!(
            extract("1,000円 送料無料", r#"<img alt="優良配送" src="b.png">"#)
                .unwrap()
                .quality_delivery
        );
        assert!(!extract("1,000円 送料無料", "<img alt=\"logo\">").unwrap().quality_delivery);
    }

    #[test]
    fn test_bonus_sources() {
        assert!(extract("1,000円 送料無料 +5% BONUS", "").unwrap().bonus);
        assert!(extract("1,000円 送料無料", r#"<span class="Bonus"></span>"#).unwrap().bonus);
        assert!(!extract("1,000円 送料無料", "<span></span>").unwrap().bonus);
    }

    #[test]
    fn test_point_percent_and_value() {
        let record = extract("1,000円 送料無料 5 %獲得", "").unwrap();
        assert_eq!(record.point_percent_label, "5%");
        assert_eq!(record.point_value, "50");

        let record = extract("1,000円 送料無料", "").unwrap();
        assert_eq!(record.point_percent_label, "");
        assert_eq!(record.point_value, "");
    }

    #[test]
    fn test_point_value_floors() {
        assert_eq!(point_value("1,000円", 5), "50");
        assert_eq!(point_value("999円", 7), "69");
        assert_eq!(point_value("100,000円", 10), "10,000");
        assert_eq!(point_value("0円", 5), "");
        assert_eq!(point_value("1,000円", 0), "");
        assert_eq!(point_value("", 5), "");
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(with_thousands_separators(0), "0");
        assert_eq!(with_thousands_separators(999), "999");
        assert_eq!(with_thousands_separators(1000), "1,000");
        assert_eq!(with_thousands_separators(1234567), "1,234,567");
    }

    #[test]
    fn test_review_count_prefers_parenthesized() {
        let record = extract("1,000円 送料無料 残り56件 ★4.5(1,234件)", "").unwrap();
        assert_eq!(record.review_count, "1,234");

        let record = extract("1,000円 送料無料 ★4.5（88件）", "").unwrap();
        assert_eq!(record.review_count, "88");
    }

    #[test]
    fn test_review_count_bare_fallback() {
        let record = extract("1,000円 送料無料 レビュー 56件", "").unwrap();
        assert_eq!(record.review_count, "56");

        let record = extract("1,000円 送料無料 ,件", "").unwrap();
        assert_eq!(record.review_count, "");
    }

    #[test]
    fn test_item_url_resolves_relative_href() {
        let candidate = ListingCandidate {
            base_url: Some("https://shopping.yahoo.co.jp/products/abc".into()),
            ..ListingCandidate::from_parts("1,000円 送料無料", r#"<a>no href</a><a href="/item/1">x</a>"#)
        };
        let record = FieldExtractor::new(STORE)
            .extract("c", 1, PriceDisplayMode::ShippingInclusive, &candidate)
            .unwrap();
        assert_eq!(record.item_url, "https://shopping.yahoo.co.jp/item/1");
    }

    #[test]
    fn test_record_carries_code_rank_and_mode() {
        let record = FieldExtractor::new(STORE)
            .extract(
                "4904710437681",
                3,
                PriceDisplayMode::Other,
                &ListingCandidate::from_parts("1,000円 送料無料", ""),
            )
            .unwrap();
        assert_eq!(record.code, "4904710437681");
        assert_eq!(record.rank, 3);
        assert_eq!(record.display_mode, PriceDisplayMode::Other);
        assert_eq!(record.item_url, "");
        assert_eq!(record.order_activity, "なし");
    }
}
