use serde::{Deserialize, Serialize};

/// Price as it came out of extraction
///
/// Storefronts render prices as text; some feeds already carry numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
}

impl RawPrice {
    /// Coerces the price to a finite number
    ///
    /// Text may carry a leading currency symbol and thousands separators
    /// (`"$1,299.99"`). A single comma followed by one or two trailing digits
    /// and no period is read as a decimal comma (`"12,99"` is 12.99), and a
    /// comma after the last period marks the continental layout (`"1.299,99"`).
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Self::Text(text) => parse_price_text(text),
        }
    }
}

fn parse_price_text(text: &str) -> Option<f64> {
    let trimmed = text.trim().trim_start_matches('$').trim();
    if trimmed.is_empty() {
        return None;
    }

    let last_comma = trimmed.rfind(',');
    let last_dot = trimmed.rfind('.');

    let normalized = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        (Some(comma), None)
            if trimmed.matches(',').count() == 1
                && (1..=2).contains(&(trimmed.len() - comma - 1)) =>
        {
            trimmed.replace(',', ".")
        }
        _ => trimmed.replace(',', ""),
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Raw extraction output for one product page
///
/// Any field may be missing; a selector that matches nothing leaves `None`
/// (or an empty list) rather than failing the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateRecord {
    pub retailer: Option<String>,
    pub product_url: Option<String>,
    pub retailers_brand: Option<String>,
    pub price: Option<RawPrice>,
    pub title: Option<String>,
    pub images: Vec<String>,
    pub retailers_mpn: Option<String>,
    pub retailers_upc: Vec<String>,
    pub avg_rating: Option<String>,
    pub number_of_reviews: Option<u32>,
}

/// The persisted record shape, one per line in a batch object
///
/// Field order is the serialization order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub retailer: String,
    pub product_url: String,
    pub retailers_brand: Option<String>,
    pub price: Option<f64>,
    pub title: Option<String>,
    pub images: Vec<String>,
    pub retailers_mpn: Option<String>,
    pub retailers_upc: Vec<String>,
    pub avg_rating: Option<String>,
    pub number_of_reviews: Option<u32>,
}

impl ProductRecord {
    /// Converts a candidate without any checks
    ///
    /// Missing identity fields become empty strings and an uncoercible
    /// price becomes `None`.
    pub fn from_candidate_lenient(candidate: CandidateRecord) -> Self {
        let price = candidate.price.as_ref().and_then(RawPrice::to_number);
        Self {
            retailer: candidate.retailer.unwrap_or_default(),
            product_url: candidate.product_url.unwrap_or_default(),
            retailers_brand: candidate.retailers_brand,
            price,
            title: candidate.title,
            images: candidate.images,
            retailers_mpn: candidate.retailers_mpn,
            retailers_upc: candidate.retailers_upc,
            avg_rating: candidate.avg_rating,
            number_of_reviews: candidate.number_of_reviews,
        }
    }
}
