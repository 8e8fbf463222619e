//! Product page extraction
//!
//! This module turns a product page into a [`CandidateRecord`] using one CSS
//! selector per field. A selector that matches nothing leaves the field empty;
//! deciding whether that is acceptable is the validator's job.

use crate::config::{ExtractorConfig, FieldRule};
use crate::record::{CandidateRecord, RawPrice};
use crate::ConfigError;
use scraper::{Html, Selector};

/// Extracts a candidate record from raw page content
pub trait RecordExtractor: Send + Sync {
    fn extract(&self, url: &str, html: &str) -> CandidateRecord;
}

/// A compiled [`FieldRule`]
#[derive(Debug, Clone)]
struct CompiledRule {
    selector: Selector,
    attr: Option<String>,
}

impl CompiledRule {
    fn compile(rule: &FieldRule) -> Result<Self, ConfigError> {
        let selector = Selector::parse(&rule.selector)
            .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", rule.selector, e)))?;
        Ok(Self {
            selector,
            attr: rule.attr.clone(),
        })
    }

    /// First match, trimmed; empty values count as missing
    fn first(&self, document: &Html) -> Option<String> {
        let element = document.select(&self.selector).next()?;
        let value = match &self.attr {
            Some(attr) => element.value().attr(attr)?.to_string(),
            None => element.text().collect::<String>(),
        };
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// CSS-selector extractor for product detail pages
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    retailer: String,
    price: CompiledRule,
    title: CompiledRule,
    brand: CompiledRule,
    mpn: CompiledRule,
    upc: CompiledRule,
    image: CompiledRule,
    rating: CompiledRule,
    review_count: CompiledRule,
}

impl SelectorExtractor {
    /// Compiles the extraction rules
    ///
    /// # Arguments
    ///
    /// * `retailer` - Value stamped into every record's `retailer` field
    /// * `config` - Selector rules per field
    pub fn new(retailer: &str, config: &ExtractorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            retailer: retailer.to_string(),
            price: CompiledRule::compile(&config.price)?,
            title: CompiledRule::compile(&config.title)?,
            brand: CompiledRule::compile(&config.brand)?,
            mpn: CompiledRule::compile(&config.mpn)?,
            upc: CompiledRule::compile(&config.upc)?,
            image: CompiledRule::compile(&config.image)?,
            rating: CompiledRule::compile(&config.rating)?,
            review_count: CompiledRule::compile(&config.review_count)?,
        })
    }
}

impl RecordExtractor for SelectorExtractor {
    fn extract(&self, url: &str, html: &str) -> CandidateRecord {
        let document = Html::parse_document(html);

        let price = self
            .price
            .first(&document)
            .map(|p| RawPrice::Text(p.replace('$', "").trim().to_string()));

        let number_of_reviews = self
            .review_count
            .first(&document)
            .and_then(|count| count.replace(',', "").parse::<u32>().ok());

        CandidateRecord {
            retailer: Some(self.retailer.clone()),
            product_url: Some(url.to_string()),
            retailers_brand: self.brand.first(&document),
            price,
            title: self.title.first(&document),
            images: self.image.first(&document).into_iter().collect(),
            retailers_mpn: self.mpn.first(&document),
            retailers_upc: self.upc.first(&document).into_iter().collect(),
            avg_rating: self.rating.first(&document),
            number_of_reviews,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_PAGE: &str = r#"
        <html><body>
            <h1 class="js-ga-product-name">Oil Filter</h1>
            <img class="pdp-brand" alt="Bosch" src="/brand.png">
            <img class="main-image" src="https://images.example/filter.jpg">
            <strong class="pricing_price">$1,299.99</strong>
            <dl><dd class="js-ga-product-line-number">3323</dd></dl>
            <span itemprop="sku">  028851333238  </span>
            <div itemprop="ratingValue">4.6</div>
            <meta itemprop="reviewCount" content="1,204">
        </body></html>
    "#;

    fn extractor() -> SelectorExtractor {
        SelectorExtractor::new("oreillyauto.com", &ExtractorConfig::default()).unwrap()
    }

    #[test]
    fn test_extract_full_page() {
        let record = extractor().extract("https://shop.example/p/1", PRODUCT_PAGE);

        assert_eq!(record.retailer.as_deref(), Some("oreillyauto.com"));
        assert_eq!(record.product_url.as_deref(), Some("https://shop.example/p/1"));
        assert_eq!(record.title.as_deref(), Some("Oil Filter"));
        assert_eq!(record.retailers_brand.as_deref(), Some("Bosch"));
        assert_eq!(record.price, Some(RawPrice::Text("1,299.99".to_string())));
        assert_eq!(record.retailers_mpn.as_deref(), Some("3323"));
        assert_eq!(record.retailers_upc, vec!["028851333238".to_string()]);
        assert_eq!(
            record.images,
            vec!["https://images.example/filter.jpg".to_string()]
        );
        assert_eq!(record.avg_rating.as_deref(), Some("4.6"));
        assert_eq!(record.number_of_reviews, Some(1204));
    }

    #[test]
    fn test_missing_fields_are_gaps() {
        let record = extractor().extract("https://shop.example/p/2", "<html><body></body></html>");

        assert_eq!(record.retailer.as_deref(), Some("oreillyauto.com"));
        assert_eq!(record.product_url.as_deref(), Some("https://shop.example/p/2"));
        assert_eq!(record.title, None);
        assert_eq!(record.price, None);
        assert!(record.images.is_empty());
        assert!(record.retailers_upc.is_empty());
        assert_eq!(record.number_of_reviews, None);
    }

    #[test]
    fn test_blank_text_is_missing() {
        let html = r#"<h1 class="js-ga-product-name">   </h1>"#;
        let record = extractor().extract("u", html);
        assert_eq!(record.title, None);
    }

    #[test]
    fn test_unparseable_review_count_is_gap() {
        let html = r#"<meta itemprop="reviewCount" content="many">"#;
        let record = extractor().extract("u", html);
        assert_eq!(record.number_of_reviews, None);
    }

    #[test]
    fn test_custom_rules() {
        let config = ExtractorConfig {
            title: FieldRule::attr("meta[property='og:title']", "content"),
            ..ExtractorConfig::default()
        };
        let extractor = SelectorExtractor::new("shop.example", &config).unwrap();

        let html = r#"<head><meta property="og:title" content="Brake Pads"></head>"#;
        let record = extractor.extract("u", html);
        assert_eq!(record.title.as_deref(), Some("Brake Pads"));
    }

    #[test]
    fn test_invalid_selector() {
        let config = ExtractorConfig {
            price: FieldRule::text("strong["),
            ..ExtractorConfig::default()
        };
        assert!(SelectorExtractor::new("shop.example", &config).is_err());
    }
}
