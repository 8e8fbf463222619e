//! Durable-storage gate for extracted records

use crate::record::types::{CandidateRecord, ProductRecord};
use thiserror::Error;

/// Validation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Required fields and a numeric price are enforced
    #[default]
    Strict,

    /// Every record passes; used for sampling a handful of pages
    Test,
}

/// Why a field failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("must be present")]
    Missing,

    #[error("must be a non-empty string")]
    Blank,

    #[error("must be a valid number")]
    NotNumeric,
}

/// A record rejected by the strict gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid '{field}': {reason}")]
pub struct ValidationRejection {
    pub field: &'static str,
    pub reason: RejectReason,
}

impl ValidationRejection {
    fn new(field: &'static str, reason: RejectReason) -> Self {
        Self { field, reason }
    }
}

/// Accepts or rejects candidate records
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    mode: ValidationMode,
}

impl Validator {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    /// Validates a candidate and normalizes it into a [`ProductRecord`]
    ///
    /// Fields are checked in the order `retailer`, `product_url`,
    /// `retailers_brand`, `title`, `retailers_mpn`, `price`; the first
    /// failure is reported.
    pub fn validate(
        &self,
        candidate: CandidateRecord,
    ) -> Result<ProductRecord, ValidationRejection> {
        if self.mode == ValidationMode::Test {
            return Ok(ProductRecord::from_candidate_lenient(candidate));
        }

        let retailer = required_string("retailer", candidate.retailer)?;
        let product_url = required_string("product_url", candidate.product_url)?;
        let brand = required_string("retailers_brand", candidate.retailers_brand)?;
        let title = required_string("title", candidate.title)?;
        let mpn = required_string("retailers_mpn", candidate.retailers_mpn)?;

        let price = match &candidate.price {
            None => return Err(ValidationRejection::new("price", RejectReason::Missing)),
            Some(raw) => raw
                .to_number()
                .ok_or_else(|| ValidationRejection::new("price", RejectReason::NotNumeric))?,
        };

        Ok(ProductRecord {
            retailer,
            product_url,
            retailers_brand: Some(brand),
            price: Some(price),
            title: Some(title),
            images: candidate.images,
            retailers_mpn: Some(mpn),
            retailers_upc: candidate.retailers_upc,
            avg_rating: candidate.avg_rating,
            number_of_reviews: candidate.number_of_reviews,
        })
    }
}

fn required_string(
    field: &'static str,
    value: Option<String>,
) -> Result<String, ValidationRejection> {
    match value {
        None => Err(ValidationRejection::new(field, RejectReason::Missing)),
        Some(s) if s.trim().is_empty() => Err(ValidationRejection::new(field, RejectReason::Blank)),
        Some(s) => Ok(s),
    }
}
