//! Product record types and validation
//!
//! Extraction produces a [`CandidateRecord`] with optional fields; the
//! [`Validator`] turns it into the persisted [`ProductRecord`] or rejects it.

mod types;
mod validation;

pub use types::{CandidateRecord, ProductRecord, RawPrice};
pub use validation::{RejectReason, ValidationMode, ValidationRejection, Validator};
