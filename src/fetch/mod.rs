//! Page fetching and field extraction
//!
//! This module contains the collaborators a worker calls per URL:
//! - [`PageFetcher`]: downloads a page, optionally through a proxy
//! - [`RecordExtractor`]: turns the page into a [`crate::record::CandidateRecord`]

mod extractor;
mod fetcher;

pub use extractor::{RecordExtractor, SelectorExtractor};
pub use fetcher::{build_http_client, FetchError, FetchSettings, HttpFetcher, PageFetcher};
