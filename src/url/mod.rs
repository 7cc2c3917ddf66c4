//! URL handling module
//!
//! This module provides URL normalization (the key under which pages are
//! stored) and host extraction.

mod domain;
mod normalize;

pub use domain::extract_host;
pub use normalize::normalize_url;

use crate::UrlError;

/// Normalizes a URL and returns it together with its host
pub fn normalize_with_host(url_str: &str) -> Result<(::url::Url, String), UrlError> {
    let url = normalize_url(url_str)?;
    let host = extract_host(&url).ok_or(UrlError::MissingHost)?;
    Ok((url, host))
}
