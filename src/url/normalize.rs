use crate::UrlError;
use url::Url;

/// Normalizes a URL into the key used for URL nodes
///
/// # Normalization Steps
///
/// 1. Parse the URL; scheme-less input (`a.com/b`) is read as `https://`
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Lowercase the host (the port is kept)
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove query string and fragment
///
/// Two spellings of the same page (`https://a.com/b/`, `https://A.com/b#top`)
/// therefore map to the same node.
///
/// # Examples
///
/// ```
/// use crawl_graph::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/page/#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let mut url = match Url::parse(trimmed) {
        Ok(url) if !lacks_scheme(trimmed) => url,
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", trimmed))
                .map_err(|e| UrlError::Parse(format!("{}: {}", trimmed, e)))?
        }
        Err(e) => return Err(UrlError::Parse(format!("{}: {}", trimmed, e))),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingHost)?
        .to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Detects `host:port/...` input that `Url::parse` reads as a scheme
///
/// `a.com:8080/b` parses with scheme `a.com` and `localhost:3000/x` with
/// scheme `localhost`. Neither `http` nor `https` contains a dot or is
/// followed by a bare port number.
fn lacks_scheme(input: &str) -> bool {
    if input.contains("://") {
        return false;
    }
    match input.split_once(':') {
        Some((scheme, rest)) => {
            let port_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            let port_like = port_len > 0
                && matches!(rest.as_bytes().get(port_len), None | Some(b'/' | b'?' | b'#'));
            scheme.contains('.') || port_like
        }
        None => false,
    }
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}
