use thiserror::Error;
use url::Url;

/// Errors that can occur while validating an article link.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates an article link before it is handed to the digest tool.
///
/// The bundling tool fetches every link it is given, so anything that is
/// not a plain web page address is rejected:
/// - Non-HTTP(S) schemes (e.g., `mailto:`, `javascript:`, `file://`)
/// - URLs without a host
///
/// # Examples
///
/// ```
/// use kindle_digest::util::validate_link;
///
/// let url = validate_link("https://example.com/post/1").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(validate_link("mailto:someone@example.com").is_err());
/// assert!(validate_link("not a url").is_err());
/// ```
pub fn validate_link(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_links() {
        assert!(validate_link("https://example.com/post.html").is_ok());
        assert!(validate_link("http://news.example.org").is_ok());
        assert!(validate_link("https://example.com:8443/a?b=c#d").is_ok());
    }

    #[test]
    fn test_surrounding_whitespace_tolerated() {
        let url = validate_link("  https://example.com/a \n").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_link("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_link("ftp://example.com/file").is_err());
        assert!(validate_link("javascript:alert(1)").is_err());
        assert!(validate_link("mailto:a@example.com").is_err());
    }

    #[test]
    fn test_relative_link_rejected() {
        assert!(matches!(
            validate_link("/2024/01/post"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_empty_link_rejected() {
        assert!(validate_link("").is_err());
    }
}
