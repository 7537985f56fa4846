use url::{Host, Url};

/// Second-level labels that sit under a country-code TLD (`example.co.uk`,
/// `example.com.au`). When one of these is the second-to-last label, the
/// registrable domain keeps three labels instead of two.
const SECOND_LEVEL_LABELS: [&str; 6] = ["co", "com", "gov", "net", "org", "edu"];

/// Extracts the canonical registrable domain from an absolute URL.
///
/// The host is lowercased and trimmed to its last two labels, or its last
/// three when the second-to-last label is a known second-level label. This
/// collapses `www.` and other subdomains so that every page of one company
/// maps to the same key.
///
/// Returns an empty string when the input does not parse as a URL or has no
/// domain host (IP literals included). Callers treat an empty result as
/// "drop this record".
///
/// # Examples
///
/// ```
/// use lead_scout::domain::normalize_domain;
///
/// assert_eq!(normalize_domain("https://www.acme.com/about"), "acme.com");
/// assert_eq!(normalize_domain("https://shop.acme.co.uk"), "acme.co.uk");
/// assert_eq!(normalize_domain("not a url"), "");
/// ```
pub fn normalize_domain(url: &str) -> String {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return String::new(),
    };

    let host = match parsed.host() {
        Some(Host::Domain(host)) => host.to_lowercase(),
        _ => return String::new(),
    };

    let labels: Vec<&str> = host
        .trim_end_matches('.')
        .split('.')
        .filter(|label| !label.is_empty())
        .collect();

    let keep = if labels.len() > 2 && SECOND_LEVEL_LABELS.contains(&labels[labels.len() - 2]) {
        3
    } else {
        2
    };

    labels[labels.len().saturating_sub(keep)..].join(".")
}
