//! Official-match filter: does a URL plausibly belong to a named business?
//!
//! A ranking heuristic, not a guarantee. Every provider goes through
//! [`looks_official`] so selection behaves the same everywhere.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Hosts that are never an organization's own website. Matched by label-aware
/// suffix, so `m.facebook.com` is covered by `facebook.com`.
pub const AGGREGATOR_DOMAINS: &[&str] = &[
    // social networks
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "tiktok.com",
    "linkedin.com",
    "youtube.com",
    "pinterest.com",
    // reviews / directories
    "yelp.com",
    "tripadvisor.com",
    "foursquare.com",
    "yellowpages.com",
    "mapquest.com",
    "wikipedia.org",
    "eventbrite.com",
    // reservations / delivery
    "opentable.com",
    "doordash.com",
    "grubhub.com",
    "ubereats.com",
    "postmates.com",
    "seamless.com",
    "toasttab.com",
    // search engines and other non-authoritative platforms
    "google.com",
    "bing.com",
    "duckduckgo.com",
    "openai.com",
];

/// Words that say nothing about which domain a business owns.
const STOP_WORDS: &[&str] = &[
    // articles and glue
    "the", "and", "for", "of", "at",
    // legal suffixes
    "co", "llc", "inc", "ltd", "corp", "company",
    // generic business words
    "group", "studio", "shop", "store", "official",
    // locality words
    "north", "south", "east", "west", "park", "san", "diego", "city", "usa",
];

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("non-alnum regex"));

/// Lowercased host of `url`, or empty when it has none.
pub fn host_of(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_default()
}

/// True when `host` is, or is a subdomain of, a blacklisted domain.
pub fn is_aggregator(host: &str) -> bool {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return false;
    }
    AGGREGATOR_DOMAINS.iter().any(|d| {
        host == *d
            || host
                .strip_suffix(d)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// [`is_aggregator`] applied to a URL's host.
pub fn is_aggregator_url(url: &str) -> bool {
    is_aggregator(&host_of(url))
}

/// Distinctive lowercase words of a business name.
pub fn tokenize(name: &str) -> Vec<String> {
    let lowered = name.to_lowercase();
    let spaced = NON_ALNUM_RE.replace_all(&lowered, " ");
    spaced
        .split_whitespace()
        .filter(|w| w.len() >= 3 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Host is non-empty, not an aggregator, and contains a name token.
pub fn looks_official(name: &str, url: &str) -> bool {
    let host = host_of(url);
    if host.is_empty() || is_aggregator(&host) {
        return false;
    }
    tokenize(name).iter().any(|t| host.contains(t.as_str()))
}

/// Drop query and fragment; keep scheme, host, and path.
pub fn trim_url(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(mut u) => {
            u.set_query(None);
            u.set_fragment(None);
            u.to_string()
        }
        Err(_) => url.trim().to_string(),
    }
}
