//! DuckDuckGo HTML results (keyless).

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use brandscout_shared::{BrandScoutError, Result};

use super::SearchBackend;

/// Every anchor start tag.
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<a\s[^>]*>"#).expect("anchor regex"));

static CLASS_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\sclass=["']([^"']*)["']"#).expect("class attr regex"));

static HREF_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\shref=["']([^"']+)["']"#).expect("href attr regex"));

/// Scrapes the no-JavaScript results page.
pub struct DuckDuckGoBackend {
    base_url: String,
}

impl DuckDuckGoBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl SearchBackend for DuckDuckGoBackend {
    fn query_url(&self, query: &str) -> Result<Url> {
        Url::parse_with_params(&format!("{}/html/", self.base_url), &[("q", query)])
            .map_err(|e| BrandScoutError::config(format!("bad DuckDuckGo base URL: {e}")))
    }

    fn extract_links(&self, body: &str) -> Vec<String> {
        ANCHOR_RE
            .find_iter(body)
            .filter(|tag| {
                CLASS_ATTR_RE
                    .captures(tag.as_str())
                    .is_some_and(|c| c[1].split_whitespace().any(|cls| cls == "result__a"))
            })
            .filter_map(|tag| HREF_ATTR_RE.captures(tag.as_str()).map(|c| c[1].to_string()))
            .filter_map(|href| resolve_redirect(&href))
            .collect()
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

/// Unwrap `/l/?uddg=<encoded>` redirect links; pass absolute links through.
pub(crate) fn resolve_redirect(href: &str) -> Option<String> {
    let href = href.trim().replace("&amp;", "&");

    if href.starts_with("/l/")
        || href.starts_with("//duckduckgo.com/l/")
        || href.contains("uddg=")
    {
        let base = Url::parse("https://duckduckgo.com/").ok()?;
        let full = base.join(&href).ok()?;
        let target = full
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())?;
        return (target.starts_with("http://") || target.starts_with("https://"))
            .then_some(target);
    }

    (href.starts_with("http://") || href.starts_with("https://")).then_some(href)
}
