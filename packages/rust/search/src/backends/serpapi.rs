//! SerpAPI (authenticated Google results).

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use brandscout_shared::{BrandScoutError, Result};

use super::SearchBackend;

/// `"link": "…"` anywhere in the JSON body.
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""link"\s*:\s*"([^"]+)""#).expect("link regex"));

/// Google results via SerpAPI. Needs an API key.
pub struct SerpApiBackend {
    base_url: String,
    api_key: String,
}

impl SerpApiBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

impl SearchBackend for SerpApiBackend {
    fn query_url(&self, query: &str) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/search.json", self.base_url),
            &[
                ("q", query),
                ("engine", "google"),
                ("num", "10"),
                ("api_key", self.api_key.as_str()),
            ],
        )
        .map_err(|e| BrandScoutError::config(format!("bad SerpAPI base URL: {e}")))
    }

    fn extract_links(&self, body: &str) -> Vec<String> {
        LINK_RE
            .captures_iter(body)
            .map(|c| c[1].replace("\\/", "/"))
            .filter(|l| l.starts_with("http://") || l.starts_with("https://"))
            .collect()
    }

    fn name(&self) -> &str {
        "serpapi"
    }
}
