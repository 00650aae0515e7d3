//! Search backend trait and built-in backends.
//!
//! A backend knows how to build a query URL and how to pull result links out
//! of its own response body. The HTTP round trip lives in the gatherer, so
//! backends stay synchronous and easy to test against captured bodies.

mod duckduckgo;
mod serpapi;

use url::Url;

use brandscout_shared::Result;

pub use duckduckgo::DuckDuckGoBackend;
pub use serpapi::SerpApiBackend;

/// One web-search backend.
pub trait SearchBackend: Send + Sync {
    /// Build the request URL for `query`.
    fn query_url(&self, query: &str) -> Result<Url>;

    /// All result links in ranking order, as absolute URLs.
    fn extract_links(&self, body: &str) -> Vec<String>;

    /// Human-readable backend name for tracing.
    fn name(&self) -> &str;
}
