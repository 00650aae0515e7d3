//! Logo discovery, type resolution, and download.
//!
//! Given a website, BrandScout first scans the homepage markup for a logo
//! reference ([`scanner`]). If the markup has nothing usable it probes a fixed
//! list of conventional asset paths ([`probe`]). The winning URL gets a
//! provisional format ([`resolver`]) and is then downloaded with the
//! response's own Content-Type deciding the final extension ([`fetcher`]).

pub mod fetcher;
pub mod probe;
pub mod resolver;
pub mod scanner;

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, REFERER};
use tracing::{debug, info, instrument};
use url::Url;

use brandscout_shared::{BrandScoutError, HttpConfig, ImageCandidate, Result};

pub use fetcher::{DownloadedLogo, download_logo};
pub use probe::{STATIC_LOGO_PATHS, probe_static_paths};
pub use resolver::resolve_format;
pub use scanner::{is_ico, scan_markup};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Build the reqwest client shared by discovery, search, and the LLM client.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| BrandScoutError::Network(format!("failed to build HTTP client: {e}")))
}

// ---------------------------------------------------------------------------
// LogoResolver
// ---------------------------------------------------------------------------

/// Discovers and downloads logos using one HTTP client.
#[derive(Clone)]
pub struct LogoResolver {
    client: Client,
    max_page_bytes: u64,
    max_image_bytes: u64,
}

impl LogoResolver {
    pub fn new(client: Client, config: &HttpConfig) -> Self {
        Self {
            client,
            max_page_bytes: config.max_page_bytes,
            max_image_bytes: config.max_image_bytes,
        }
    }

    /// Find the best logo candidate for `site`.
    ///
    /// Markup scan first, static path probes second. Running out of options
    /// is a [`BrandScoutError::Discovery`] error, which callers treat as a
    /// normal per-record failure.
    #[instrument(skip(self), fields(site = %site))]
    pub async fn discover(&self, site: &str) -> Result<ImageCandidate> {
        let base = parse_site_url(site)?;

        match fetch_markup(&self.client, &base, site, self.max_page_bytes).await {
            Ok(markup) => {
                if let Some(url) = scan_markup(&markup, &base) {
                    let format = resolve_format(&self.client, &url, site).await;
                    info!(%url, %format, "logo found in markup");
                    return Ok(ImageCandidate { url, format });
                }
                debug!("markup scan found nothing");
            }
            Err(e) => debug!(error = %e, "homepage fetch failed, probing static paths"),
        }

        if let Some(url) = probe_static_paths(&self.client, &base, site).await {
            let format = resolve_format(&self.client, &url, site).await;
            info!(%url, %format, "logo found by static path probe");
            return Ok(ImageCandidate { url, format });
        }

        Err(BrandScoutError::Discovery("no viable image found".into()))
    }

    /// Download `candidate` to `target` (extension corrected on write).
    pub async fn download(
        &self,
        candidate: &ImageCandidate,
        referer: &str,
        target: &Path,
    ) -> Result<DownloadedLogo> {
        download_logo(
            &self.client,
            &candidate.url,
            referer,
            target,
            self.max_image_bytes,
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a record's website; it must be absolute http(s) with a host.
pub fn parse_site_url(site: &str) -> Result<Url> {
    let url = Url::parse(site.trim())
        .map_err(|e| BrandScoutError::validation(format!("invalid website '{site}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(BrandScoutError::validation(format!(
            "invalid website '{site}': not an absolute http(s) URL"
        )));
    }
    Ok(url)
}

/// Fetch a page's markup, keeping at most `max_bytes` of it.
async fn fetch_markup(client: &Client, url: &Url, referer: &str, max_bytes: u64) -> Result<String> {
    let mut response = client
        .get(url.as_str())
        .header(REFERER, referer)
        .send()
        .await
        .map_err(|e| BrandScoutError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));

    if status != StatusCode::OK || !is_html {
        return Err(BrandScoutError::Network(format!(
            "{url}: HTTP {status} or non-html response"
        )));
    }

    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| BrandScoutError::Network(format!("{url}: failed to read body: {e}")))?
    {
        let room = (max_bytes as usize).saturating_sub(body.len());
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() as u64 >= max_bytes {
            debug!(max_bytes, "page truncated at cap");
            break;
        }
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}
