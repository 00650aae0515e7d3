//! Conventional icon/logo paths, probed with HEAD when markup yields nothing.

use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, REFERER};
use tracing::{debug, trace};
use url::Url;

use brandscout_shared::is_icon_content_type;

/// Probe order. Larger raster icons first, then generic logo names.
pub const STATIC_LOGO_PATHS: &[&str] = &[
    "/apple-touch-icon.png",
    "/apple-touch-icon-precomposed.png",
    "/favicon-196x196.png",
    "/favicon-192x192.png",
    "/favicon-180x180.png",
    "/favicon-152x152.png",
    "/favicon-144x144.png",
    "/favicon-96x96.png",
    "/favicon-64x64.png",
    "/favicon-32x32.png",
    "/favicon.png",
    "/logo.png",
    "/logo.jpg",
    "/logo.webp",
    "/logo.svg",
];

/// First conventional path on the site's origin that serves a non-icon image.
pub async fn probe_static_paths(client: &Client, site: &Url, referer: &str) -> Option<Url> {
    for path in STATIC_LOGO_PATHS {
        let Ok(candidate) = site.join(path) else {
            continue;
        };
        if head_is_viable_image(client, &candidate, referer).await {
            debug!(url = %candidate, "static path probe hit");
            return Some(candidate);
        }
    }
    None
}

/// HEAD check: 200, `image/*`, and not an icon MIME type.
pub(crate) async fn head_is_viable_image(client: &Client, url: &Url, referer: &str) -> bool {
    let response = match client
        .head(url.as_str())
        .header(REFERER, referer)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            trace!(%url, error = %e, "probe request failed");
            return false;
        }
    };

    if response.status() != StatusCode::OK {
        trace!(%url, status = %response.status(), "probe miss");
        return false;
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    content_type.starts_with("image/") && !is_icon_content_type(&content_type)
}
