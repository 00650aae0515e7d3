//! Provisional file format for a candidate URL.
//!
//! The URL suffix is trusted when it names a known format. Otherwise a HEAD
//! request decides, and png is the fallback. The logo fetcher always
//! re-derives the format from the download's own Content-Type.

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, REFERER};
use tracing::debug;
use url::Url;

use brandscout_shared::ImageFormat;

/// Lowercased extension of the last path segment, if any.
pub(crate) fn url_extension(url: &Url) -> Option<String> {
    let last = url.path().rsplit('/').next()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Resolve the format for `url`, probing with HEAD when the suffix is unusable.
pub async fn resolve_format(client: &Client, url: &Url, referer: &str) -> ImageFormat {
    if let Some(format) = url_extension(url).and_then(|ext| ImageFormat::from_extension(&ext)) {
        return format;
    }

    let probed = match client
        .head(url.as_str())
        .header(REFERER, referer)
        .send()
        .await
    {
        Ok(response) => response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(ImageFormat::from_content_type),
        Err(e) => {
            debug!(%url, error = %e, "format probe failed");
            None
        }
    };

    probed.unwrap_or(ImageFormat::Png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn extension_from_last_segment() {
        let u = Url::parse("https://x.com/a.b/logo.JPEG?v=1").unwrap();
        assert_eq!(url_extension(&u).as_deref(), Some("jpeg"));
        assert_eq!(url_extension(&Url::parse("https://x.com/a.b/logo").unwrap()), None);
        assert_eq!(url_extension(&Url::parse("https://x.com/.hidden").unwrap()), None);
        assert_eq!(url_extension(&Url::parse("https://x.com/").unwrap()), None);
    }

    #[tokio::test]
    async fn known_suffix_skips_network() {
        // No server at all: a network attempt would fall back to png, not svg
        let u = Url::parse("http://127.0.0.1:9/brand/logo.svg").unwrap();
        assert_eq!(resolve_format(&Client::new(), &u, "").await, ImageFormat::Svg);
    }

    #[tokio::test]
    async fn ico_suffix_is_probed() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/favicon.ico"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/webp"))
            .mount(&server)
            .await;

        let u = Url::parse(&format!("{}/favicon.ico", server.uri())).unwrap();
        assert_eq!(resolve_format(&Client::new(), &u, "").await, ImageFormat::Webp);
    }

    #[tokio::test]
    async fn missing_suffix_uses_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/media/brand"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/avif"))
            .mount(&server)
            .await;

        let u = Url::parse(&format!("{}/media/brand", server.uri())).unwrap();
        assert_eq!(resolve_format(&Client::new(), &u, "").await, ImageFormat::Avif);
    }

    #[tokio::test]
    async fn unknown_content_type_defaults_to_png() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/gif"))
            .mount(&server)
            .await;

        let u = Url::parse(&format!("{}/img", server.uri())).unwrap();
        assert_eq!(resolve_format(&Client::new(), &u, "").await, ImageFormat::Png);
    }
}
