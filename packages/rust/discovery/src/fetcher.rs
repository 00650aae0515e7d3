//! Logo download with content-type validation and atomic replace.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, REFERER};
use tracing::{debug, info, instrument};
use url::Url;
use uuid::Uuid;

use brandscout_shared::{BrandScoutError, ImageFormat, Result, is_icon_content_type};

/// A logo that is now on disk.
#[derive(Debug, Clone)]
pub struct DownloadedLogo {
    /// Final path; its extension matches `format`.
    pub path: PathBuf,
    /// Format taken from the response's Content-Type.
    pub format: ImageFormat,
    pub bytes: u64,
}

/// GET `url` and write it to `target`, fixing the extension to match the
/// response's Content-Type.
///
/// The body goes to a hidden `.part` sibling first and is renamed into place
/// only when complete, so `target` never holds a partial file. Non-200,
/// non-image, icon, and over-cap responses are errors.
#[instrument(skip_all, fields(url = %url, target = %target.display()))]
pub async fn download_logo(
    client: &Client,
    url: &Url,
    referer: &str,
    target: &Path,
    max_bytes: u64,
) -> Result<DownloadedLogo> {
    let mut response = client
        .get(url.as_str())
        .header(REFERER, referer)
        .send()
        .await
        .map_err(|e| BrandScoutError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(BrandScoutError::Download(format!(
            "bad status {status} for {url}"
        )));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if !content_type.starts_with("image/") {
        return Err(BrandScoutError::Download(format!(
            "not an image: {}",
            if content_type.is_empty() { "<none>" } else { &content_type }
        )));
    }
    if is_icon_content_type(&content_type) {
        return Err(BrandScoutError::Download("ICO not allowed".into()));
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(BrandScoutError::Download(format!(
                "{url}: image too large ({len} bytes, max {max_bytes})"
            )));
        }
    }

    let format = ImageFormat::from_content_type(&content_type).unwrap_or(ImageFormat::Png);
    let target = target.with_extension(format.extension());

    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| BrandScoutError::io(dir, e))?;

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            BrandScoutError::validation(format!("bad target path: {}", target.display()))
        })?;
    let temp = dir.join(format!(".{file_name}.{}.part", Uuid::now_v7()));

    let written = match stream_to_file(&mut response, &temp, max_bytes, url).await {
        Ok(n) => n,
        Err(e) => {
            let _ = std::fs::remove_file(&temp);
            return Err(e);
        }
    };

    if let Err(e) = std::fs::rename(&temp, &target) {
        let _ = std::fs::remove_file(&temp);
        return Err(BrandScoutError::io(&target, e));
    }

    info!(path = %target.display(), bytes = written, %format, "logo saved");

    Ok(DownloadedLogo {
        path: target,
        format,
        bytes: written,
    })
}

async fn stream_to_file(
    response: &mut reqwest::Response,
    temp: &Path,
    max_bytes: u64,
    url: &Url,
) -> Result<u64> {
    let mut out = File::create(temp).map_err(|e| BrandScoutError::io(temp, e))?;
    let mut written: u64 = 0;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| BrandScoutError::Network(format!("{url}: failed to read body: {e}")))?
    {
        written += chunk.len() as u64;
        if written > max_bytes {
            return Err(BrandScoutError::Download(format!(
                "{url}: image exceeds {max_bytes} bytes"
            )));
        }
        out.write_all(&chunk).map_err(|e| BrandScoutError::io(temp, e))?;
    }

    out.sync_all().map_err(|e| BrandScoutError::io(temp, e))?;
    debug!(bytes = written, "body written to temp file");
    Ok(written)
}
