//! Core domain types for BrandScout catalogs.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Site-relative directory that logo references point into.
pub const LOGO_SITE_DIR: &str = "/images/logos";

/// Slug used when a name has no usable characters.
const SLUG_PLACEHOLDER: &str = "logo";

/// Instagram path segments that denote content, not profiles.
pub const RESERVED_PROFILE_SEGMENTS: &[&str] =
    &["p", "reel", "reels", "stories", "explore", "tv", "accounts"];

// ---------------------------------------------------------------------------
// OrganizationRecord
// ---------------------------------------------------------------------------

/// One catalog entry. Field names on disk follow the site's content format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Absolute website URL, or empty.
    #[serde(rename = "href", default, deserialize_with = "null_as_default")]
    pub website_url: String,

    /// Bare social handle (no `@`, no URL).
    #[serde(rename = "instagram", default, deserialize_with = "null_as_default")]
    pub social_handle: String,

    /// Site-relative logo path, e.g. `/images/logos/finca.png`.
    #[serde(rename = "logo", default, deserialize_with = "null_as_default")]
    pub logo_ref: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub active: bool,

    #[serde(rename = "category", default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,

    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,

    /// Fields this tool does not know about; written back untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OrganizationRecord {
    /// Case-insensitive intersection with a lowercased category filter.
    pub fn in_any_category(&self, filter: &BTreeSet<String>) -> bool {
        self.categories
            .iter()
            .any(|c| filter.contains(&c.trim().to_lowercase()))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Enrichment / candidate types
// ---------------------------------------------------------------------------

/// What every enrichment provider returns. Both empty means "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentOutcome {
    pub website: Option<String>,
    pub handle: Option<String>,
}

impl EnrichmentOutcome {
    pub fn is_empty(&self) -> bool {
        self.website.is_none() && self.handle.is_none()
    }
}

/// Ranked candidates from one gathering pass. First element = best guess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    /// Website URLs, aggregators already removed.
    pub websites: Vec<String>,
    /// Social profile URLs (`https://www.instagram.com/<handle>/`).
    pub socials: Vec<String>,
}

impl CandidateSet {
    pub fn is_empty(&self) -> bool {
        self.websites.is_empty() && self.socials.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// The closed set of formats a logo file may be saved as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpg,
    Webp,
    Avif,
    Svg,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Svg => "svg",
        }
    }

    /// Map a file extension (with or without dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Map a `Content-Type` header value; parameters are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.trim().to_ascii_lowercase();
        if ct.starts_with("image/png") {
            Some(Self::Png)
        } else if ct.starts_with("image/webp") {
            Some(Self::Webp)
        } else if ct.starts_with("image/avif") {
            Some(Self::Avif)
        } else if ct.starts_with("image/jpeg") || ct.starts_with("image/jpg") {
            Some(Self::Jpg)
        } else if ct.starts_with("image/svg") {
            Some(Self::Svg)
        } else {
            None
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// True for the icon MIME types that are never saved as a logo.
pub fn is_icon_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("x-icon") || ct.contains("vnd.microsoft.icon")
}

/// A discovered image reference. `format` is provisional until download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub url: url::Url,
    pub format: ImageFormat,
}

// ---------------------------------------------------------------------------
// Naming helpers
// ---------------------------------------------------------------------------

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("non-alnum regex"));

static PROFILE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?://)?(?:[a-z0-9-]+\.)*instagram\.com/([^/?#]+)")
        .expect("profile url regex")
});

static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.]{1,30}$").expect("handle regex"));

/// Lowercase, collapse non-alphanumeric runs to `-`, trim hyphens.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let slug = NON_ALNUM_RE.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        SLUG_PLACEHOLDER.to_string()
    } else {
        slug.to_string()
    }
}

/// `/images/logos/<slug>.<ext>` for a record name.
pub fn logo_site_path(name: &str, format: ImageFormat) -> String {
    format!("{LOGO_SITE_DIR}/{}.{}", slugify(name), format.extension())
}

/// Reduce a profile URL, `@handle`, or bare handle to the bare handle.
///
/// Returns an empty string for content URLs (`/p/…`, `/reel/…`) and for
/// anything that is not a syntactically valid handle.
pub fn normalize_handle(raw: &str) -> String {
    let trimmed = raw.trim();
    let candidate = match PROFILE_URL_RE.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None if trimmed.contains("://") || trimmed.contains('/') => {
            trimmed.trim_end_matches('/').to_string()
        }
        None => trimmed.to_string(),
    };
    let candidate = candidate.trim_start_matches('@');

    if RESERVED_PROFILE_SEGMENTS
        .iter()
        .any(|r| r.eq_ignore_ascii_case(candidate))
    {
        return String::new();
    }
    if !HANDLE_RE.is_match(candidate) {
        return String::new();
    }
    candidate.to_string()
}

/// Canonical profile URL for a bare handle.
pub fn profile_url(handle: &str) -> String {
    format!("https://www.instagram.com/{handle}/")
}
