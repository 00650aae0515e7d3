//! Pattern-based logo extraction from page markup.
//!
//! Not an HTML parser. Three tag-shaped patterns are tried in a fixed order
//! and the first usable hit wins:
//! 1. `<meta property="og:image" content="…">`
//! 2. `<link rel="…icon…" href="…">` (either attribute order, every match in
//!    document order)
//! 3. `<img src|data-src|data-original="…logo….(png|jpe?g|webp|svg)">`
//!
//! Every hit is resolved against the page URL. `.ico` hits are discarded and
//! the next rule is tried. A replacement scanner must keep this contract.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// `property` before `content`.
static OG_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\b[^>]*\sproperty=["']og:image["'][^>]*\scontent=["']([^"']+)["']"#)
        .expect("og:image regex")
});

/// `content` before `property`.
static OG_IMAGE_REV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\b[^>]*\scontent=["']([^"']+)["'][^>]*\sproperty=["']og:image["']"#)
        .expect("og:image reversed regex")
});

/// `rel` before `href`.
static ICON_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<link[^>]+rel=["'][^"']*(?:apple-touch-icon|icon)[^"']*["'][^>]*href=["']([^"']+)["']"#,
    )
    .expect("icon link regex")
});

/// `href` before `rel`.
static ICON_LINK_REV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<link[^>]+href=["']([^"']+)["'][^>]*rel=["'][^"']*(?:apple-touch-icon|icon)[^"']*["']"#,
    )
    .expect("icon link reversed regex")
});

static LOGO_IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<img[^>]+(?:src|data-src|data-original)=["']([^"']*logo[^"']*\.(?:png|jpe?g|webp|svg))["']"#,
    )
    .expect("logo img regex")
});

/// Run all rules in priority order. `None` means "nothing in the markup".
pub fn scan_markup(markup: &str, base: &Url) -> Option<Url> {
    find_og_image(markup, base)
        .or_else(|| find_icon_link(markup, base))
        .or_else(|| find_logo_img(markup, base))
}

pub(crate) fn find_og_image(markup: &str, base: &Url) -> Option<Url> {
    let caps = OG_IMAGE_RE
        .captures(markup)
        .or_else(|| OG_IMAGE_REV_RE.captures(markup))?;
    to_abs_url(base, &caps[1]).filter(|u| !is_ico(u))
}

pub(crate) fn find_icon_link(markup: &str, base: &Url) -> Option<Url> {
    let mut hits: Vec<(usize, &str)> = ICON_LINK_RE
        .captures_iter(markup)
        .chain(ICON_LINK_REV_RE.captures_iter(markup))
        .filter_map(|caps| caps.get(1).map(|m| (m.start(), m.as_str())))
        .collect();
    hits.sort_by_key(|&(at, _)| at);
    hits
        .into_iter()
        .filter_map(|(_, found)| to_abs_url(base, found))
        .find(|u| !is_ico(u))
}

pub(crate) fn find_logo_img(markup: &str, base: &Url) -> Option<Url> {
    let caps = LOGO_IMG_RE.captures(markup)?;
    to_abs_url(base, &caps[1]).filter(|u| !is_ico(u))
}

/// Resolve a found reference against the page URL; only http(s) survives.
pub(crate) fn to_abs_url(base: &Url, found: &str) -> Option<Url> {
    let found = found.trim();
    if found.is_empty() {
        return None;
    }
    let resolved = base.join(found).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// True when the URL path ends in `.ico`.
pub fn is_ico(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".ico")
}
