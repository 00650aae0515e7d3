//! End-to-end `run` pipeline: catalog → filter → enrich → discover → download → save.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use brandscout_discovery::{LogoResolver, build_client};
use brandscout_search::is_aggregator_url;
use brandscout_shared::{
    BrandScoutError, EnrichConfig, HttpConfig, ImageFormat, LOGO_SITE_DIR, OrganizationRecord,
    ProviderKind, Result, logo_site_path, normalize_handle,
};

use crate::catalog::Catalog;
use crate::providers::Enricher;

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Catalog JSON file.
    pub catalog_path: PathBuf,
    /// Directory that site-relative logo paths resolve against.
    pub public_dir: PathBuf,
    /// Top-level key holding the records.
    pub collection: String,
    /// Skip records with `active: false`.
    pub only_active: bool,
    /// Lowercased category filter; empty means no filter.
    pub categories: BTreeSet<String>,
    /// Look everything up but write nothing.
    pub dry_run: bool,
    /// Also fill missing handles, with the configured provider.
    pub enrich_missing: bool,
    pub enrich: EnrichConfig,
    pub http: HttpConfig,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub saved: usize,
    pub already_ok: usize,
    pub failed: usize,
    pub filtered_out: usize,
    pub simulated: usize,
    pub enrich_errors: usize,
    pub records_changed: usize,
    pub catalog_changed: bool,
    /// Backup written before the catalog was replaced.
    pub backup: Option<PathBuf>,
    pub elapsed: std::time::Duration,
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    FilteredOut,
    AlreadyOk,
    /// Logo written to this local path.
    Saved(PathBuf),
    /// Dry run: this image would have been downloaded.
    Simulated(String),
    Failed(String),
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called once the catalog is loaded.
    fn start(&self, total: usize);
    /// Called when a record begins processing.
    fn record_started(&self, index: usize, name: &str);
    /// Called when a record is finished.
    fn record_finished(&self, index: usize, name: &str, status: &RecordStatus);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn start(&self, _total: usize) {}
    fn record_started(&self, _index: usize, _name: &str) {}
    fn record_finished(&self, _index: usize, _name: &str, _status: &RecordStatus) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the full pipeline over every record in the catalog.
///
/// Per-record failures are counted and never abort the run. Errors returned
/// from here are fatal: unreadable catalog, uncreatable logo directory, or a
/// failed catalog write.
#[instrument(
    skip_all,
    fields(catalog = %options.catalog_path.display(), dry_run = options.dry_run)
)]
pub async fn run_pipeline(
    options: &RunOptions,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    let mut catalog = Catalog::load(&options.catalog_path, &options.collection)?;

    let logo_dir = options.public_dir.join(LOGO_SITE_DIR.trim_start_matches('/'));
    if !options.dry_run {
        std::fs::create_dir_all(&logo_dir).map_err(|e| BrandScoutError::io(&logo_dir, e))?;
    }

    let client = build_client(&options.http)?;
    let resolver = LogoResolver::new(client.clone(), &options.http);
    // Without an explicit request only websites are filled, and only by the
    // keyless provider.
    let provider = if options.enrich_missing {
        options.enrich.provider
    } else {
        ProviderKind::Ddg
    };
    let enricher = Enricher::from_config(provider, &options.enrich, client);

    let mut summary = RunSummary {
        total: catalog.records.len(),
        ..RunSummary::default()
    };
    info!(
        records = summary.total,
        provider = enricher.name(),
        "starting run"
    );
    progress.start(summary.total);

    for (index, record) in catalog.records.iter_mut().enumerate() {
        let name = record.name.clone();
        progress.record_started(index, &name);

        let before = record.clone();
        let status =
            process_record(record, options, &enricher, &resolver, &mut summary).await;

        match &status {
            RecordStatus::FilteredOut => summary.filtered_out += 1,
            RecordStatus::AlreadyOk => summary.already_ok += 1,
            RecordStatus::Saved(_) => summary.saved += 1,
            RecordStatus::Simulated(_) => summary.simulated += 1,
            RecordStatus::Failed(reason) => {
                warn!(name = %name, reason = %reason, "record failed");
                summary.failed += 1;
            }
        }

        if *record != before {
            normalize_legacy_handle(record);
            summary.records_changed += 1;
        }
        progress.record_finished(index, &name, &status);
    }

    summary.catalog_changed = summary.records_changed > 0;
    if summary.catalog_changed && !options.dry_run {
        summary.backup = Some(catalog.save()?);
    } else if summary.catalog_changed {
        info!(changed = summary.records_changed, "dry run, catalog not written");
    }

    summary.elapsed = start.elapsed();
    info!(
        saved = summary.saved,
        already_ok = summary.already_ok,
        failed = summary.failed,
        filtered_out = summary.filtered_out,
        simulated = summary.simulated,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "run complete"
    );
    progress.done(&summary);
    Ok(summary)
}

async fn process_record(
    record: &mut OrganizationRecord,
    options: &RunOptions,
    enricher: &Enricher,
    resolver: &LogoResolver,
    summary: &mut RunSummary,
) -> RecordStatus {
    if options.only_active && !record.active {
        return RecordStatus::FilteredOut;
    }
    if !options.categories.is_empty() && !record.in_any_category(&options.categories) {
        return RecordStatus::FilteredOut;
    }

    let enrich_error = enrich_record(record, options, enricher, summary).await;

    let logo_ref = record.logo_ref.trim();
    if !logo_ref.is_empty() && local_path(&options.public_dir, logo_ref).is_file() {
        debug!(name = %record.name, logo = %record.logo_ref, "logo already present");
        return RecordStatus::AlreadyOk;
    }

    let website = record.website_url.trim().to_string();
    if website.is_empty() {
        return RecordStatus::Failed(match enrich_error {
            Some(e) => format!("no website ({e})"),
            None => "no website".into(),
        });
    }
    if is_aggregator_url(&website) {
        return RecordStatus::Failed(format!("no official website ({website})"));
    }

    let candidate = match resolver.discover(&website).await {
        Ok(candidate) => candidate,
        Err(e) => return RecordStatus::Failed(e.to_string()),
    };

    if options.dry_run {
        info!(
            name = %record.name,
            url = %candidate.url,
            format = %candidate.format,
            "would download"
        );
        return RecordStatus::Simulated(candidate.url.to_string());
    }

    let site_path = planned_site_path(record, candidate.format);
    let target = local_path(&options.public_dir, &site_path);
    match resolver.download(&candidate, &website, &target).await {
        Ok(logo) => {
            record.logo_ref = with_site_extension(&site_path, logo.format);
            debug!(name = %record.name, logo = %record.logo_ref, "logo reference updated");
            RecordStatus::Saved(logo.path)
        }
        Err(e) => RecordStatus::Failed(e.to_string()),
    }
}

/// Fill a missing website (and, when requested, a missing handle).
///
/// A provider error is returned so a record left without a website fails
/// with it. The record itself is untouched in that case.
async fn enrich_record(
    record: &mut OrganizationRecord,
    options: &RunOptions,
    enricher: &Enricher,
    summary: &mut RunSummary,
) -> Option<BrandScoutError> {
    let name = record.name.trim().to_string();
    if name.is_empty() {
        return None;
    }

    let website_missing =
        record.website_url.trim().is_empty() || is_aggregator_url(&record.website_url);
    let handle_missing = record.social_handle.trim().is_empty();
    if !website_missing && !(handle_missing && options.enrich_missing) {
        return None;
    }

    match enricher.enrich(&name).await {
        Ok(outcome) => {
            if website_missing {
                if let Some(website) = outcome.website {
                    info!(name = %name, website = %website, "website found");
                    record.website_url = website;
                }
            }
            if handle_missing && options.enrich_missing {
                if let Some(handle) = outcome.handle {
                    info!(name = %name, handle = %handle, "handle found");
                    record.social_handle = handle;
                }
            }
            None
        }
        Err(e) => {
            warn!(name = %name, error = %e, "enrichment failed");
            summary.enrich_errors += 1;
            Some(e)
        }
    }
}

/// Older catalogs stored full profile URLs in the handle field.
fn normalize_legacy_handle(record: &mut OrganizationRecord) {
    let handle = normalize_handle(&record.social_handle);
    if !handle.is_empty() && handle != record.social_handle {
        record.social_handle = handle;
    }
}

/// `<public>/<site path without leading slash>`
pub fn local_path(public_dir: &Path, site_path: &str) -> PathBuf {
    public_dir.join(site_path.trim().trim_start_matches('/'))
}

fn planned_site_path(record: &OrganizationRecord, format: ImageFormat) -> String {
    let existing = record.logo_ref.trim();
    if existing.is_empty() {
        logo_site_path(&record.name, format)
    } else {
        existing.to_string()
    }
}

/// Replace (or add) the extension of the last path segment.
fn with_site_extension(site_path: &str, format: ImageFormat) -> String {
    let (dir, file) = site_path.rsplit_once('/').unwrap_or(("", site_path));
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    let file = format!("{stem}.{}", format.extension());
    if site_path.contains('/') {
        format!("{dir}/{file}")
    } else {
        file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bs-{tag}-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn options(dir: &Path, search_base: &str) -> RunOptions {
        RunOptions {
            catalog_path: dir.join("site.json"),
            public_dir: dir.join("public"),
            collection: "sponsors".into(),
            only_active: false,
            categories: BTreeSet::new(),
            dry_run: false,
            enrich_missing: false,
            enrich: EnrichConfig {
                provider: ProviderKind::Ddg,
                locality: String::new(),
                serpapi_key: None,
                llm_key: None,
                duckduckgo_base_url: search_base.into(),
                serpapi_base_url: search_base.into(),
                llm_base_url: search_base.into(),
                llm_model: "gpt-4o-mini".into(),
            },
            http: HttpConfig::default(),
        }
    }

    fn write_catalog(dir: &Path, sponsors: serde_json::Value) {
        let doc = serde_json::json!({ "title": "Beer Week", "sponsors": sponsors });
        std::fs::write(dir.join("site.json"), serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    }

    fn read_catalog(dir: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(dir.join("site.json")).unwrap()).unwrap()
    }

    /// Keyless search answers for "Finca": a website and a profile link.
    async fn mount_finca_search(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "Finca official site"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ddg_page(&[
                "https://www.yelp.com/biz/finca",
                "https://finca.wine/",
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "Finca instagram"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ddg_page(&[
                "https://www.instagram.com/fincawine/",
            ])))
            .mount(server)
            .await;
    }

    fn ddg_page(hrefs: &[&str]) -> String {
        hrefs
            .iter()
            .map(|h| format!(r#"<a class="result__a" href="{h}">r</a>"#))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Put a logo on disk so the record stops at the already-ok check.
    fn place_logo(dir: &Path) {
        let logos = dir.join("public/images/logos");
        std::fs::create_dir_all(&logos).unwrap();
        std::fs::write(logos.join("finca.png"), PNG).unwrap();
    }

    async fn mount_finca_site(server: &MockServer, content_type: &str) {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    r#"<html><head><meta property="og:image" content="/img/logo.png"></head></html>"#,
                    "text/html",
                ),
            )
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/logo.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", content_type)
                    .set_body_bytes(PNG),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn finca_end_to_end_then_rerun_skips() {
        let server = MockServer::start().await;
        mount_finca_site(&server, "image/png").await;

        let dir = temp_dir("pipeline-finca");
        let site = format!("{}/", server.uri());
        write_catalog(
            &dir,
            serde_json::json!([{ "name": "Finca", "href": site, "logo": "", "active": true }]),
        );
        let opts = options(&dir, &server.uri());

        let first = run_pipeline(&opts, &SilentProgress).await.unwrap();
        assert_eq!(first.saved, 1);
        assert_eq!(first.failed, 0);
        assert!(first.catalog_changed);
        assert!(first.backup.as_ref().unwrap().exists());
        assert!(dir.join("public/images/logos/finca.png").is_file());
        assert_eq!(read_catalog(&dir)["sponsors"][0]["logo"], "/images/logos/finca.png");
        assert_eq!(read_catalog(&dir)["title"], "Beer Week");

        // The mocks expect exactly one hit each; a second discovery would fail verification.
        let second = run_pipeline(&opts, &SilentProgress).await.unwrap();
        assert_eq!(second.already_ok, 1);
        assert_eq!(second.saved, 0);
        assert!(!second.catalog_changed);
        assert!(second.backup.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn response_content_type_decides_extension() {
        let server = MockServer::start().await;
        mount_finca_site(&server, "image/webp").await;

        let dir = temp_dir("pipeline-webp");
        write_catalog(
            &dir,
            serde_json::json!([
                { "name": "Finca", "href": server.uri(), "logo": "/images/logos/finca.png" }
            ]),
        );
        let summary = run_pipeline(&options(&dir, &server.uri()), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(summary.saved, 1);
        assert!(dir.join("public/images/logos/finca.webp").is_file());
        assert!(!dir.join("public/images/logos/finca.png").exists());
        assert_eq!(read_catalog(&dir)["sponsors"][0]["logo"], "/images/logos/finca.webp");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn dry_run_discovers_but_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    r#"<meta property="og:image" content="/img/logo.png">"#,
                    "text/html",
                ),
            )
            .mount(&server)
            .await;

        let dir = temp_dir("pipeline-dry");
        write_catalog(&dir, serde_json::json!([{ "name": "Finca", "href": server.uri() }]));
        let before = std::fs::read_to_string(dir.join("site.json")).unwrap();

        let mut opts = options(&dir, &server.uri());
        opts.dry_run = true;
        let summary = run_pipeline(&opts, &SilentProgress).await.unwrap();

        assert_eq!(summary.simulated, 1);
        assert_eq!(summary.saved, 0);
        assert!(!dir.join("public").exists());
        assert_eq!(std::fs::read_to_string(dir.join("site.json")).unwrap(), before);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn filters_and_missing_websites() {
        let server = MockServer::start().await;
        // Keyless search finds nothing for anyone.
        Mock::given(method("GET"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let dir = temp_dir("pipeline-filter");
        write_catalog(
            &dir,
            serde_json::json!([
                { "name": "Sleepy Co", "active": false, "category": ["Brewery"] },
                { "name": "Food Truck", "active": true, "category": ["Food"] },
                {
                    "name": "Hop Yard",
                    "active": true,
                    "category": [" brewery "],
                    "href": "https://www.yelp.com/biz/hop-yard"
                },
            ]),
        );
        let mut opts = options(&dir, &server.uri());
        opts.only_active = true;
        opts.categories = BTreeSet::from(["brewery".to_string()]);

        let summary = run_pipeline(&opts, &SilentProgress).await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.filtered_out, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.enrich_errors, 0);
        assert!(!summary.catalog_changed);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn missing_website_uses_keyless_search_and_leaves_handle() {
        let server = MockServer::start().await;
        mount_finca_search(&server).await;

        let dir = temp_dir("pipeline-website-only");
        place_logo(&dir);
        write_catalog(
            &dir,
            serde_json::json!([{ "name": "Finca", "logo": "/images/logos/finca.png" }]),
        );
        // A keyed provider is configured but not requested; no key is needed.
        let mut opts = options(&dir, &server.uri());
        opts.enrich.provider = ProviderKind::Openai;

        let summary = run_pipeline(&opts, &SilentProgress).await.unwrap();
        assert_eq!(summary.already_ok, 1);
        assert_eq!(summary.enrich_errors, 0);
        assert_eq!(summary.records_changed, 1);

        let written = &read_catalog(&dir)["sponsors"][0];
        assert_eq!(written["href"], "https://finca.wine/");
        assert_eq!(written["instagram"], "");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn enrich_missing_writes_bare_handle() {
        let server = MockServer::start().await;
        mount_finca_search(&server).await;

        let dir = temp_dir("pipeline-handle");
        place_logo(&dir);
        write_catalog(
            &dir,
            serde_json::json!([{
                "name": "Finca",
                "href": "https://finca.wine/about",
                "instagram": "",
                "logo": "/images/logos/finca.png"
            }]),
        );
        let mut opts = options(&dir, &server.uri());
        opts.enrich_missing = true;

        let summary = run_pipeline(&opts, &SilentProgress).await.unwrap();
        assert_eq!(summary.already_ok, 1);
        assert_eq!(summary.records_changed, 1);

        let written = &read_catalog(&dir)["sponsors"][0];
        assert_eq!(written["instagram"], "fincawine");
        assert_eq!(written["href"], "https://finca.wine/about");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn provider_error_fails_record_without_website() {
        let dir = temp_dir("pipeline-provider-error");
        place_logo(&dir);
        write_catalog(
            &dir,
            serde_json::json!([
                { "name": "Finca" },
                { "name": "Finca", "href": "https://finca.wine/", "logo": "/images/logos/finca.png" }
            ]),
        );
        // Single-shot provider without a key errors before any request.
        let mut opts = options(&dir, "http://127.0.0.1:9");
        opts.enrich_missing = true;
        opts.enrich.provider = ProviderKind::Openai;

        let summary = run_pipeline(&opts, &SilentProgress).await.unwrap();
        assert_eq!(summary.enrich_errors, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.already_ok, 1);
        assert!(!summary.catalog_changed);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn unreadable_catalog_is_fatal() {
        let dir = temp_dir("pipeline-fatal");
        let err = run_pipeline(&options(&dir, "http://127.0.0.1:9"), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, BrandScoutError::Catalog(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn extension_rewrite() {
        assert_eq!(
            with_site_extension("/images/logos/finca.png", ImageFormat::Webp),
            "/images/logos/finca.webp"
        );
        assert_eq!(
            with_site_extension("/images/logos/finca", ImageFormat::Svg),
            "/images/logos/finca.svg"
        );
        assert_eq!(with_site_extension("finca.jpeg", ImageFormat::Jpg), "finca.jpg");
    }

    #[test]
    fn legacy_profile_url_handles_are_normalized() {
        let mut record = OrganizationRecord {
            social_handle: "https://www.instagram.com/fincawine/".into(),
            ..OrganizationRecord::default()
        };
        normalize_legacy_handle(&mut record);
        assert_eq!(record.social_handle, "fincawine");
    }

    #[test]
    fn local_path_strips_leading_slash() {
        assert_eq!(
            local_path(Path::new("public"), "/images/logos/finca.png"),
            PathBuf::from("public/images/logos/finca.png")
        );
    }
}
