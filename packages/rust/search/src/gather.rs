//! Candidate gathering: run search queries and collect ranked website and
//! social-profile candidates for one organization.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use brandscout_shared::{
    BrandScoutError, CandidateSet, EnrichmentOutcome, Result, normalize_handle, profile_url,
};

use crate::backends::SearchBackend;
use crate::official::{host_of, is_aggregator, looks_official, trim_url};

/// Profile references anywhere in a result body (snippets, display URLs).
/// The host must start at a label boundary.
static PROFILE_MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|[/.\s"'])instagram\.com/(?:@)?([A-Za-z0-9_.]{1,30})"#)
        .expect("profile mention regex")
});

/// Runs queries through one [`SearchBackend`].
pub struct CandidateGatherer {
    client: Client,
    backend: Box<dyn SearchBackend>,
    locality: String,
}

impl CandidateGatherer {
    pub fn new(
        client: Client,
        backend: Box<dyn SearchBackend>,
        locality: impl Into<String>,
    ) -> Self {
        Self {
            client,
            backend,
            locality: locality.into(),
        }
    }

    /// Gather website and social candidates for `name`.
    ///
    /// The website query is biased toward the official site and narrowed by
    /// locality; when it yields no websites the bare name is tried once. A
    /// failing social query only costs the social list.
    #[instrument(skip_all, fields(backend = self.backend.name(), name = %name))]
    pub async fn gather(&self, name: &str) -> Result<CandidateSet> {
        let primary = self.query(&biased(name, "official site", &self.locality)).await?;
        let mut websites = website_candidates(&primary.links);
        let mut socials = social_candidates(&primary.links, &primary.body);

        if websites.is_empty() {
            debug!("biased query found no websites, retrying with bare name");
            match self.query(name.trim()).await {
                Ok(fallback) => {
                    websites = website_candidates(&fallback.links);
                    merge(&mut socials, social_candidates(&fallback.links, &fallback.body));
                }
                Err(e) => warn!(error = %e, "bare-name query failed"),
            }
        }

        match self.query(&biased(name, "instagram", &self.locality)).await {
            Ok(social) => merge(&mut socials, social_candidates(&social.links, &social.body)),
            Err(e) => warn!(error = %e, "social query failed"),
        }

        debug!(websites = websites.len(), socials = socials.len(), "candidates gathered");
        Ok(CandidateSet { websites, socials })
    }

    async fn query(&self, query: &str) -> Result<QueryResult> {
        let url = self.backend.query_url(query)?;
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| BrandScoutError::Network(format!("{} search: {e}", self.backend.name())))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BrandScoutError::Network(format!(
                "{} search: HTTP {status}",
                self.backend.name()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BrandScoutError::Network(format!("{} search: {e}", self.backend.name())))?;
        let links = self.backend.extract_links(&body);
        Ok(QueryResult { body, links })
    }
}

struct QueryResult {
    body: String,
    links: Vec<String>,
}

fn biased(name: &str, bias: &str, locality: &str) -> String {
    format!("{} {bias} {}", name.trim(), locality.trim())
        .trim()
        .to_string()
}

/// Absolute http(s) links minus aggregators, trimmed and deduplicated.
fn website_candidates(links: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for link in links {
        if !(link.starts_with("http://") || link.starts_with("https://")) {
            continue;
        }
        let host = host_of(link);
        if host.is_empty() || is_aggregator(&host) {
            continue;
        }
        let trimmed = trim_url(link);
        if !out.contains(&trimmed) {
            out.push(trimmed);
        }
    }
    out
}

/// Profile URLs from result links first, then mentions in the raw body.
fn social_candidates(links: &[String], body: &str) -> Vec<String> {
    let unescaped = body.replace("\\/", "/");
    let from_links = links
        .iter()
        .filter(|l| is_profile_host(&host_of(l)))
        .map(|l| normalize_handle(l));
    let from_body = PROFILE_MENTION_RE
        .captures_iter(&unescaped)
        .map(|c| normalize_handle(&c[1]));

    let mut out: Vec<String> = Vec::new();
    for handle in from_links.chain(from_body).filter(|h| !h.is_empty()) {
        let url = profile_url(&handle);
        if !out.contains(&url) {
            out.push(url);
        }
    }
    out
}

fn is_profile_host(host: &str) -> bool {
    host == "instagram.com" || host.ends_with(".instagram.com")
}

fn merge(into: &mut Vec<String>, more: Vec<String>) {
    for item in more {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

/// Keyless selection: first website passing [`looks_official`], first social
/// that normalizes to a handle.
pub fn select_heuristic(name: &str, candidates: &CandidateSet) -> EnrichmentOutcome {
    let website = candidates
        .websites
        .iter()
        .find(|w| looks_official(name, w))
        .cloned();
    let handle = candidates
        .socials
        .iter()
        .map(|s| normalize_handle(s))
        .find(|h| !h.is_empty());
    EnrichmentOutcome { website, handle }
}
